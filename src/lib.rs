//! Frame-sequence playback for 3D scene viewers.
//!
//! A [`SequencePlayer`] steps through numbered model frames
//! (`frame_0001.glb`, `frame_0002.glb`, ...) at a fixed rate and swaps the
//! displayed model on every tick, either by disposing the old model before
//! loading the next, or by preparing the next model off-screen and swapping it
//! in atomically once it is ready.

pub mod error;
pub mod playback;
pub mod scene;
pub mod settings;
pub mod ui;

pub use error::{ConfigError, PlayerError, SceneError};
pub use playback::{
    Collaborators, FrameErrorPolicy, PlaybackConfig, PlaybackState, PlayerStatus, SequencePlayer,
};
pub use settings::Settings;
