pub mod engine;
pub mod overrides;
pub mod swap;
pub mod timer;

pub use engine::{SequencePlayer, SequencePlayerBuilder};
pub use overrides::{resolve, EnvOverrides, OverrideSource, Overrides, QueryString};
pub use swap::{Collaborators, SwapStrategy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// What to do when a frame fails to load or prepare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameErrorPolicy {
    /// Log the failure, advance past the frame and keep the schedule
    #[default]
    Skip,
    /// Stop playback on the failed frame
    StopPlayback,
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    /// Root location of the frame assets
    pub base_path: String,
    pub prefix: String,
    pub suffix: String,
    /// Zero-padding width of the frame number
    pub pad: usize,
    pub fps: f64,
    /// First frame, inclusive
    pub start_frame: i64,
    /// Last frame, inclusive
    pub end_frame: i64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_path: "/sequence".to_string(),
            prefix: "frame_".to_string(),
            suffix: ".glb".to_string(),
            pad: 4,
            fps: 15.0,
            start_frame: 1,
            end_frame: 80,
        }
    }
}

impl PlaybackConfig {
    /// Zero-pad a frame number to the configured width
    pub fn format_frame(&self, frame: i64) -> String {
        format!("{:0width$}", frame, width = self.pad)
    }

    /// Build the asset URL for a frame
    pub fn frame_url(&self, frame: i64) -> String {
        format!(
            "{}/{}{}{}",
            self.base_path,
            self.prefix,
            self.format_frame(frame),
            self.suffix
        )
    }

    /// Delay between ticks at the configured rate
    pub fn frame_delay(&self) -> Duration {
        frame_delay(self.fps)
    }

    /// Number of frames in the inclusive range, zero when the range is empty
    pub fn frame_count(&self) -> u64 {
        if self.start_frame > self.end_frame {
            0
        } else {
            self.end_frame.abs_diff(self.start_frame) + 1
        }
    }
}

/// Inter-tick delay for a frame rate: `max(1, floor(1000 / fps))` milliseconds.
///
/// A rate that is not a positive finite number is treated as 1 fps.
pub fn frame_delay(fps: f64) -> Duration {
    let fps = if fps.is_finite() && fps > 0.0 { fps } else { 1.0 };
    let millis = (1000.0 / fps).floor();
    Duration::from_millis((millis as u64).max(1))
}

/// Snapshot of a player's state
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    /// Next frame the player will request
    pub current_frame: i64,
    /// Whether a tick is currently scheduled
    pub tick_pending: bool,
    pub started_at: Option<DateTime<Utc>>,
}

impl PlayerStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_delay() {
        assert_eq!(frame_delay(15.0), Duration::from_millis(66));
        assert_eq!(frame_delay(1.0), Duration::from_millis(1000));
        assert_eq!(frame_delay(30.0), Duration::from_millis(33));
        assert_eq!(frame_delay(2.5), Duration::from_millis(400));
        // Rates above 1000 fps floor to zero and clamp to one
        assert_eq!(frame_delay(5000.0), Duration::from_millis(1));
    }

    #[test]
    fn test_frame_delay_invalid_rate() {
        assert_eq!(frame_delay(0.0), Duration::from_millis(1000));
        assert_eq!(frame_delay(-4.0), Duration::from_millis(1000));
        assert_eq!(frame_delay(f64::NAN), Duration::from_millis(1000));
    }

    #[test]
    fn test_frame_url() {
        let config = PlaybackConfig {
            base_path: "/seq".to_string(),
            prefix: "frame_".to_string(),
            suffix: ".glb".to_string(),
            pad: 4,
            ..Default::default()
        };
        assert_eq!(config.frame_url(7), "/seq/frame_0007.glb");
        assert_eq!(config.frame_url(12345), "/seq/frame_12345.glb");
    }

    #[test]
    fn test_negative_frame_padding() {
        let config = PlaybackConfig {
            pad: 4,
            ..Default::default()
        };
        // Sign counts toward the width
        assert_eq!(config.format_frame(-3), "-003");
        assert_eq!(config.format_frame(-12345), "-12345");
    }

    #[test]
    fn test_frame_url_without_padding() {
        let config = PlaybackConfig {
            base_path: "https://cdn.example.com/run".to_string(),
            prefix: "f".to_string(),
            suffix: ".gltf".to_string(),
            pad: 0,
            ..Default::default()
        };
        assert_eq!(config.frame_url(3), "https://cdn.example.com/run/f3.gltf");
    }

    #[test]
    fn test_frame_count() {
        let mut config = PlaybackConfig::default();
        assert_eq!(config.frame_count(), 80);

        config.start_frame = 5;
        config.end_frame = 4;
        assert_eq!(config.frame_count(), 0);
    }

    #[test]
    fn test_config_json_keys() {
        let json = r#"{"basePath":"/models","fps":24,"endFrame":10}"#;
        let config: PlaybackConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_path, "/models");
        assert_eq!(config.fps, 24.0);
        assert_eq!(config.end_frame, 10);
        // Missing keys keep their defaults
        assert_eq!(config.prefix, "frame_");
        assert_eq!(config.start_frame, 1);
    }
}
