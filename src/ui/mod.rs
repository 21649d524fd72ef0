pub mod controls;

pub use controls::{
    ControlAction, ControlHandle, ControlIds, ControlPanel, ControlReflector, ControlRegistry, ToggleControl,
};
