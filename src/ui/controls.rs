use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Identifiers of the play/stop/next controls in the host's control registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlIds {
    pub play_id: String,
    pub stop_id: String,
    pub next_id: String,
}

impl Default for ControlIds {
    fn default() -> Self {
        Self {
            play_id: "playSequence".to_string(),
            stop_id: "stopSequence".to_string(),
            next_id: "nextFrame".to_string(),
        }
    }
}

/// User action coming from one of the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Play,
    Stop,
    Next,
}

/// A control that can be enabled or disabled
pub trait ControlHandle: Send + Sync {
    fn set_disabled(&self, disabled: bool);
}

/// Document-like lookup of controls by identifier
pub trait ControlRegistry: Send + Sync {
    fn find(&self, id: &str) -> Option<Arc<dyn ControlHandle>>;
}

/// Mirrors playback state onto the play/stop/next controls
#[derive(Clone, Default)]
pub struct ControlReflector {
    ids: ControlIds,
    registry: Option<Arc<dyn ControlRegistry>>,
}

impl ControlReflector {
    pub fn new(ids: ControlIds, registry: Arc<dyn ControlRegistry>) -> Self {
        Self {
            ids,
            registry: Some(registry),
        }
    }

    /// Reflector with no registry; every update is a no-op
    pub fn detached() -> Self {
        Self::default()
    }

    /// Play and next are disabled while playing, stop while stopped.
    /// Controls missing from the registry are skipped.
    pub fn set_playing_state(&self, playing: bool) {
        let Some(registry) = &self.registry else {
            return;
        };

        for (id, disabled) in [
            (&self.ids.play_id, playing),
            (&self.ids.stop_id, !playing),
            (&self.ids.next_id, playing),
        ] {
            match registry.find(id) {
                Some(control) => control.set_disabled(disabled),
                None => debug!("Control {} not found, skipping", id),
            }
        }
    }
}

/// Simple on/off control
#[derive(Debug, Default)]
pub struct ToggleControl {
    disabled: AtomicBool,
}

impl ToggleControl {
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

impl ControlHandle for ToggleControl {
    fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }
}

/// In-memory control registry
#[derive(Default)]
pub struct ControlPanel {
    controls: HashMap<String, Arc<ToggleControl>>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel holding all three controls named by `ids`
    pub fn with_ids(ids: &ControlIds) -> Self {
        let mut panel = Self::new();
        panel.add(&ids.play_id);
        panel.add(&ids.stop_id);
        panel.add(&ids.next_id);
        panel
    }

    pub fn add(&mut self, id: &str) -> Arc<ToggleControl> {
        self.controls
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(ToggleControl::default()))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ToggleControl>> {
        self.controls.get(id)
    }
}

impl ControlRegistry for ControlPanel {
    fn find(&self, id: &str) -> Option<Arc<dyn ControlHandle>> {
        self.controls
            .get(id)
            .map(|control| control.clone() as Arc<dyn ControlHandle>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled(panel: &ControlPanel, id: &str) -> bool {
        panel.get(id).unwrap().is_disabled()
    }

    #[test]
    fn test_reflects_playing_state() {
        let ids = ControlIds::default();
        let panel = Arc::new(ControlPanel::with_ids(&ids));
        let reflector = ControlReflector::new(ids.clone(), panel.clone());

        reflector.set_playing_state(true);
        assert!(disabled(&panel, &ids.play_id));
        assert!(!disabled(&panel, &ids.stop_id));
        assert!(disabled(&panel, &ids.next_id));

        reflector.set_playing_state(false);
        assert!(!disabled(&panel, &ids.play_id));
        assert!(disabled(&panel, &ids.stop_id));
        assert!(!disabled(&panel, &ids.next_id));
    }

    #[test]
    fn test_missing_controls_skipped() {
        let ids = ControlIds::default();
        let mut panel = ControlPanel::new();
        let play = panel.add(&ids.play_id);
        let reflector = ControlReflector::new(ids, Arc::new(panel));

        reflector.set_playing_state(true);
        assert!(play.is_disabled());
    }

    #[test]
    fn test_detached_is_noop() {
        ControlReflector::detached().set_playing_state(true);
    }
}
