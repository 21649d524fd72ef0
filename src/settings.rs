use crate::playback::{FrameErrorPolicy, PlaybackConfig};
use crate::ui::ControlIds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent player settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub sequence: PlaybackConfig,
    pub controls: ControlIds,
    pub on_frame_error: FrameErrorPolicy,
    /// Use the prepare/swap path when the host supports it
    pub flicker_free: bool,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("frameseq").join("settings.json"))
    }

    /// Load from the user config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write settings file: {:?}", path))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().context("No config directory on this platform")?;
        self.save_to(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("frameseq").join("settings.json");
        let mut settings = Settings::default();
        settings.sequence.fps = 24.0;
        settings.sequence.base_path = "/takes/3".to_string();
        settings.on_frame_error = FrameErrorPolicy::StopPlayback;
        settings.flicker_free = true;

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("partial.json");
        fs::write(&path, r#"{"sequence":{"endFrame":12},"onFrameError":"stopPlayback"}"#).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.sequence.end_frame, 12);
        assert_eq!(loaded.sequence.prefix, "frame_");
        assert_eq!(loaded.controls, ControlIds::default());
        assert_eq!(loaded.on_frame_error, FrameErrorPolicy::StopPlayback);
        assert!(!loaded.flicker_free);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = tempdir().expect("tempdir");
        assert!(Settings::load_from(temp.path().join("absent.json")).is_err());
    }
}
