//! Host settings store
//!
//! The host exposes its settings as string values under fixed keys. The
//! [`SettingsManager`] is a RON-file backed store for hosts that have no
//! settings service of their own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

/// Setting keys read by the previewer
pub mod keys {
    pub const CAMERA_DISTANCE: &str = "CameraDistanceToRobot";
    pub const BACKGROUND_COLOR: &str = "BackgroundColor";
    pub const GRID_MINOR_COLOR: &str = "GridMinorColor";
    pub const GRID_MAIN_COLOR: &str = "GridMainColor";
    pub const GRID_MINOR_OPACITY: &str = "GridMinorOpacity";
    pub const GRID_FREQUENCY: &str = "GridFrequency";
    pub const GRID_RATIO: &str = "GridRatio";
    pub const DEBUG_UI: &str = "DebugUI";

    pub const ALL: [&str; 8] = [
        CAMERA_DISTANCE,
        BACKGROUND_COLOR,
        GRID_MINOR_COLOR,
        GRID_MAIN_COLOR,
        GRID_MINOR_OPACITY,
        GRID_FREQUENCY,
        GRID_RATIO,
        DEBUG_UI,
    ];
}

/// Read-only access to host settings
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<S: SettingsStore> SettingsStore for RwLock<S> {
    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Previewer settings with their host defaults
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewSettings {
    #[serde(rename = "CameraDistanceToRobot")]
    pub camera_distance: String,
    #[serde(rename = "BackgroundColor")]
    pub background_color: String,
    #[serde(rename = "GridMinorColor")]
    pub grid_minor_color: String,
    #[serde(rename = "GridMainColor")]
    pub grid_main_color: String,
    #[serde(rename = "GridMinorOpacity")]
    pub grid_minor_opacity: String,
    #[serde(rename = "GridFrequency")]
    pub grid_frequency: String,
    #[serde(rename = "GridRatio")]
    pub grid_ratio: String,
    #[serde(rename = "DebugUI")]
    pub debug_ui: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            camera_distance: "1.0".to_string(),
            background_color: "#000000".to_string(),
            grid_minor_color: "#00FF00".to_string(),
            grid_main_color: "#001100".to_string(),
            grid_minor_opacity: "0.4".to_string(),
            grid_frequency: "5".to_string(),
            grid_ratio: "0.1".to_string(),
            debug_ui: "false".to_string(),
        }
    }
}

impl PreviewSettings {
    fn value(&self, key: &str) -> Option<&String> {
        match key {
            keys::CAMERA_DISTANCE => Some(&self.camera_distance),
            keys::BACKGROUND_COLOR => Some(&self.background_color),
            keys::GRID_MINOR_COLOR => Some(&self.grid_minor_color),
            keys::GRID_MAIN_COLOR => Some(&self.grid_main_color),
            keys::GRID_MINOR_OPACITY => Some(&self.grid_minor_opacity),
            keys::GRID_FREQUENCY => Some(&self.grid_frequency),
            keys::GRID_RATIO => Some(&self.grid_ratio),
            keys::DEBUG_UI => Some(&self.debug_ui),
            _ => None,
        }
    }
}

impl SettingsStore for PreviewSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.value(key).cloned()
    }
}

/// Settings error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Shared settings manager type
pub type SharedSettings = Arc<RwLock<SettingsManager>>;

/// Serves [`PreviewSettings`] read from a RON file
pub struct SettingsManager {
    settings: PreviewSettings,
    path: PathBuf,
}

impl SettingsManager {
    /// Load from `path`, using defaults if the file is absent or invalid
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match Self::load_from_path(&path) {
            Ok(Some(settings)) => {
                tracing::info!("Loaded settings from {:?}", path);
                settings
            }
            Ok(None) => {
                tracing::info!("No settings file found, using defaults");
                PreviewSettings::default()
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings file: {}", e);
                PreviewSettings::default()
            }
        };

        Self { settings, path }
    }

    /// Default settings file under the OS configuration directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("urdf-preview")
            .join("settings.ron")
    }

    fn load_from_path(path: &Path) -> Result<Option<PreviewSettings>, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SettingsError::Io(e.to_string())),
        };
        ron::from_str(&content)
            .map(Some)
            .map_err(|e| SettingsError::Deserialize(e.to_string()))
    }

    /// Re-read the file. Values are kept if it cannot be parsed and reset to
    /// the defaults if it was removed.
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        self.settings = Self::load_from_path(&self.path)?.unwrap_or_default();
        tracing::info!("Reloaded settings from {:?}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for SettingsManager {
    fn get(&self, key: &str) -> Option<String> {
        self.settings.get(key)
    }
}

/// Create a shared settings manager backed by `path`
pub fn create_shared_settings(path: impl Into<PathBuf>) -> SharedSettings {
    Arc::new(RwLock::new(SettingsManager::open(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_has_a_default() {
        let settings = PreviewSettings::default();
        for key in keys::ALL {
            assert!(settings.get(key).is_some(), "missing {key}");
        }
        assert_eq!(settings.get("Unknown"), None);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::open(dir.path().join("settings.ron"));
        let defaults = PreviewSettings::default();
        for key in keys::ALL {
            assert_eq!(manager.get(key), defaults.get(key));
        }
    }

    #[test]
    fn test_reload_reads_new_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");

        let mut manager = SettingsManager::open(&path);
        assert_eq!(
            manager.get(keys::BACKGROUND_COLOR).as_deref(),
            Some("#000000")
        );

        std::fs::write(&path, "(BackgroundColor: \"#112233\")").unwrap();
        manager.reload().unwrap();
        assert_eq!(
            manager.get(keys::BACKGROUND_COLOR).as_deref(),
            Some("#112233")
        );
        assert_eq!(manager.get(keys::GRID_RATIO).as_deref(), Some("0.1"));

        std::fs::remove_file(&path).unwrap();
        manager.reload().unwrap();
        assert_eq!(
            manager.get(keys::BACKGROUND_COLOR).as_deref(),
            Some("#000000")
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        std::fs::write(&path, "(GridRatio: \"0.5\")").unwrap();

        let manager = SettingsManager::open(&path);
        assert_eq!(manager.get(keys::GRID_RATIO).as_deref(), Some("0.5"));
        assert_eq!(manager.get(keys::DEBUG_UI).as_deref(), Some("false"));
    }

    #[test]
    fn test_invalid_file_keeps_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        std::fs::write(&path, "(DebugUI: \"true\")").unwrap();

        let mut manager = SettingsManager::open(&path);
        std::fs::write(&path, "not ron at all {").unwrap();
        assert!(manager.reload().is_err());
        assert_eq!(manager.get(keys::DEBUG_UI).as_deref(), Some("true"));
    }

    #[test]
    fn test_shared_settings_is_a_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        std::fs::write(&path, "(DebugUI: \"true\")").unwrap();
        let shared = create_shared_settings(&path);

        let store: &dyn SettingsStore = &shared;
        assert_eq!(store.get(keys::DEBUG_UI).as_deref(), Some("true"));
    }
}
