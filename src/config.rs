//! Viewer configuration, loaded from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings for the viewer window, depth pass and camera.
///
/// Missing fields fall back to their defaults, so a partial config file is
/// fine. A missing or malformed file is logged and replaced by
/// [`ViewerConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    pub depth_map_width: u32,
    pub depth_map_height: u32,
    pub model_path: String,
    pub fov: f32,
    pub movement_speed: f32,
    pub look_speed: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1600,
            window_height: 900,
            fullscreen: false,
            vsync: true,
            depth_map_width: 1024,
            depth_map_height: 1024,
            model_path: "assets/sponza/sponza.obj".to_string(),
            fov: 45.0,
            movement_speed: 10.0,
            look_speed: 0.125,
        }
    }
}

impl ViewerConfig {
    /// Parses a config from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| e.to_string())
    }

    /// Loads the config from the given path, or from the per-user config
    /// directory when no path is given. Falls back to defaults when the file
    /// is missing or malformed.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    log::warn!("no config directory available, using default settings");
                    return Self::default();
                }
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    log::info!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("malformed config {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("could not read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// The per-user default config location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meshview").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.window_width, 1600);
        assert_eq!(config.depth_map_width, 1024);
        assert!(config.vsync);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ViewerConfig::from_json(r#"{ "window_width": 800, "vsync": false }"#).unwrap();
        assert_eq!(config.window_width, 800);
        assert!(!config.vsync);
        assert_eq!(config.window_height, ViewerConfig::default().window_height);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_roundtrip() {
        let config = ViewerConfig {
            model_path: "assets/box.obj".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ViewerConfig::from_json(&json).unwrap(), config);
    }
}
