//! Editor configuration.

use std::path::Path;

use dream_ecs::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::EditError;

/// Tunables for an editing session, loadable from JSON.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory holding scenes (`.scn`), blueprints (`.bp`) and images.
    pub asset_root: String,
    /// Largest asset, in bytes, that will be read or written.
    pub max_asset_bytes: usize,
    /// Key under which the session blob is stored.
    pub session_key: String,
    /// How long a notification stays in the status bar.
    pub notification_seconds: f64,
    /// Zoom factor per zoom level.
    pub zoom_step: f32,
    /// World-space size the game camera frames at zoom level 0.
    pub game_camera_size: Vec2,
    /// Offset applied to duplicated entities.
    pub duplicate_offset: Vec2,
    /// Start in edit mode rather than play mode.
    pub start_enabled: bool,
    /// Upper bound on overlapping hits considered by click picking.
    pub max_pick_hits: usize,
}

impl Default for EditorConfig {
    /// A 960x540 game camera, assets under `./assets` capped at 6 MiB.
    fn default() -> Self {
        Self {
            asset_root: "assets".to_owned(),
            max_asset_bytes: 6 * 1024 * 1024,
            session_key: "editSession".to_owned(),
            notification_seconds: 3.5,
            zoom_step: 1.5,
            game_camera_size: Vec2::new(960.0, 540.0),
            duplicate_offset: Vec2::new(32.0, 32.0),
            start_enabled: true,
            max_pick_hits: 32,
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self, EditError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EditorConfig::from_json_str(
            r#"{"asset_root": "content", "zoom_step": 2.0, "unknown": 1}"#,
        )
        .unwrap();
        assert_eq!(config.asset_root, "content");
        assert_eq!(config.zoom_step, 2.0);
        assert_eq!(config.max_pick_hits, 32);
        assert_eq!(config.duplicate_offset, Vec2::new(32.0, 32.0));
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            EditorConfig::from_json_str("{"),
            Err(EditError::Config(_))
        ));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = EditorConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, EditError::Io(_)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EditorConfig {
            session_key: "other".to_owned(),
            ..Default::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(EditorConfig::from_json_str(&text).unwrap(), config);
    }
}
