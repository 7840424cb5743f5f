//! Editor configuration.
//!
//! Every field has a default so a page can ship a partial JSON object (or
//! nothing at all) and still boot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;

/// Initial map view and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// South-west and north-east corners in map units.
    pub bounds: [[f64; 2]; 2],
    /// Padding in pixels applied when fitting the initial view.
    pub padding: [u32; 2],
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 2,
            min_zoom: 1,
            max_zoom: 10,
            bounds: [[0.0, 0.0], [240.0, 400.0]],
            padding: [30, 50],
        }
    }
}

/// Editor configuration read once per page session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Prefix for every JSON endpoint.
    pub api_base: String,
    /// How long a submit-button click stays attached to its form.
    pub submit_window_ms: f64,
    /// Token replaced by the current level name in sidebar URLs.
    pub level_placeholder: String,
    /// `EnvFilter` directive for the console logger.
    pub log_filter: String,
    /// Fill colour overrides keyed by geometry type.
    pub palette: HashMap<String, String>,
    pub map: MapConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_base: "/api".to_string(),
            submit_window_ms: 300.0,
            level_placeholder: "LEVEL".to_string(),
            log_filter: "info".to_string(),
            palette: HashMap::new(),
            map: MapConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Parses a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json).map_err(EditorError::InvalidConfig)
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
