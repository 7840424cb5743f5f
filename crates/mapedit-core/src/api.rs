//! Records served by the map data API and the endpoints they come from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;

/// One floor of the building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    #[serde(default)]
    pub altitude: f64,
}

/// A georeferenced background image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub bounds: [[f64; 2]; 2],
}

/// Geometry category metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryType {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_plural: String,
}

impl GeometryType {
    /// Label shown next to the visibility toggle.
    pub fn label(&self) -> &str {
        if !self.title_plural.is_empty() {
            &self.title_plural
        } else if !self.title.is_empty() {
            &self.title
        } else {
            &self.name
        }
    }
}

/// Fill colour per geometry type.
pub type GeometryStyles = HashMap<String, String>;

/// Decoded query string pairs; encoding is left to the transport.
pub type Query = Vec<(String, String)>;

pub fn levels_url(config: &EditorConfig) -> String {
    config.api_url("levels/?ordering=-altitude")
}

pub fn sources_url(config: &EditorConfig) -> String {
    config.api_url("sources/")
}

pub fn source_image_url(config: &EditorConfig, name: &str) -> String {
    config.api_url(&format!("sources/{name}/image/"))
}

pub fn geometry_types_url(config: &EditorConfig) -> String {
    config.api_url("geometrytypes/")
}

pub fn geometry_styles_url(config: &EditorConfig) -> String {
    config.api_url("editor/geometrystyles/")
}

pub fn geometries_url(config: &EditorConfig) -> String {
    config.api_url("geometries/")
}

/// Query selecting one level and, when given, a set of types.
pub fn geometries_query<'a>(level: &str, types: Option<impl IntoIterator<Item = &'a str>>) -> Query {
    let mut query = vec![("level".to_string(), level.to_string())];
    if let Some(types) = types {
        query.extend(types.into_iter().map(|kind| ("type".to_string(), kind.to_string())));
    }
    query
}
