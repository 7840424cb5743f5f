//! GeoJSON types exchanged with the geometry API and the map widget.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::index::FeatureKey;

/// A coordinate tuple. Usually `[x, y]`.
pub type Position = Vec<f64>;

/// Property `type` value marking derived shadow features.
pub const SHADOW_TYPE: &str = "shadow";

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

/// The `type` member of a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point { .. } => GeometryKind::Point,
            Self::MultiPoint { .. } => GeometryKind::MultiPoint,
            Self::LineString { .. } => GeometryKind::LineString,
            Self::MultiLineString { .. } => GeometryKind::MultiLineString,
            Self::Polygon { .. } => GeometryKind::Polygon,
            Self::MultiPolygon { .. } => GeometryKind::MultiPolygon,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes to the compact form stored in the hidden form field.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionTag {
    #[default]
    FeatureCollection,
}

/// Properties attached to every feature served by the geometry API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Geometry type name (`room`, `door`, `shadow`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Per-feature fill colour override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureProperties {
    pub fn of_type(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            original_type: None,
            original_name: None,
            color: None,
            extra: Map::new(),
        }
    }
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub tag: FeatureTag,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: FeatureProperties) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties,
        }
    }

    pub fn kind(&self) -> &str {
        &self.properties.kind
    }

    pub fn is_line(&self) -> bool {
        self.geometry.kind() == GeometryKind::LineString
    }

    pub fn is_shadow(&self) -> bool {
        self.properties.kind == SHADOW_TYPE || self.properties.original_type.is_some()
    }

    /// Key of a regular named feature.
    pub fn key(&self) -> Option<FeatureKey> {
        if self.is_shadow() {
            return None;
        }
        let name = self.properties.name.as_ref()?;
        Some(FeatureKey::new(&self.properties.kind, name))
    }

    /// Key of the feature a shadow belongs to.
    pub fn shadow_of(&self) -> Option<FeatureKey> {
        if !self.is_shadow() {
            return None;
        }
        let kind = self.properties.original_type.as_ref()?;
        let name = self.properties.original_name.as_ref()?;
        Some(FeatureKey::new(kind, name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default)]
    pub tag: FeatureCollectionTag,
    pub features: Vec<Feature>,
}

/// Geometry API response: a collection or a bare feature array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometryPayload {
    Collection(FeatureCollection),
    Features(Vec<Feature>),
}

impl GeometryPayload {
    pub fn into_features(self) -> Vec<Feature> {
        match self {
            Self::Collection(collection) => collection.features,
            Self::Features(features) => features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_detection() {
        let json = r#"{
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]},
            "properties": {"type": "shadow", "original_type": "stair", "original_name": "s1"}
        }"#;
        let feature: Feature = serde_json::from_str(json).expect("feature should parse");

        assert!(feature.is_shadow());
        assert_eq!(feature.key(), None);
        assert_eq!(feature.shadow_of(), Some(FeatureKey::new("stair", "s1")));
    }

    #[test]
    fn test_payload_accepts_bare_array() {
        let json = r#"[
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]},
             "properties": {"type": "door", "name": "d1", "level": "0"}}
        ]"#;
        let features = serde_json::from_str::<GeometryPayload>(json)
            .expect("payload should parse")
            .into_features();

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].key(), Some(FeatureKey::new("door", "d1")));
        assert_eq!(features[0].properties.extra.get("level"), Some(&Value::from("0")));
    }

    #[test]
    fn test_geometry_json_keeps_type_tag() {
        let geometry = Geometry::LineString {
            coordinates: vec![vec![0.0, 0.0], vec![3.5, 4.0]],
        };
        let json = geometry.to_json().expect("geometry should serialize");
        let value: Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["type"], "LineString");
        assert_eq!(Geometry::from_json(&json).expect("reparse"), geometry);
    }
}
