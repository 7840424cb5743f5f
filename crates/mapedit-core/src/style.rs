//! Path styles handed to the map widget.
//!
//! Field names serialize to the widget's option names (`fillColor`,
//! `fillOpacity`, ...), so a [`PathStyle`] can be passed through verbatim.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geojson::Feature;

/// Type whose regions render as a faint fill with a thin outline.
pub const AREA_LOCATION_TYPE: &str = "arealocation";

pub const DEFAULT_FILL_OPACITY: f64 = 0.6;
pub const AREA_LOCATION_FILL_OPACITY: f64 = 0.02;
pub const AREA_LOCATION_WEIGHT: f64 = 1.0;
pub const LINE_OPACITY: f64 = 0.6;
pub const LINE_WEIGHT: f64 = 5.0;

pub const HIGHLIGHT_COLOR: &str = "#FFFFDD";
pub const HIGHLIGHT_WEIGHT: f64 = 3.0;
pub const HIGHLIGHT_OPACITY: f64 = 0.7;
pub const HIGHLIGHT_CLASS: &str = "mapedit-highlight";

/// Fill for types missing from the palette.
pub const FALLBACK_FILL: &str = "#999999";

const BUILTIN_PALETTE: &[(&str, &str)] = &[
    ("building", "#929292"),
    ("room", "#d1d1d1"),
    ("outside", "#ffffff"),
    ("escalator", "#b5b5b5"),
    ("stair", "#dddd00"),
    ("obstacle", "#999999"),
    ("lineobstacle", "#999999"),
    ("door", "#ffffff"),
    ("hole", "#555555"),
    ("elevatorlevel", "#9ef8fb"),
    ("arealocation", "#0099ff"),
    ("shadow", "#000000"),
];

/// Leaflet path options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    pub stroke: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    pub fill_opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl PathStyle {
    /// Turns a fill style into a stroke-only line style in the same colour.
    pub fn into_line(mut self) -> Self {
        self.stroke = true;
        self.opacity = Some(LINE_OPACITY);
        self.color.clone_from(&self.fill_color);
        self.weight = Some(LINE_WEIGHT);
        self
    }

    /// Outline drawn over hovered features.
    pub fn highlight() -> Self {
        Self {
            stroke: true,
            color: Some(HIGHLIGHT_COLOR.to_string()),
            weight: Some(HIGHLIGHT_WEIGHT),
            opacity: Some(HIGHLIGHT_OPACITY),
            fill_color: None,
            fill_opacity: 0.0,
            smooth_factor: None,
            class_name: Some(HIGHLIGHT_CLASS.to_string()),
        }
    }
}

/// Fill colour per geometry type.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: HashMap<String, String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: BUILTIN_PALETTE
                .iter()
                .map(|(kind, color)| ((*kind).to_string(), (*color).to_string()))
                .collect(),
        }
    }
}

impl Palette {
    /// Built-in palette with `overrides` applied on top.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut palette = Self::default();
        palette.extend(overrides.clone());
        palette
    }

    pub fn extend(&mut self, colors: impl IntoIterator<Item = (String, String)>) {
        self.colors.extend(colors);
    }

    pub fn get(&self, kind: &str) -> Option<&str> {
        self.colors.get(kind).map(String::as_str)
    }

    pub fn fill(&self, kind: &str) -> &str {
        self.get(kind).unwrap_or(FALLBACK_FILL)
    }

    /// Style of a geometry type before any per-feature adjustment.
    pub fn type_style(&self, kind: &str) -> PathStyle {
        let fill = self.fill(kind).to_string();
        if kind == AREA_LOCATION_TYPE {
            return PathStyle {
                stroke: true,
                color: Some(fill.clone()),
                weight: Some(AREA_LOCATION_WEIGHT),
                opacity: None,
                fill_color: Some(fill),
                fill_opacity: AREA_LOCATION_FILL_OPACITY,
                smooth_factor: Some(0.0),
                class_name: None,
            };
        }
        PathStyle {
            stroke: false,
            color: None,
            weight: None,
            opacity: None,
            fill_color: Some(fill),
            fill_opacity: DEFAULT_FILL_OPACITY,
            smooth_factor: Some(0.0),
            class_name: None,
        }
    }

    /// Style of a rendered feature.
    pub fn feature_style(&self, feature: &Feature) -> PathStyle {
        let mut style = self.type_style(feature.kind());
        if feature.is_line() {
            style = style.into_line();
        }
        if let Some(color) = &feature.properties.color {
            style.fill_color = Some(color.clone());
        }
        style
    }
}
