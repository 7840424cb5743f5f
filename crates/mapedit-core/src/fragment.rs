//! Markers found in a server-rendered sidebar fragment.
//!
//! The client extracts these from the parsed HTML; the controller only ever
//! sees this typed summary.

use crate::index::FeatureKey;

/// A form serialized by the client, ready to be posted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmission {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

/// The form around `input[name=geometry]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryForm {
    /// `data-mapitem-type` of the form.
    pub mapitem_type: String,
    /// `data-name`, present when an existing item is edited.
    pub name: Option<String>,
    /// `data-geomtype`, the kind to draw when the item has no geometry yet.
    pub geomtype: Option<String>,
    /// Current value of the geometry field.
    pub value: String,
}

impl GeometryForm {
    pub fn key(&self) -> Option<FeatureKey> {
        self.name
            .as_ref()
            .map(|name| FeatureKey::new(&self.mapitem_type, name))
    }
}

/// A link of the section control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub href: String,
    pub current: bool,
}

/// A row of an item table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub key: FeatureKey,
    /// Whether the last cell holds an edit link.
    pub editable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidebarFragment {
    /// `span[data-redirect]` target.
    pub redirect: Option<String>,
    /// Hidden `redirect` form that submits itself.
    pub redirect_form: Option<FormSubmission>,
    pub geometry_form: Option<GeometryForm>,
    /// `[data-level-switch]` URL template.
    pub level_switch: Option<String>,
    pub sections: Vec<Section>,
    pub rows: Vec<ItemRow>,
    /// `[data-onbeforeunload]` is present.
    pub warn_before_unload: bool,
}

impl SidebarFragment {
    pub fn row(&self, key: &FeatureKey) -> Option<&ItemRow> {
        self.rows.iter().find(|row| &row.key == key)
    }
}

/// Replaces every `placeholder` in `template` with the current level.
pub fn substitute_level(template: &str, placeholder: &str, level: Option<&str>) -> String {
    match level {
        Some(level) if !placeholder.is_empty() => template.replace(placeholder, level),
        _ => template.to_string(),
    }
}
