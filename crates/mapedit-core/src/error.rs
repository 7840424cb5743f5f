//! Error types for the editor controller.

use crate::geojson::GeometryKind;

/// Errors raised while interpreting configuration or sidebar content.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("invalid editor configuration: {0}")]
    InvalidConfig(#[source] serde_json::Error),
    #[error("invalid geometry in form field: {0}")]
    InvalidGeometry(#[source] serde_json::Error),
    #[error("unsupported draw kind: {0}")]
    UnknownDrawKind(String),
    #[error("drawn geometry is a {found}, expected {expected}")]
    GeometryKindMismatch {
        expected: GeometryKind,
        found: GeometryKind,
    },
}
