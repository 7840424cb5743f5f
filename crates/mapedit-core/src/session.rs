//! Edit/create session state machine.
//!
//! ```text
//! Idle --edit form--> Editing --unload--> Idle
//! Idle --draw form--> Creating --commit--> Editing
//!                     Creating --unload/cancel--> Idle
//! ```

use std::str::FromStr;

use crate::error::EditorError;
use crate::geojson::{Geometry, GeometryKind};
use crate::index::{FeatureKey, LayerId};

/// Shape the user is asked to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Polygon,
    Polyline,
}

impl DrawKind {
    pub fn geometry_kind(self) -> GeometryKind {
        match self {
            Self::Polygon => GeometryKind::Polygon,
            Self::Polyline => GeometryKind::LineString,
        }
    }
}

impl FromStr for DrawKind {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polygon" => Ok(Self::Polygon),
            "polyline" => Ok(Self::Polyline),
            other => Err(EditorError::UnknownDrawKind(other.to_string())),
        }
    }
}

/// The feature currently in the editing layer.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedFeature {
    pub mapitem_type: String,
    /// Key of the existing item, `None` for freshly drawn geometry.
    pub key: Option<FeatureKey>,
    pub kind: GeometryKind,
    /// Display layers taken off the map for the duration of the session.
    pub removed: Vec<LayerId>,
    pub modified: bool,
}

/// What was interrupted by [`EditSession::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cancelled {
    Nothing,
    Editing { refetch: bool },
    Creating,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditSession {
    #[default]
    Idle,
    Editing(EditedFeature),
    Creating { mapitem_type: String, kind: DrawKind },
}

impl EditSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_creating(&self) -> bool {
        matches!(self, Self::Creating { .. })
    }

    pub fn editing(&self) -> Option<&EditedFeature> {
        match self {
            Self::Editing(feature) => Some(feature),
            _ => None,
        }
    }

    /// Type and shape of the drawing in progress.
    pub fn creating(&self) -> Option<(&str, DrawKind)> {
        match self {
            Self::Creating { mapitem_type, kind } => Some((mapitem_type, *kind)),
            _ => None,
        }
    }

    /// Key of an existing item held in the editing layer.
    pub fn held_key(&self) -> Option<&FeatureKey> {
        self.editing().and_then(|feature| feature.key.as_ref())
    }

    pub fn start_editing(&mut self, feature: EditedFeature) {
        debug_assert!(self.is_idle(), "session must be idle before editing");
        *self = Self::Editing(feature);
    }

    pub fn start_creating(&mut self, mapitem_type: String, kind: DrawKind) {
        debug_assert!(self.is_idle(), "session must be idle before creating");
        *self = Self::Creating { mapitem_type, kind };
    }

    /// Moves a committed drawing into editing. Leaves the session untouched
    /// when not creating or when the drawn shape has the wrong kind.
    pub fn finish_creating(&mut self, geometry: &Geometry) -> Result<bool, EditorError> {
        let Self::Creating { mapitem_type, kind } = self else {
            return Ok(false);
        };
        let expected = kind.geometry_kind();
        let found = geometry.kind();
        if expected != found {
            return Err(EditorError::GeometryKindMismatch { expected, found });
        }
        *self = Self::Editing(EditedFeature {
            mapitem_type: std::mem::take(mapitem_type),
            key: None,
            kind: found,
            removed: Vec::new(),
            modified: true,
        });
        Ok(true)
    }

    /// Records display layers kept off the map for the edited feature.
    pub fn hold(&mut self, ids: impl IntoIterator<Item = LayerId>) {
        if let Self::Editing(feature) = self {
            feature.removed.extend(ids);
        }
    }

    /// Marks the edited feature as changed. Returns false outside editing.
    pub fn record_edit(&mut self) -> bool {
        match self {
            Self::Editing(feature) => {
                feature.modified = true;
                true
            }
            _ => false,
        }
    }

    /// Returns to idle.
    pub fn cancel(&mut self) -> Cancelled {
        match std::mem::take(self) {
            Self::Idle => Cancelled::Nothing,
            Self::Creating { .. } => Cancelled::Creating,
            Self::Editing(feature) => Cancelled::Editing {
                refetch: feature.modified || !feature.removed.is_empty(),
            },
        }
    }
}
