//! Mapedit Core Library
//!
//! Platform-independent controller for the indoor-map editor: sidebar
//! navigation, level and type toggles, geometry loading and styling, and
//! the edit/create session.
//!
//! The [`Editor`] consumes [`Event`]s and answers with [`Command`]s; the
//! browser client performs the actual DOM, map and network work.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod fragment;
pub mod geojson;
pub mod index;
pub mod layers;
pub mod sections;
pub mod session;
pub mod sidebar;
pub mod style;

pub use api::{GeometryStyles, GeometryType, Level, Query, Source};
pub use command::{Command, Event, LatLng, RenderedFeature, SourceOverlay, TypeToggle};
pub use config::{EditorConfig, MapConfig};
pub use editor::Editor;
pub use error::EditorError;
pub use fragment::{FormSubmission, GeometryForm, ItemRow, Section, SidebarFragment};
pub use geojson::{Feature, FeatureCollection, FeatureProperties, Geometry, GeometryKind, GeometryPayload};
pub use index::{FeatureKey, LayerId};
pub use sections::SectionView;
pub use session::DrawKind;
pub use sidebar::{HistoryUpdate, SidebarRequest};
pub use style::PathStyle;
