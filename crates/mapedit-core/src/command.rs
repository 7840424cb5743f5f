//! Events fed into the [`Editor`](crate::Editor) and the commands it emits.
//!
//! The controller never touches the DOM, the network or the map widget.
//! Every effect is described by a [`Command`] for the client to execute,
//! and every outside happening reaches the controller as an [`Event`].

use serde::{Deserialize, Serialize};

use crate::api::{GeometryStyles, GeometryType, Level, Query, Source};
use crate::fragment::{FormSubmission, SidebarFragment};
use crate::geojson::{Feature, Geometry};
use crate::index::{FeatureKey, LayerId};
use crate::sections::SectionView;
use crate::session::DrawKind;
use crate::sidebar::{HistoryUpdate, SidebarRequest};
use crate::style::PathStyle;

/// Map coordinate as reported by the widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A feature to add to the geometry layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub id: LayerId,
    pub feature: Feature,
    pub style: PathStyle,
}

/// A background image overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOverlay {
    pub name: String,
    pub image_url: String,
    pub bounds: [[f64; 2]; 2],
}

/// A geometry type visibility toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeToggle {
    pub name: String,
    pub label: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Page is ready; `location` is the sidebar URL to show first.
    Start { location: String },

    LevelsLoaded(Vec<Level>),
    SourcesLoaded(Vec<Source>),
    GeometryTypesLoaded(Vec<GeometryType>),
    GeometryStylesLoaded(GeometryStyles),
    GeometriesLoaded(Vec<Feature>),
    GeometriesFailed,

    /// Sidebar link click.
    Navigate(String),
    /// Browser back/forward restored `url`.
    HistoryRestored(String),
    SubmitButtonClicked {
        form: usize,
        name: Option<String>,
        value: String,
        at_ms: f64,
    },
    FormSubmitted {
        form: usize,
        submission: FormSubmission,
        at_ms: f64,
    },
    SidebarLoaded {
        html: String,
        fragment: SidebarFragment,
    },
    SidebarFailed {
        status: u16,
        status_text: String,
    },

    LevelSelected(String),
    TypeToggled {
        name: String,
        visible: bool,
    },

    RowHovered(FeatureKey),
    RowLeft,
    GeometryHovered(LayerId),
    GeometryLeft,
    GeometryClicked(LayerId),
    GeometryDoubleClicked(LayerId),
    MapClicked,
    /// `modifier` is Ctrl or Cmd.
    VertexClicked {
        modifier: bool,
    },

    DrawingCommitted(Geometry),
    DrawingCancelled,
    GeometryEdited(Geometry),
    EditingLayerClicked {
        latlng: LatLng,
        modifier: bool,
    },

    SectionsPointer {
        inside: bool,
    },
    SectionClicked(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchLevels { url: String },
    FetchSources { url: String },
    FetchGeometryTypes { url: String },
    FetchGeometryStyles { url: String },
    FetchGeometries { url: String, query: Query },
    FetchSidebar(SidebarRequest),

    UpdateHistory(HistoryUpdate),
    /// Empty the panel and show it as loading.
    UnloadSidebar,
    RenderSidebar { html: String },
    RenderSidebarError { status: u16, status_text: String },
    RenderSections(SectionView),

    AddLevelToggles {
        levels: Vec<String>,
        current: Option<String>,
    },
    /// Undo a rejected level selection.
    SwapLevelToggle { show: String, hide: String },
    AddSourceOverlays(Vec<SourceOverlay>),
    AddTypeToggles(Vec<TypeToggle>),
    SetTypeToggle { name: String, visible: bool },

    ClearGeometries,
    RenderGeometries(Vec<RenderedFeature>),
    RemoveGeometry(LayerId),

    /// Empty the highlight layer and unmark table rows.
    ClearHighlight,
    Highlight {
        row: FeatureKey,
        feature: Feature,
        style: PathStyle,
    },
    ScrollRowIntoView(FeatureKey),
    ActivateEditLink(FeatureKey),
    SetDoubleClickZoom(bool),

    StartEditing { feature: Feature, style: PathStyle },
    StopEditing,
    StartDrawing { kind: DrawKind, style: PathStyle },
    StopDrawing,
    /// Move the committed drawing into the editing layer.
    AdoptDrawing,
    DiscardDrawing,
    AddHole(LatLng),
    /// Resume drawing from the vertex that was just clicked.
    ContinueLine,

    SetGeometryField(String),
    SetCreationLock(bool),
    SelectLevelFields(String),
    FocusNameField,
}
