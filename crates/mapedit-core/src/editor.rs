//! The editor controller.
//!
//! One [`Editor`] exists per page session. It owns every piece of editor
//! state and turns [`Event`]s into [`Command`]s.

use tracing::{debug, error, info, warn};

use crate::api::{
    self, GeometryStyles, GeometryType, Level, Source, geometries_query,
};
use crate::command::{
    Command, Event, LatLng, RenderedFeature, SourceOverlay, TypeToggle,
};
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::fragment::{FormSubmission, GeometryForm, SidebarFragment, substitute_level};
use crate::geojson::{Feature, FeatureProperties, Geometry, GeometryKind};
use crate::index::{FeatureKey, GeometryIndex, LayerId};
use crate::layers::{LevelSet, TypeSet};
use crate::sections::{SectionClick, SectionControl};
use crate::session::{Cancelled, DrawKind, EditSession, EditedFeature};
use crate::sidebar::{SidebarRequest, SidebarState, SubmitCapture};
use crate::style::{Palette, PathStyle};

pub struct Editor {
    config: EditorConfig,
    palette: Palette,
    sidebar: SidebarState,
    submit: SubmitCapture,
    sections: SectionControl,
    levels: LevelSet,
    types: TypeSet,
    index: GeometryIndex,
    /// A geometry fetch is in flight.
    loading: bool,
    /// Display is stale and must be refetched on the next sidebar load.
    refetch_pending: bool,
    next_layer: u64,
    highlighted: Option<FeatureKey>,
    session: EditSession,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            palette: Palette::with_overrides(&config.palette),
            submit: SubmitCapture::new(config.submit_window_ms),
            sidebar: SidebarState::new(),
            sections: SectionControl::new(),
            levels: LevelSet::new(),
            types: TypeSet::new(),
            index: GeometryIndex::new(),
            loading: false,
            refetch_pending: false,
            next_layer: 0,
            highlighted: None,
            session: EditSession::Idle,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn sidebar(&self) -> &SidebarState {
        &self.sidebar
    }

    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    pub fn types(&self) -> &TypeSet {
        &self.types
    }

    pub fn index(&self) -> &GeometryIndex {
        &self.index
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn is_loading_geometries(&self) -> bool {
        self.loading
    }

    pub fn refetch_pending(&self) -> bool {
        self.refetch_pending
    }

    pub fn highlighted(&self) -> Option<&FeatureKey> {
        self.highlighted.as_ref()
    }

    /// Whether leaving the page should ask for confirmation.
    pub fn warn_before_unload(&self) -> bool {
        self.sidebar.fragment().warn_before_unload
    }

    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        let mut out = Vec::new();
        match event {
            Event::Start { location } => self.start(&mut out, location),

            Event::LevelsLoaded(levels) => self.levels_loaded(&mut out, levels),
            Event::SourcesLoaded(sources) => self.sources_loaded(&mut out, sources),
            Event::GeometryTypesLoaded(types) => self.types_loaded(&mut out, types),
            Event::GeometryStylesLoaded(styles) => self.styles_loaded(&mut out, styles),
            Event::GeometriesLoaded(features) => self.geometries_loaded(&mut out, features),
            Event::GeometriesFailed => {
                warn!("geometry load failed, keeping current display");
                self.loading = false;
            }

            Event::Navigate(url) => self.navigate(&mut out, url, true),
            Event::HistoryRestored(url) => self.navigate(&mut out, url, false),
            Event::SubmitButtonClicked {
                form,
                name,
                value,
                at_ms,
            } => self.submit.capture(form, name, value, at_ms),
            Event::FormSubmitted {
                form,
                submission,
                at_ms,
            } => self.form_submitted(&mut out, form, submission, at_ms),
            Event::SidebarLoaded { html, fragment } => self.sidebar_loaded(&mut out, html, fragment),
            Event::SidebarFailed {
                status,
                status_text,
            } => self.sidebar_failed(&mut out, status, status_text),

            Event::LevelSelected(name) => self.level_selected(&mut out, name),
            Event::TypeToggled { name, visible } => self.type_toggled(&mut out, name, visible),

            Event::RowHovered(key) => self.highlight(&mut out, key),
            Event::RowLeft | Event::GeometryLeft => self.unhighlight(&mut out),
            Event::GeometryHovered(id) => match self.layer_key(id) {
                Some(key) => self.highlight(&mut out, key),
                None => self.unhighlight(&mut out),
            },
            Event::GeometryClicked(id) => {
                if let Some(key) = self.layer_key(id) {
                    if self.sidebar.fragment().row(&key).is_some() {
                        out.push(Command::ScrollRowIntoView(key));
                    }
                }
            }
            Event::GeometryDoubleClicked(id) => self.geometry_double_clicked(&mut out, id),
            Event::MapClicked => {
                out.push(Command::SetDoubleClickZoom(true));
                if self.sections.collapse() {
                    out.push(Command::RenderSections(self.sections.view().clone()));
                }
            }
            Event::VertexClicked { modifier } => {
                out.push(Command::SetDoubleClickZoom(false));
                if modifier && !self.session.is_idle() {
                    out.push(Command::ContinueLine);
                }
            }

            Event::DrawingCommitted(geometry) => self.drawing_committed(&mut out, &geometry),
            Event::DrawingCancelled => {
                if self.session.is_creating() {
                    info!("drawing cancelled");
                    self.session.cancel();
                }
                out.push(Command::DiscardDrawing);
            }
            Event::GeometryEdited(geometry) => {
                if self.session.record_edit() {
                    Self::write_geometry(&mut out, &geometry);
                }
            }
            Event::EditingLayerClicked { latlng, modifier } => {
                self.editing_layer_clicked(&mut out, latlng, modifier);
            }

            Event::SectionsPointer { inside } => {
                let changed = if inside {
                    self.sections.expand()
                } else {
                    self.sections.collapse()
                };
                if changed {
                    out.push(Command::RenderSections(self.sections.view().clone()));
                }
            }
            Event::SectionClicked(index) => self.section_clicked(&mut out, index),
        }
        out
    }

    fn start(&mut self, out: &mut Vec<Command>, location: String) {
        out.push(Command::FetchGeometryStyles {
            url: api::geometry_styles_url(&self.config),
        });
        out.push(Command::FetchLevels {
            url: api::levels_url(&self.config),
        });
        out.push(Command::FetchSources {
            url: api::sources_url(&self.config),
        });
        out.push(Command::FetchGeometryTypes {
            url: api::geometry_types_url(&self.config),
        });
        self.navigate(out, location, true);
    }

    // Sidebar

    fn navigate(&mut self, out: &mut Vec<Command>, url: String, record_history: bool) {
        info!("sidebar navigate: {url}");
        if record_history {
            out.push(Command::UpdateHistory(self.sidebar.history_for(&url)));
        }
        self.unload(out);
        self.request(out, SidebarRequest::Get { url });
    }

    fn request(&mut self, out: &mut Vec<Command>, request: SidebarRequest) {
        self.sidebar.request(&request);
        out.push(Command::FetchSidebar(request));
    }

    fn unload(&mut self, out: &mut Vec<Command>) {
        self.sections.disable();
        out.push(Command::RenderSections(self.sections.view().clone()));
        self.sidebar.unload();
        self.submit.clear();
        out.push(Command::UnloadSidebar);
        self.unhighlight(out);
        self.cancel_session(out);
    }

    fn post(&mut self, out: &mut Vec<Command>, submission: FormSubmission) {
        info!("sidebar submit: {}", submission.action);
        self.unload(out);
        self.request(
            out,
            SidebarRequest::Post {
                url: submission.action,
                fields: submission.fields,
            },
        );
    }

    fn form_submitted(
        &mut self,
        out: &mut Vec<Command>,
        form: usize,
        mut submission: FormSubmission,
        at_ms: f64,
    ) {
        if self.session.is_creating() {
            info!("ignoring form submission while drawing");
            self.submit.clear();
            return;
        }
        if let Some(button) = self.submit.take(form, at_ms) {
            submission.fields.push(button);
        }
        self.post(out, submission);
    }

    fn sidebar_loaded(&mut self, out: &mut Vec<Command>, html: String, fragment: SidebarFragment) {
        if let Some(target) = &fragment.redirect {
            let url = substitute_level(target, &self.config.level_placeholder, self.levels.current());
            debug!("sidebar redirect to {url}");
            self.sidebar.redirected();
            self.navigate(out, url, true);
            return;
        }
        if let Some(form) = fragment.redirect_form {
            debug!("sidebar redirect form to {}", form.action);
            self.post(out, form);
            return;
        }

        let sections = fragment.sections.clone();
        self.sidebar.loaded(fragment);
        out.push(Command::RenderSidebar { html });

        self.sections.load(sections);
        out.push(Command::RenderSections(self.sections.view().clone()));

        // An earlier response may have started a session that no unload
        // has ended yet.
        self.cancel_session(out);

        if self.refetch_pending && !self.loading {
            self.reload(out);
        }

        self.check_start_editing(out);
    }

    fn sidebar_failed(&mut self, out: &mut Vec<Command>, status: u16, status_text: String) {
        warn!("sidebar request failed: {status} {status_text}");
        self.sidebar.failed();
        out.push(Command::RenderSidebarError {
            status,
            status_text,
        });
        self.sections.hide();
        out.push(Command::RenderSections(self.sections.view().clone()));
    }

    fn section_clicked(&mut self, out: &mut Vec<Command>, index: usize) {
        match self.sections.click(index) {
            SectionClick::Expanded => {
                out.push(Command::RenderSections(self.sections.view().clone()));
            }
            SectionClick::Navigate(href) => {
                out.push(Command::RenderSections(self.sections.view().clone()));
                self.navigate(out, href, true);
            }
            SectionClick::Ignored => {}
        }
    }

    // Levels, sources, types

    fn levels_loaded(&mut self, out: &mut Vec<Command>, levels: Vec<Level>) {
        debug!("{} levels loaded", levels.len());
        self.levels.load(levels);
        out.push(Command::AddLevelToggles {
            levels: self.levels.levels().iter().map(|level| level.name.clone()).collect(),
            current: self.levels.current().map(str::to_string),
        });
        self.reload(out);
    }

    fn sources_loaded(&mut self, out: &mut Vec<Command>, sources: Vec<Source>) {
        debug!("{} sources loaded", sources.len());
        let overlays = sources
            .into_iter()
            .map(|source| SourceOverlay {
                image_url: api::source_image_url(&self.config, &source.name),
                name: source.name,
                bounds: source.bounds,
            })
            .collect();
        out.push(Command::AddSourceOverlays(overlays));
    }

    fn types_loaded(&mut self, out: &mut Vec<Command>, types: Vec<GeometryType>) {
        debug!("{} geometry types loaded", types.len());
        self.types.load(types);
        let toggles = self
            .types
            .types()
            .map(|(kind, visible)| TypeToggle {
                name: kind.name.clone(),
                label: kind.label().to_string(),
                visible,
            })
            .collect();
        out.push(Command::AddTypeToggles(toggles));
        self.reload(out);
    }

    fn styles_loaded(&mut self, out: &mut Vec<Command>, styles: GeometryStyles) {
        debug!("{} geometry styles loaded", styles.len());
        self.palette.extend(styles);
        self.palette.extend(self.config.palette.clone());
        if !self.index.is_empty() {
            self.reload(out);
        }
    }

    fn level_selected(&mut self, out: &mut Vec<Command>, name: String) {
        let Some(current) = self.levels.current().map(str::to_string) else {
            return;
        };
        if name == current || !self.levels.contains(&name) {
            return;
        }
        let template = match (&self.sidebar.fragment().level_switch, self.loading) {
            (Some(template), false) => template.clone(),
            (None, _) => {
                warn!("sidebar does not allow switching to level {name}");
                out.push(Command::SwapLevelToggle {
                    show: current,
                    hide: name,
                });
                return;
            }
            (Some(_), true) => {
                warn!("geometry reload in flight, rejecting level {name}");
                out.push(Command::SwapLevelToggle {
                    show: current,
                    hide: name,
                });
                return;
            }
        };

        info!("switching level {current} -> {name}");
        self.levels.select(&name);
        let url = substitute_level(&template, &self.config.level_placeholder, Some(&name));
        self.navigate(out, url, true);
        self.reload(out);
    }

    fn type_toggled(&mut self, out: &mut Vec<Command>, name: String, visible: bool) {
        match self.types.is_visible(&name) {
            None => {
                warn!("toggle for unknown geometry type {name}");
                return;
            }
            Some(current) if current == visible => return,
            Some(_) => {}
        }
        if self.loading {
            warn!("geometry reload in flight, reverting toggle of {name}");
            out.push(Command::SetTypeToggle {
                name,
                visible: !visible,
            });
            return;
        }
        self.types.set_visible(&name, visible);
        self.reload(out);
    }

    // Geometries

    /// Starts a geometry fetch for the current level and visible types.
    /// Does nothing while a fetch is running or before levels are known.
    fn reload(&mut self, out: &mut Vec<Command>) {
        if self.loading {
            return;
        }
        let Some(level) = self.levels.current() else {
            debug!("no level yet, skipping geometry reload");
            return;
        };
        self.refetch_pending = false;
        if self.types.all_hidden() {
            debug!("all geometry types hidden");
            self.index.clear();
            self.unhighlight(out);
            out.push(Command::ClearGeometries);
            return;
        }
        let query = geometries_query(level, self.types.is_loaded().then(|| self.types.visible()));
        self.loading = true;
        out.push(Command::FetchGeometries {
            url: api::geometries_url(&self.config),
            query,
        });
    }

    fn geometries_loaded(&mut self, out: &mut Vec<Command>, features: Vec<Feature>) {
        debug!("{} geometries loaded", features.len());
        self.loading = false;
        self.index.clear();
        self.unhighlight(out);
        out.push(Command::ClearGeometries);

        let held = self.session.held_key().cloned();
        let mut rendered = Vec::with_capacity(features.len());
        let mut skipped = Vec::new();
        for feature in features {
            let id = self.next_layer_id();
            if let Some(held) = &held {
                if feature.key().as_ref() == Some(held) || feature.shadow_of().as_ref() == Some(held) {
                    skipped.push(id);
                    continue;
                }
            }
            let style = self.palette.feature_style(&feature);
            self.index.insert(id, feature.clone());
            rendered.push(RenderedFeature { id, feature, style });
        }
        self.session.hold(skipped);
        out.push(Command::RenderGeometries(rendered));
    }

    fn next_layer_id(&mut self) -> LayerId {
        self.next_layer += 1;
        LayerId(self.next_layer)
    }

    fn layer_key(&self, id: LayerId) -> Option<FeatureKey> {
        self.index.layer(id).and_then(Feature::key)
    }

    // Highlight

    fn highlight(&mut self, out: &mut Vec<Command>, key: FeatureKey) {
        self.unhighlight(out);
        let Some(feature) = self.index.feature(&key) else {
            return;
        };
        if self.sidebar.fragment().row(&key).is_none() {
            return;
        }
        out.push(Command::Highlight {
            row: key.clone(),
            feature: feature.clone(),
            style: PathStyle::highlight(),
        });
        self.highlighted = Some(key);
    }

    fn unhighlight(&mut self, out: &mut Vec<Command>) {
        self.highlighted = None;
        out.push(Command::ClearHighlight);
    }

    fn geometry_double_clicked(&mut self, out: &mut Vec<Command>, id: LayerId) {
        let Some(key) = self.layer_key(id) else {
            return;
        };
        if self.sidebar.fragment().row(&key).is_some_and(|row| row.editable) {
            out.push(Command::SetDoubleClickZoom(false));
            out.push(Command::ActivateEditLink(key));
        }
    }

    // Edit session

    fn check_start_editing(&mut self, out: &mut Vec<Command>) {
        let Some(form) = self.sidebar.fragment().geometry_form.clone() else {
            return;
        };
        if form.value.trim().is_empty() {
            if let Some(geomtype) = &form.geomtype {
                self.start_creating(out, &form, geomtype);
            }
        } else {
            match Geometry::from_json(&form.value) {
                Ok(geometry) => self.start_editing(out, form, geometry),
                Err(err) => error!("{}", EditorError::InvalidGeometry(err)),
            }
        }
    }

    fn start_editing(&mut self, out: &mut Vec<Command>, form: GeometryForm, geometry: Geometry) {
        let key = form.key();
        let mut removed = Vec::new();
        if let Some(key) = &key {
            removed.extend(self.index.feature_layer(key));
            removed.extend(self.index.shadow_layer(key));
            for id in &removed {
                self.index.remove(*id);
                out.push(Command::RemoveGeometry(*id));
            }
        }
        info!(
            "editing {} {}",
            form.mapitem_type,
            form.name.as_deref().unwrap_or("(new)")
        );

        let mut properties = FeatureProperties::of_type(&form.mapitem_type);
        properties.name = form.name;
        let feature = Feature::new(geometry, properties);
        let style = self.palette.feature_style(&feature);
        self.session.start_editing(EditedFeature {
            mapitem_type: form.mapitem_type,
            key,
            kind: feature.geometry.kind(),
            removed,
            modified: false,
        });
        out.push(Command::StartEditing { feature, style });
    }

    fn start_creating(&mut self, out: &mut Vec<Command>, form: &GeometryForm, geomtype: &str) {
        let kind = match geomtype.parse::<DrawKind>() {
            Ok(kind) => kind,
            Err(err) => {
                warn!("{err}");
                return;
            }
        };
        info!("drawing new {} ({kind:?})", form.mapitem_type);
        let style = self.draw_style(&form.mapitem_type, kind);
        self.session.start_creating(form.mapitem_type.clone(), kind);
        out.push(Command::SetCreationLock(true));
        out.push(Command::StartDrawing { kind, style });
        if let Some(level) = self.levels.current() {
            out.push(Command::SelectLevelFields(level.to_string()));
        }
    }

    fn cancel_session(&mut self, out: &mut Vec<Command>) {
        match self.session.cancel() {
            Cancelled::Nothing => {}
            Cancelled::Creating => out.push(Command::StopDrawing),
            Cancelled::Editing { refetch } => {
                out.push(Command::StopEditing);
                if refetch {
                    debug!("edit session left the display stale, refetch scheduled");
                    self.refetch_pending = true;
                }
            }
        }
    }

    fn drawing_committed(&mut self, out: &mut Vec<Command>, geometry: &Geometry) {
        match self.session.finish_creating(geometry) {
            Ok(true) => {
                out.push(Command::AdoptDrawing);
                Self::write_geometry(out, geometry);
                out.push(Command::SetCreationLock(false));
                out.push(Command::FocusNameField);
            }
            Ok(false) => debug!("drawing committed outside of a creation session"),
            Err(err) => {
                error!("{err}");
                out.push(Command::DiscardDrawing);
                if let Some((mapitem_type, kind)) = self.session.creating() {
                    let style = self.draw_style(mapitem_type, kind);
                    out.push(Command::StartDrawing { kind, style });
                }
            }
        }
    }

    fn draw_style(&self, mapitem_type: &str, kind: DrawKind) -> PathStyle {
        let style = self.palette.type_style(mapitem_type);
        match kind {
            DrawKind::Polygon => style,
            DrawKind::Polyline => style.into_line(),
        }
    }

    fn editing_layer_clicked(&mut self, out: &mut Vec<Command>, latlng: LatLng, modifier: bool) {
        let is_polygon = self
            .session
            .editing()
            .is_some_and(|feature| feature.kind == GeometryKind::Polygon);
        if modifier && is_polygon {
            out.push(Command::AddHole(latlng));
        }
    }

    fn write_geometry(out: &mut Vec<Command>, geometry: &Geometry) {
        match geometry.to_json() {
            Ok(json) => out.push(Command::SetGeometryField(json)),
            Err(err) => error!("failed to serialize geometry: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{ItemRow, Section};
    use crate::sidebar::HistoryUpdate;

    fn square(offset: f64) -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![
                vec![offset, offset],
                vec![offset + 1.0, offset],
                vec![offset + 1.0, offset + 1.0],
                vec![offset, offset],
            ]],
        }
    }

    fn named(kind: &str, name: &str) -> Feature {
        let mut properties = FeatureProperties::of_type(kind);
        properties.name = Some(name.to_string());
        Feature::new(square(0.0), properties)
    }

    fn shadow(kind: &str, name: &str) -> Feature {
        let mut properties = FeatureProperties::of_type("shadow");
        properties.original_type = Some(kind.to_string());
        properties.original_name = Some(name.to_string());
        Feature::new(square(0.5), properties)
    }

    fn level(name: &str, altitude: f64) -> Level {
        Level {
            name: name.to_string(),
            altitude,
        }
    }

    fn kind(name: &str) -> GeometryType {
        GeometryType {
            name: name.to_string(),
            title: name.to_string(),
            title_plural: format!("{name}s"),
        }
    }

    fn fetch_count(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, Command::FetchGeometries { .. }))
            .count()
    }

    fn loaded(fragment: SidebarFragment) -> Event {
        Event::SidebarLoaded {
            html: "<div></div>".to_string(),
            fragment,
        }
    }

    /// Editor with levels 0..=2 (current "0"), two types and loaded geometries.
    fn ready_editor(features: Vec<Feature>) -> Editor {
        let mut editor = Editor::new(EditorConfig::default());
        editor.handle(Event::Start {
            location: "/editor/".to_string(),
        });
        editor.handle(Event::GeometryTypesLoaded(vec![kind("room"), kind("stair")]));
        let commands = editor.handle(Event::LevelsLoaded(vec![
            level("0", 0.0),
            level("2", 8.0),
            level("1", 4.0),
        ]));
        assert_eq!(fetch_count(&commands), 1);
        editor.handle(Event::GeometriesLoaded(features));
        editor
    }

    #[test]
    fn test_start_fetches_everything_and_replaces_history() {
        let mut editor = Editor::new(EditorConfig::default());
        let commands = editor.handle(Event::Start {
            location: "/editor/".to_string(),
        });

        assert!(commands.contains(&Command::FetchLevels {
            url: "/api/levels/?ordering=-altitude".to_string()
        }));
        assert!(commands.contains(&Command::FetchSources {
            url: "/api/sources/".to_string()
        }));
        assert!(commands.contains(&Command::FetchGeometryTypes {
            url: "/api/geometrytypes/".to_string()
        }));
        assert!(commands.contains(&Command::UpdateHistory(HistoryUpdate::Replace(
            "/editor/".to_string()
        ))));
        assert!(commands.contains(&Command::FetchSidebar(SidebarRequest::Get {
            url: "/editor/".to_string()
        })));
        assert!(editor.sidebar().is_loading());
    }

    #[test]
    fn test_navigate_pushes_once_panel_has_content() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment::default()));

        let commands = editor.handle(Event::Navigate("/editor/rooms/".to_string()));
        assert_eq!(
            commands[0],
            Command::UpdateHistory(HistoryUpdate::Push("/editor/rooms/".to_string()))
        );
        assert!(commands.contains(&Command::UnloadSidebar));
        assert!(commands.contains(&Command::ClearHighlight));

        let restored = editor.handle(Event::HistoryRestored("/editor/".to_string()));
        assert!(!restored.iter().any(|c| matches!(c, Command::UpdateHistory(_))));
    }

    #[test]
    fn test_levels_ordered_and_query_built() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.handle(Event::GeometryTypesLoaded(vec![kind("room"), kind("door")]));
        let commands = editor.handle(Event::LevelsLoaded(vec![level("0", 0.0), level("1", 4.0)]));

        assert!(commands.contains(&Command::AddLevelToggles {
            levels: vec!["1".to_string(), "0".to_string()],
            current: Some("0".to_string()),
        }));
        assert!(commands.contains(&Command::FetchGeometries {
            url: "/api/geometries/".to_string(),
            query: vec![
                ("level".to_string(), "0".to_string()),
                ("type".to_string(), "room".to_string()),
                ("type".to_string(), "door".to_string()),
            ],
        }));
        assert!(editor.is_loading_geometries());
    }

    #[test]
    fn test_geometries_indexed_with_shadows() {
        let editor = ready_editor(vec![shadow("stair", "s1"), named("stair", "s1"), named("room", "r1")]);

        let key = FeatureKey::new("stair", "s1");
        let shadow_id = editor.index().shadow_layer(&key).expect("shadow indexed");
        let feature_id = editor.index().feature_layer(&key).expect("feature indexed");
        assert_ne!(shadow_id, feature_id);
        assert_eq!(editor.index().len(), 3);
        assert!(!editor.is_loading_geometries());
    }

    #[test]
    fn test_toggle_during_reload_reverts_without_fetch() {
        let mut editor = ready_editor(Vec::new());
        let commands = editor.handle(Event::TypeToggled {
            name: "room".to_string(),
            visible: false,
        });
        assert_eq!(fetch_count(&commands), 1);
        assert!(editor.is_loading_geometries());

        let commands = editor.handle(Event::TypeToggled {
            name: "stair".to_string(),
            visible: false,
        });
        assert_eq!(
            commands,
            vec![Command::SetTypeToggle {
                name: "stair".to_string(),
                visible: true,
            }]
        );
        assert_eq!(editor.types().is_visible("stair"), Some(true));

        // The widget echoes the revert back; it must not count as a toggle.
        let echo = editor.handle(Event::TypeToggled {
            name: "stair".to_string(),
            visible: true,
        });
        assert!(echo.is_empty());
    }

    #[test]
    fn test_hiding_every_type_clears_without_request() {
        let mut editor = ready_editor(vec![named("room", "r1")]);
        editor.handle(Event::TypeToggled {
            name: "room".to_string(),
            visible: false,
        });
        editor.handle(Event::GeometriesLoaded(Vec::new()));

        let commands = editor.handle(Event::TypeToggled {
            name: "stair".to_string(),
            visible: false,
        });
        assert_eq!(fetch_count(&commands), 0);
        assert!(commands.contains(&Command::ClearGeometries));
        assert!(editor.index().is_empty());
    }

    #[test]
    fn test_level_switch_requires_affordance() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment::default()));

        let commands = editor.handle(Event::LevelSelected("1".to_string()));
        assert_eq!(
            commands,
            vec![Command::SwapLevelToggle {
                show: "0".to_string(),
                hide: "1".to_string(),
            }]
        );
        assert_eq!(editor.levels().current(), Some("0"));
        assert!(editor.handle(Event::LevelSelected("0".to_string())).is_empty());
    }

    #[test]
    fn test_level_switch_navigates_and_reloads() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment {
            level_switch: Some("/editor/levels/LEVEL/rooms/".to_string()),
            ..SidebarFragment::default()
        }));

        let commands = editor.handle(Event::LevelSelected("2".to_string()));
        assert_eq!(editor.levels().current(), Some("2"));
        assert!(commands.contains(&Command::FetchSidebar(SidebarRequest::Get {
            url: "/editor/levels/2/rooms/".to_string()
        })));
        assert!(commands.contains(&Command::FetchGeometries {
            url: "/api/geometries/".to_string(),
            query: vec![
                ("level".to_string(), "2".to_string()),
                ("type".to_string(), "room".to_string()),
                ("type".to_string(), "stair".to_string()),
            ],
        }));
    }

    #[test]
    fn test_level_switch_rejected_while_loading() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment {
            level_switch: Some("/editor/levels/LEVEL/".to_string()),
            ..SidebarFragment::default()
        }));
        editor.handle(Event::TypeToggled {
            name: "room".to_string(),
            visible: false,
        });

        let commands = editor.handle(Event::LevelSelected("1".to_string()));
        assert_eq!(
            commands,
            vec![Command::SwapLevelToggle {
                show: "0".to_string(),
                hide: "1".to_string(),
            }]
        );
    }

    #[test]
    fn test_redirect_substitutes_level() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment {
            level_switch: Some("/editor/levels/LEVEL/".to_string()),
            ..SidebarFragment::default()
        }));
        editor.handle(Event::LevelSelected("2".to_string()));

        let commands = editor.handle(loaded(SidebarFragment {
            redirect: Some("/foo/LEVEL/".to_string()),
            ..SidebarFragment::default()
        }));
        assert!(commands.contains(&Command::FetchSidebar(SidebarRequest::Get {
            url: "/foo/2/".to_string()
        })));
        assert!(commands.contains(&Command::UpdateHistory(HistoryUpdate::Push(
            "/foo/2/".to_string()
        ))));
        assert!(!commands.iter().any(|c| matches!(c, Command::RenderSidebar { .. })));
    }

    #[test]
    fn test_redirect_after_post_pushes_history() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment::default()));
        editor.handle(Event::FormSubmitted {
            form: 0,
            submission: FormSubmission {
                action: "/editor/rooms/r1/".to_string(),
                fields: Vec::new(),
            },
            at_ms: 0.0,
        });

        let commands = editor.handle(loaded(SidebarFragment {
            redirect: Some("/editor/rooms/".to_string()),
            ..SidebarFragment::default()
        }));
        let history: Vec<_> = commands
            .iter()
            .filter(|c| matches!(c, Command::UpdateHistory(_)))
            .collect();
        assert_eq!(
            history,
            vec![&Command::UpdateHistory(HistoryUpdate::Push("/editor/rooms/".to_string()))]
        );
    }

    #[test]
    fn test_redirect_form_is_posted() {
        let mut editor = ready_editor(Vec::new());
        let form = FormSubmission {
            action: "/editor/finalize/".to_string(),
            fields: vec![("data".to_string(), "x".to_string())],
        };
        let commands = editor.handle(loaded(SidebarFragment {
            redirect_form: Some(form),
            ..SidebarFragment::default()
        }));
        assert!(commands.contains(&Command::FetchSidebar(SidebarRequest::Post {
            url: "/editor/finalize/".to_string(),
            fields: vec![("data".to_string(), "x".to_string())],
        })));
    }

    #[test]
    fn test_sidebar_error_shows_status() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(Event::Navigate("/editor/nope/".to_string()));
        let commands = editor.handle(Event::SidebarFailed {
            status: 404,
            status_text: "Not Found".to_string(),
        });

        assert!(commands.contains(&Command::RenderSidebarError {
            status: 404,
            status_text: "Not Found".to_string(),
        }));
        assert!(!editor.sidebar().is_loading());
        assert!(editor.sidebar().has_content());
    }

    #[test]
    fn test_submit_includes_clicked_button() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment::default()));
        editor.handle(Event::SubmitButtonClicked {
            form: 0,
            name: Some("delete".to_string()),
            value: "1".to_string(),
            at_ms: 100.0,
        });
        let commands = editor.handle(Event::FormSubmitted {
            form: 0,
            submission: FormSubmission {
                action: "/editor/rooms/r1/".to_string(),
                fields: vec![("name".to_string(), "r1".to_string())],
            },
            at_ms: 150.0,
        });

        assert!(commands.contains(&Command::FetchSidebar(SidebarRequest::Post {
            url: "/editor/rooms/r1/".to_string(),
            fields: vec![
                ("name".to_string(), "r1".to_string()),
                ("delete".to_string(), "1".to_string()),
            ],
        })));
    }

    #[test]
    fn test_highlight_requires_row_and_layer() {
        let mut editor = ready_editor(vec![named("room", "r1"), named("room", "r2")]);
        editor.handle(loaded(SidebarFragment {
            rows: vec![ItemRow {
                key: FeatureKey::new("room", "r1"),
                editable: true,
            }],
            ..SidebarFragment::default()
        }));

        let commands = editor.handle(Event::RowHovered(FeatureKey::new("room", "r1")));
        assert!(matches!(
            commands.last(),
            Some(Command::Highlight { row, style, .. })
                if row == &FeatureKey::new("room", "r1") && style == &PathStyle::highlight()
        ));

        let r2 = editor.index().feature_layer(&FeatureKey::new("room", "r2")).unwrap();
        let commands = editor.handle(Event::GeometryHovered(r2));
        assert_eq!(commands, vec![Command::ClearHighlight]);
        assert!(editor.highlighted().is_none());
    }

    #[test]
    fn test_click_and_double_click_geometry() {
        let mut editor = ready_editor(vec![named("room", "r1"), named("room", "r2")]);
        editor.handle(loaded(SidebarFragment {
            rows: vec![
                ItemRow {
                    key: FeatureKey::new("room", "r1"),
                    editable: true,
                },
                ItemRow {
                    key: FeatureKey::new("room", "r2"),
                    editable: false,
                },
            ],
            ..SidebarFragment::default()
        }));
        let r1 = editor.index().feature_layer(&FeatureKey::new("room", "r1")).unwrap();
        let r2 = editor.index().feature_layer(&FeatureKey::new("room", "r2")).unwrap();

        assert_eq!(
            editor.handle(Event::GeometryClicked(r1)),
            vec![Command::ScrollRowIntoView(FeatureKey::new("room", "r1"))]
        );
        assert_eq!(
            editor.handle(Event::GeometryDoubleClicked(r1)),
            vec![
                Command::SetDoubleClickZoom(false),
                Command::ActivateEditLink(FeatureKey::new("room", "r1")),
            ]
        );
        assert!(editor.handle(Event::GeometryDoubleClicked(r2)).is_empty());
        assert!(editor.handle(Event::GeometryClicked(LayerId(9999))).is_empty());
    }

    fn edit_form(name: &str, value: String) -> SidebarFragment {
        SidebarFragment {
            geometry_form: Some(GeometryForm {
                mapitem_type: "stair".to_string(),
                name: Some(name.to_string()),
                geomtype: Some("polygon".to_string()),
                value,
            }),
            ..SidebarFragment::default()
        }
    }

    #[test]
    fn test_editing_removes_feature_and_shadow_once() {
        let mut editor = ready_editor(vec![shadow("stair", "s1"), named("stair", "s1")]);
        let key = FeatureKey::new("stair", "s1");
        let feature_id = editor.index().feature_layer(&key).unwrap();
        let shadow_id = editor.index().shadow_layer(&key).unwrap();

        let value = square(0.0).to_json().unwrap();
        let commands = editor.handle(loaded(edit_form("s1", value)));

        let removed: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                Command::RemoveGeometry(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![feature_id, shadow_id]);
        assert!(commands.iter().any(|c| matches!(c, Command::StartEditing { .. })));
        assert_eq!(editor.session().held_key(), Some(&key));

        // Leaving the sidebar ends the session and schedules one refetch.
        let commands = editor.handle(Event::Navigate("/editor/".to_string()));
        assert!(commands.contains(&Command::StopEditing));
        assert!(editor.session().is_idle());
        assert!(editor.refetch_pending());
        assert_eq!(fetch_count(&commands), 0);

        let commands = editor.handle(loaded(SidebarFragment::default()));
        assert_eq!(fetch_count(&commands), 1);
        assert!(!editor.refetch_pending());

        editor.handle(Event::GeometriesLoaded(Vec::new()));
        let commands = editor.handle(Event::Navigate("/editor/rooms/".to_string()));
        assert_eq!(fetch_count(&commands), 0);
        let commands = editor.handle(loaded(SidebarFragment::default()));
        assert_eq!(fetch_count(&commands), 0);
    }

    #[test]
    fn test_reload_during_editing_keeps_feature_off_display() {
        let mut editor = ready_editor(Vec::new());
        let value = square(0.0).to_json().unwrap();
        editor.handle(loaded(edit_form("s1", value)));

        let commands = editor.handle(Event::GeometriesLoaded(vec![
            shadow("stair", "s1"),
            named("stair", "s1"),
            named("room", "r1"),
        ]));
        let Some(Command::RenderGeometries(rendered)) = commands.last() else {
            panic!("expected rendered geometries, got {commands:?}");
        };
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].feature.key(), Some(FeatureKey::new("room", "r1")));

        editor.handle(Event::Navigate("/editor/".to_string()));
        assert!(editor.refetch_pending());
    }

    #[test]
    fn test_out_of_order_edit_forms_end_earlier_session() {
        let mut editor = ready_editor(vec![named("stair", "s1"), named("stair", "s2")]);
        let first = editor.index().feature_layer(&FeatureKey::new("stair", "s1")).unwrap();
        editor.handle(Event::Navigate("/editor/stairs/s1/edit/".to_string()));
        editor.handle(Event::Navigate("/editor/stairs/s2/edit/".to_string()));

        let commands = editor.handle(loaded(edit_form("s1", square(0.0).to_json().unwrap())));
        assert!(commands.contains(&Command::RemoveGeometry(first)));

        let commands = editor.handle(loaded(edit_form("s2", square(1.0).to_json().unwrap())));
        let stop = commands.iter().position(|c| *c == Command::StopEditing);
        let start = commands
            .iter()
            .position(|c| matches!(c, Command::StartEditing { .. }));
        assert!(matches!((stop, start), (Some(stop), Some(start)) if stop < start));
        assert_eq!(fetch_count(&commands), 1);
        assert_eq!(editor.session().held_key(), Some(&FeatureKey::new("stair", "s2")));

        // The refetch renders s1 again and keeps s2 off the display.
        let commands = editor.handle(Event::GeometriesLoaded(vec![
            named("stair", "s1"),
            named("stair", "s2"),
        ]));
        let Some(Command::RenderGeometries(rendered)) = commands.last() else {
            panic!("expected rendered geometries, got {commands:?}");
        };
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].feature.key(), Some(FeatureKey::new("stair", "s1")));
    }

    #[test]
    fn test_out_of_order_create_forms_keep_one_drawing() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(create_form("room", "polygon")));

        let commands = editor.handle(loaded(create_form("lineobstacle", "polyline")));
        assert_eq!(
            commands
                .iter()
                .filter(|c| matches!(c, Command::StopDrawing))
                .count(),
            1
        );
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::StartDrawing {
                kind: DrawKind::Polyline,
                ..
            }
        )));
        assert_eq!(
            editor.session().creating(),
            Some(("lineobstacle", DrawKind::Polyline))
        );
    }

    #[test]
    fn test_invalid_geometry_stays_idle() {
        let mut editor = ready_editor(vec![named("stair", "s1")]);
        let commands = editor.handle(loaded(edit_form("s1", "{not json".to_string())));

        assert!(editor.session().is_idle());
        assert!(!commands.iter().any(|c| matches!(c, Command::RemoveGeometry(_))));
    }

    #[test]
    fn test_vertex_edit_rewrites_field() {
        let mut editor = ready_editor(vec![named("stair", "s1")]);
        editor.handle(loaded(edit_form("s1", square(0.0).to_json().unwrap())));

        let moved = square(2.0);
        let commands = editor.handle(Event::GeometryEdited(moved.clone()));
        assert_eq!(commands, vec![Command::SetGeometryField(moved.to_json().unwrap())]);
        assert!(editor.session().editing().unwrap().modified);
    }

    #[test]
    fn test_modifier_click_adds_hole_to_polygon() {
        let mut editor = ready_editor(vec![named("stair", "s1")]);
        editor.handle(loaded(edit_form("s1", square(0.0).to_json().unwrap())));
        let latlng = LatLng { lat: 0.5, lng: 0.5 };

        assert!(editor
            .handle(Event::EditingLayerClicked {
                latlng,
                modifier: false
            })
            .is_empty());
        assert_eq!(
            editor.handle(Event::EditingLayerClicked {
                latlng,
                modifier: true
            }),
            vec![Command::AddHole(latlng)]
        );
    }

    #[test]
    fn test_vertex_modifier_click_continues_line() {
        let mut editor = ready_editor(Vec::new());
        assert_eq!(
            editor.handle(Event::VertexClicked { modifier: true }),
            vec![Command::SetDoubleClickZoom(false)]
        );

        editor.handle(loaded(create_form("lineobstacle", "polyline")));
        assert_eq!(
            editor.handle(Event::VertexClicked { modifier: true }),
            vec![Command::SetDoubleClickZoom(false), Command::ContinueLine]
        );
    }

    fn create_form(mapitem_type: &str, geomtype: &str) -> SidebarFragment {
        SidebarFragment {
            geometry_form: Some(GeometryForm {
                mapitem_type: mapitem_type.to_string(),
                name: None,
                geomtype: Some(geomtype.to_string()),
                value: String::new(),
            }),
            ..SidebarFragment::default()
        }
    }

    #[test]
    fn test_create_polygon_then_commit() {
        let mut editor = ready_editor(Vec::new());
        let commands = editor.handle(loaded(create_form("room", "polygon")));

        assert!(commands.contains(&Command::SetCreationLock(true)));
        assert!(commands.contains(&Command::SelectLevelFields("0".to_string())));
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::StartDrawing { kind: DrawKind::Polygon, style } if !style.stroke
        )));
        assert!(editor.session().is_creating());

        let commands = editor.handle(Event::DrawingCommitted(square(1.0)));
        let field = commands
            .iter()
            .find_map(|c| match c {
                Command::SetGeometryField(json) => Some(json.clone()),
                _ => None,
            })
            .expect("geometry field written");
        let value: serde_json::Value = serde_json::from_str(&field).unwrap();
        assert_eq!(value["type"], "Polygon");
        assert!(commands.contains(&Command::AdoptDrawing));
        assert!(commands.contains(&Command::SetCreationLock(false)));
        assert!(editor.session().editing().is_some());
    }

    #[test]
    fn test_create_polyline_commits_line_string() {
        let mut editor = ready_editor(Vec::new());
        let commands = editor.handle(loaded(create_form("lineobstacle", "polyline")));
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::StartDrawing { kind: DrawKind::Polyline, style }
                if style.stroke && style.weight == Some(5.0)
        )));

        let line = Geometry::LineString {
            coordinates: vec![vec![0.0, 0.0], vec![4.0, 4.0]],
        };
        let commands = editor.handle(Event::DrawingCommitted(line));
        let Some(Command::SetGeometryField(field)) = commands
            .iter()
            .find(|c| matches!(c, Command::SetGeometryField(_)))
        else {
            panic!("geometry field not written");
        };
        let value: serde_json::Value = serde_json::from_str(field).unwrap();
        assert_eq!(value["type"], "LineString");
    }

    #[test]
    fn test_wrong_shape_restarts_drawing() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(create_form("lineobstacle", "polyline")));

        let commands = editor.handle(Event::DrawingCommitted(square(0.0)));
        assert_eq!(commands[0], Command::DiscardDrawing);
        assert!(matches!(
            &commands[1],
            Command::StartDrawing { kind: DrawKind::Polyline, style } if style.stroke
        ));
        assert_eq!(commands.len(), 2);
        assert!(editor.session().is_creating());
    }

    #[test]
    fn test_submit_ignored_while_drawing() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(create_form("room", "polygon")));
        let commands = editor.handle(Event::FormSubmitted {
            form: 0,
            submission: FormSubmission::default(),
            at_ms: 0.0,
        });
        assert!(commands.is_empty());
    }

    #[test]
    fn test_unload_while_drawing_stops_and_discards() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(create_form("room", "polygon")));

        let commands = editor.handle(Event::Navigate("/editor/".to_string()));
        assert!(commands.contains(&Command::StopDrawing));
        assert!(editor.session().is_idle());
        assert!(!editor.refetch_pending());

        assert_eq!(editor.handle(Event::DrawingCancelled), vec![Command::DiscardDrawing]);
        assert!(editor.handle(Event::DrawingCommitted(square(0.0))).is_empty());
    }

    #[test]
    fn test_sections_control_flow() {
        let mut editor = ready_editor(Vec::new());
        let sections = vec![
            Section {
                title: "Level 0".to_string(),
                href: "/editor/levels/0/".to_string(),
                current: true,
            },
            Section {
                title: "Level 1".to_string(),
                href: "/editor/levels/1/".to_string(),
                current: false,
            },
        ];
        editor.handle(loaded(SidebarFragment {
            sections,
            ..SidebarFragment::default()
        }));

        let commands = editor.handle(Event::SectionsPointer { inside: true });
        assert!(matches!(&commands[..], [Command::RenderSections(view)] if view.expanded));

        let commands = editor.handle(Event::SectionClicked(1));
        assert!(commands.contains(&Command::FetchSidebar(SidebarRequest::Get {
            url: "/editor/levels/1/".to_string()
        })));

        let commands = editor.handle(Event::MapClicked);
        assert_eq!(commands, vec![Command::SetDoubleClickZoom(true)]);
    }

    #[test]
    fn test_styles_override_palette() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(Event::GeometryStylesLoaded(
            [("room".to_string(), "#abcdef".to_string())].into_iter().collect(),
        ));
        assert_eq!(editor.palette().fill("room"), "#abcdef");
    }

    #[test]
    fn test_warn_before_unload_follows_fragment() {
        let mut editor = ready_editor(Vec::new());
        editor.handle(loaded(SidebarFragment {
            warn_before_unload: true,
            ..SidebarFragment::default()
        }));
        assert!(editor.warn_before_unload());

        editor.handle(Event::Navigate("/editor/".to_string()));
        assert!(!editor.warn_before_unload());
    }

    #[test]
    fn test_sources_become_overlays() {
        let mut editor = Editor::new(EditorConfig::default());
        let commands = editor.handle(Event::SourcesLoaded(vec![Source {
            name: "ground".to_string(),
            bounds: [[0.0, 0.0], [100.0, 200.0]],
        }]));
        assert_eq!(
            commands,
            vec![Command::AddSourceOverlays(vec![SourceOverlay {
                name: "ground".to_string(),
                image_url: "/api/sources/ground/image/".to_string(),
                bounds: [[0.0, 0.0], [100.0, 200.0]],
            }])]
        );
    }
}
