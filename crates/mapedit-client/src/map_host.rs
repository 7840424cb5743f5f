//! Leaflet side of the editor: layers, toggles, editing tools.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mapedit_core::{
    Command, DrawKind, Event, Feature, Geometry, LatLng, LayerId, MapConfig, PathStyle,
    RenderedFeature, SourceOverlay, TypeToggle,
};
use serde::Serialize;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

use crate::leaflet::{self, LayerGroup, LayersControl, LeafletEvent, Map, VertexMarker, to_js};
use crate::runtime::Dispatcher;
use crate::section_control::SectionControlDom;

/// Id of the element the map is mounted on.
pub const MAP_ELEMENT_ID: &str = "map";

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("map widget error: {0}")]
    Widget(String),
    #[error("failed to convert data for the map widget: {0}")]
    Convert(#[from] serde_wasm_bindgen::Error),
}

impl From<JsValue> for HostError {
    fn from(value: JsValue) -> Self {
        Self::Widget(format!("{value:?}"))
    }
}

type EventHandler = Closure<dyn FnMut(LeafletEvent)>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOptions {
    zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
    editable: bool,
    close_popup_on_click: bool,
}

#[derive(Serialize)]
struct GeoJsonOptions<'a> {
    style: &'a PathStyle,
}

/// A layer that stays alive together with its event handler.
struct Bound<L> {
    layer: L,
    _handler: EventHandler,
}

pub struct LeafletHost {
    map: Map,
    dispatcher: Dispatcher,
    geometries: LayerGroup,
    highlight: LayerGroup,
    editing: LayerGroup,
    toggles: LayersControl,
    sources: LayersControl,
    levels: HashMap<String, LayerGroup>,
    /// Geometry type overlays in registration order. Control events are
    /// matched against these by layer, never by label.
    types: Rc<RefCell<Vec<(String, LayerGroup)>>>,
    rendered: HashMap<LayerId, Bound<LayerGroup>>,
    edited: Option<Bound<leaflet::Layer>>,
    /// Last layer finished or abandoned by the drawing tools.
    drawn: Rc<RefCell<Option<leaflet::Layer>>>,
    /// Last clicked vertex.
    vertex: Rc<RefCell<Option<VertexMarker>>>,
    sections: SectionControlDom,
    map_handlers: Vec<EventHandler>,
}

impl LeafletHost {
    pub fn new(config: &MapConfig, dispatcher: &Dispatcher) -> Result<Self, HostError> {
        let options = to_js(&MapOptions {
            zoom: config.zoom,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            editable: true,
            close_popup_on_click: false,
        })?;
        js_sys::Reflect::set(&options, &JsValue::from_str("crs"), &leaflet::simple_crs())?;
        let map = leaflet::new_map(MAP_ELEMENT_ID, &options)?;

        let bounds = to_js(&config.bounds)?;
        map.set_max_bounds(&bounds);
        map.fit_bounds(&bounds, &to_js(&serde_json::json!({ "padding": config.padding }))?);
        leaflet::scale_control(&to_js(&serde_json::json!({ "imperial": false }))?).add_to(&map);

        let geometries = leaflet::layer_group();
        geometries.add_to(&map);
        let highlight = leaflet::layer_group();
        highlight.add_to(&map);
        let editing = leaflet::layer_group();
        editing.add_to(&map);

        let toggles = leaflet::layers_control(&JsValue::UNDEFINED, &JsValue::UNDEFINED, &JsValue::UNDEFINED);
        toggles.add_to(&map);
        let sources = leaflet::layers_control(&JsValue::UNDEFINED, &JsValue::UNDEFINED, &JsValue::UNDEFINED);
        sources.add_to(&map);

        let sections = SectionControlDom::new(&map, dispatcher)?;

        let mut host = Self {
            map,
            dispatcher: dispatcher.clone(),
            geometries,
            highlight,
            editing,
            toggles,
            sources,
            levels: HashMap::new(),
            types: Rc::default(),
            rendered: HashMap::new(),
            edited: None,
            drawn: Rc::default(),
            vertex: Rc::default(),
            sections,
            map_handlers: Vec::new(),
        };
        host.bind_map_events();
        Ok(host)
    }

    fn bind_map_events(&mut self) {
        let dispatcher = self.dispatcher.clone();
        self.on_map("click", move |_| dispatcher.dispatch(Event::MapClicked));

        let dispatcher = self.dispatcher.clone();
        self.on_map("baselayerchange", move |event| {
            if let Some(name) = event.name() {
                dispatcher.dispatch(Event::LevelSelected(name));
            }
        });

        let dispatcher = self.dispatcher.clone();
        let types = self.types.clone();
        self.on_map("overlayadd overlayremove", move |event| {
            let Some(layer) = event.layer() else {
                return;
            };
            // Source overlays share the event but have no type behind them.
            let name = overlay_type(types.borrow().as_slice(), &layer);
            if let Some(name) = name {
                let visible = event.kind() == "overlayadd";
                dispatcher.dispatch(Event::TypeToggled { name, visible });
            }
        });

        let dispatcher = self.dispatcher.clone();
        let drawn = self.drawn.clone();
        self.on_map("editable:drawing:commit", move |event| {
            let Some(layer) = event.layer() else {
                return;
            };
            let geometry = geometry_of(&layer);
            *drawn.borrow_mut() = Some(layer);
            if let Some(geometry) = geometry {
                dispatcher.dispatch(Event::DrawingCommitted(geometry));
            }
        });

        let dispatcher = self.dispatcher.clone();
        let drawn = self.drawn.clone();
        self.on_map("editable:drawing:cancel", move |event| {
            if let Some(layer) = event.layer() {
                *drawn.borrow_mut() = Some(layer);
            }
            dispatcher.dispatch(Event::DrawingCancelled);
        });

        let dispatcher = self.dispatcher.clone();
        self.on_map("editable:editing", move |event| {
            if let Some(geometry) = event.layer().as_ref().and_then(geometry_of) {
                dispatcher.dispatch(Event::GeometryEdited(geometry));
            }
        });

        let dispatcher = self.dispatcher.clone();
        let vertex = self.vertex.clone();
        self.on_map("editable:vertex:click", move |event| {
            let modifier = event.modifier();
            *vertex.borrow_mut() = event.vertex();
            dispatcher.dispatch(Event::VertexClicked { modifier });
        });
    }

    fn on_map(&mut self, types: &str, callback: impl FnMut(LeafletEvent) + 'static) {
        let handler: EventHandler = Closure::new(callback);
        self.map.on(types, handler.as_ref().unchecked_ref());
        self.map_handlers.push(handler);
    }

    pub fn apply(&mut self, command: Command) -> Result<(), HostError> {
        match command {
            Command::AddLevelToggles { levels, current } => self.add_level_toggles(levels, current.as_deref()),
            Command::SwapLevelToggle { show, hide } => {
                if let Some(group) = self.levels.get(&hide) {
                    self.map.remove_layer(group);
                }
                if let Some(group) = self.levels.get(&show) {
                    self.map.add_layer(group);
                }
            }
            Command::AddSourceOverlays(overlays) => self.add_source_overlays(&overlays)?,
            Command::AddTypeToggles(toggles) => self.add_type_toggles(toggles),
            Command::SetTypeToggle { name, visible } => {
                let group = self
                    .types
                    .borrow()
                    .iter()
                    .find(|(kind, _)| *kind == name)
                    .map(|(_, group)| group.clone());
                match group {
                    Some(group) if visible => self.map.add_layer(&group),
                    Some(group) => self.map.remove_layer(&group),
                    None => warn!("no toggle for geometry type {name}"),
                }
            }

            Command::ClearGeometries => {
                self.geometries.clear_layers();
                self.rendered.clear();
            }
            Command::RenderGeometries(features) => {
                for feature in features {
                    self.render_geometry(feature)?;
                }
            }
            Command::RemoveGeometry(id) => {
                if let Some(rendered) = self.rendered.remove(&id) {
                    self.geometries.remove_layer(&rendered.layer);
                }
            }

            Command::ClearHighlight => self.highlight.clear_layers(),
            Command::Highlight { feature, style, .. } => {
                geo_json(&feature, &style)?.add_to(&self.highlight);
            }
            Command::SetDoubleClickZoom(enabled) => {
                let handler = self.map.double_click_zoom();
                if enabled {
                    handler.enable();
                } else {
                    handler.disable();
                }
            }

            Command::StartEditing { feature, style } => self.start_editing(&feature, &style)?,
            Command::StopEditing => self.stop_editing(),
            Command::StartDrawing { kind, style } => {
                let tools = self.map.edit_tools();
                let options = to_js(&style)?;
                match kind {
                    DrawKind::Polygon => tools.start_polygon(&JsValue::NULL, &options),
                    DrawKind::Polyline => tools.start_polyline(&JsValue::NULL, &options),
                };
            }
            Command::StopDrawing => self.map.edit_tools().stop_drawing(),
            Command::AdoptDrawing => {
                let drawn = self.drawn.borrow_mut().take();
                match drawn {
                    Some(layer) => {
                        layer.add_to(&self.editing);
                        self.edited = Some(self.bind_edited(layer));
                    }
                    None => warn!("no drawn layer to keep"),
                }
            }
            Command::DiscardDrawing => {
                let drawn = self.drawn.borrow_mut().take();
                if let Some(layer) = drawn {
                    layer.remove();
                }
            }
            Command::AddHole(latlng) => {
                let editor = self.edited.as_ref().and_then(|edited| edited.layer.editor());
                match editor {
                    Some(editor) => editor.new_hole(&leaflet::lat_lng(latlng.lat, latlng.lng)),
                    None => warn!("no polygon being edited for a new hole"),
                }
            }
            Command::ContinueLine => {
                let vertex = self.vertex.borrow_mut().take();
                if let Some(vertex) = vertex {
                    vertex.continue_line();
                }
            }

            Command::RenderSections(view) => self.sections.render(&view)?,

            other => debug!("not a map command: {other:?}"),
        }
        Ok(())
    }

    fn add_level_toggles(&mut self, levels: Vec<String>, current: Option<&str>) {
        for name in levels {
            let group = leaflet::layer_group();
            self.toggles.add_base_layer(&group, &name);
            if current == Some(name.as_str()) {
                self.map.add_layer(&group);
            }
            self.levels.insert(name, group);
        }
    }

    fn add_source_overlays(&self, overlays: &[SourceOverlay]) -> Result<(), HostError> {
        for overlay in overlays {
            let layer = leaflet::image_overlay(&overlay.image_url, &to_js(&overlay.bounds)?);
            self.sources.add_overlay(&layer, &overlay.name);
        }
        Ok(())
    }

    fn add_type_toggles(&mut self, toggles: Vec<TypeToggle>) {
        for toggle in toggles {
            let group = leaflet::layer_group();
            self.types.borrow_mut().push((toggle.name, group.clone()));
            self.toggles.add_overlay(&group, &toggle.label);
            if toggle.visible {
                self.map.add_layer(&group);
            }
        }
    }

    fn render_geometry(&mut self, rendered: RenderedFeature) -> Result<(), HostError> {
        let RenderedFeature { id, feature, style } = rendered;
        let layer = geo_json(&feature, &style)?;
        let dispatcher = self.dispatcher.clone();
        let handler: EventHandler = Closure::new(move |event: LeafletEvent| {
            let event = match event.kind().as_str() {
                "mouseover" => Event::GeometryHovered(id),
                "mouseout" => Event::GeometryLeft,
                "click" => Event::GeometryClicked(id),
                "dblclick" => Event::GeometryDoubleClicked(id),
                _ => return,
            };
            dispatcher.dispatch(event);
        });
        layer.on("mouseover mouseout click dblclick", handler.as_ref().unchecked_ref());
        self.geometries.add_layer(&layer);
        self.rendered.insert(
            id,
            Bound {
                layer,
                _handler: handler,
            },
        );
        Ok(())
    }

    fn start_editing(&mut self, feature: &Feature, style: &PathStyle) -> Result<(), HostError> {
        self.stop_editing();
        let group = geo_json(feature, style)?;
        let first = group.get_layers().get(0);
        if first.is_undefined() {
            return Err(HostError::Widget("geometry produced no editable layer".to_string()));
        }
        let layer: leaflet::Layer = first.unchecked_into();
        layer.add_to(&self.editing);
        layer.enable_edit();
        self.edited = Some(self.bind_edited(layer));
        Ok(())
    }

    fn stop_editing(&mut self) {
        if let Some(edited) = self.edited.take() {
            edited.layer.disable_edit();
        }
        self.editing.clear_layers();
    }

    fn bind_edited(&self, layer: leaflet::Layer) -> Bound<leaflet::Layer> {
        let dispatcher = self.dispatcher.clone();
        let handler: EventHandler = Closure::new(move |event: LeafletEvent| {
            let Some(latlng) = event.latlng() else {
                return;
            };
            dispatcher.dispatch(Event::EditingLayerClicked {
                latlng: LatLng {
                    lat: latlng.lat(),
                    lng: latlng.lng(),
                },
                modifier: event.modifier(),
            });
        });
        layer.on("click", handler.as_ref().unchecked_ref());
        Bound {
            layer,
            _handler: handler,
        }
    }
}

fn geo_json(feature: &Feature, style: &PathStyle) -> Result<LayerGroup, HostError> {
    let data = to_js(feature)?;
    let options = to_js(&GeoJsonOptions { style })?;
    Ok(leaflet::geo_json(&data, &options))
}

/// Name of the geometry type whose overlay is `layer`.
fn overlay_type<L: AsRef<JsValue>>(types: &[(String, L)], layer: &JsValue) -> Option<String> {
    types
        .iter()
        .find(|(_, group)| group.as_ref() == layer)
        .map(|(name, _)| name.clone())
}

/// Reads the GeoJSON geometry of a drawn or edited layer.
fn geometry_of(layer: &leaflet::Layer) -> Option<Geometry> {
    let json = layer.to_geojson();
    let geometry = js_sys::Reflect::get(&json, &JsValue::from_str("geometry")).ok()?;
    serde_wasm_bindgen::from_value(geometry)
        .map_err(|err| warn!("unreadable geometry from map: {err}"))
        .ok()
}
