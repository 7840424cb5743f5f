//! Bindings for Leaflet and the Leaflet.Editable plugin.
//!
//! Only the parts of the API the editor drives are bound. Both libraries are
//! expected as page globals (`L`).

use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = "
export function mapedit_simple_crs() {
    return L.CRS.Simple;
}

export function mapedit_add_control(map, element, position) {
    const Control = L.Control.extend({
        onAdd: function () {
            return element;
        },
    });
    return new Control({ position: position }).addTo(map);
}
")]
extern "C" {
    #[wasm_bindgen(js_name = mapedit_simple_crs)]
    pub fn simple_crs() -> JsValue;

    /// Mounts `element` as a map control at `position`.
    #[wasm_bindgen(js_name = mapedit_add_control)]
    pub fn add_control(map: &Map, element: &web_sys::HtmlElement, position: &str);
}

#[wasm_bindgen]
extern "C" {
    #[derive(Clone)]
    pub type Evented;

    #[wasm_bindgen(method)]
    pub fn on(this: &Evented, types: &str, handler: &js_sys::Function);

    #[wasm_bindgen(extends = Evented)]
    pub type Map;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    pub fn new_map(id: &str, options: &JsValue) -> Result<Map, JsValue>;

    #[wasm_bindgen(method, js_name = setMaxBounds)]
    pub fn set_max_bounds(this: &Map, bounds: &JsValue);

    #[wasm_bindgen(method, js_name = fitBounds)]
    pub fn fit_bounds(this: &Map, bounds: &JsValue, options: &JsValue);

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &Map, layer: &Layer);

    #[wasm_bindgen(method, js_name = removeLayer)]
    pub fn remove_layer(this: &Map, layer: &Layer);

    #[wasm_bindgen(method, getter, js_name = doubleClickZoom)]
    pub fn double_click_zoom(this: &Map) -> Handler;

    #[wasm_bindgen(method, getter, js_name = editTools)]
    pub fn edit_tools(this: &Map) -> EditTools;

    pub type Handler;

    #[wasm_bindgen(method)]
    pub fn enable(this: &Handler);

    #[wasm_bindgen(method)]
    pub fn disable(this: &Handler);

    /// `L.Editable` instance of an editable map.
    pub type EditTools;

    #[wasm_bindgen(method, js_name = startPolygon)]
    pub fn start_polygon(this: &EditTools, latlng: &JsValue, options: &JsValue) -> Layer;

    #[wasm_bindgen(method, js_name = startPolyline)]
    pub fn start_polyline(this: &EditTools, latlng: &JsValue, options: &JsValue) -> Layer;

    #[wasm_bindgen(method, js_name = stopDrawing)]
    pub fn stop_drawing(this: &EditTools);

    #[wasm_bindgen(extends = Evented)]
    #[derive(Clone)]
    pub type Layer;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Layer, target: &Evented) -> Layer;

    #[wasm_bindgen(method)]
    pub fn remove(this: &Layer) -> Layer;

    #[wasm_bindgen(method, js_name = enableEdit)]
    pub fn enable_edit(this: &Layer);

    #[wasm_bindgen(method, js_name = disableEdit)]
    pub fn disable_edit(this: &Layer);

    #[wasm_bindgen(method, js_name = toGeoJSON)]
    pub fn to_geojson(this: &Layer) -> JsValue;

    #[wasm_bindgen(method, getter)]
    pub fn editor(this: &Layer) -> Option<PathEditor>;

    pub type PathEditor;

    #[wasm_bindgen(method, js_name = newHole)]
    pub fn new_hole(this: &PathEditor, latlng: &LatLng);

    #[wasm_bindgen(extends = Layer, extends = Evented)]
    #[derive(Clone)]
    pub type LayerGroup;

    #[wasm_bindgen(js_namespace = L, js_name = layerGroup)]
    pub fn layer_group() -> LayerGroup;

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &LayerGroup, layer: &Layer);

    #[wasm_bindgen(method, js_name = removeLayer)]
    pub fn remove_layer(this: &LayerGroup, layer: &Layer);

    #[wasm_bindgen(method, js_name = clearLayers)]
    pub fn clear_layers(this: &LayerGroup);

    #[wasm_bindgen(method, js_name = getLayers)]
    pub fn get_layers(this: &LayerGroup) -> js_sys::Array;

    /// `L.geoJSON`, a layer group with one child per feature.
    #[wasm_bindgen(js_namespace = L, js_name = geoJSON)]
    pub fn geo_json(data: &JsValue, options: &JsValue) -> LayerGroup;

    #[wasm_bindgen(js_namespace = L, js_name = imageOverlay)]
    pub fn image_overlay(url: &str, bounds: &JsValue) -> Layer;

    pub type LatLng;

    #[wasm_bindgen(js_namespace = L, js_name = latLng)]
    pub fn lat_lng(lat: f64, lng: f64) -> LatLng;

    #[wasm_bindgen(method, getter)]
    pub fn lat(this: &LatLng) -> f64;

    #[wasm_bindgen(method, getter)]
    pub fn lng(this: &LatLng) -> f64;

    pub type Control;

    #[wasm_bindgen(method, js_name = addTo)]
    pub fn add_to(this: &Control, map: &Map) -> Control;

    #[wasm_bindgen(extends = Control)]
    pub type LayersControl;

    #[wasm_bindgen(js_namespace = ["L", "control"], js_name = layers)]
    pub fn layers_control(base_layers: &JsValue, overlays: &JsValue, options: &JsValue) -> LayersControl;

    #[wasm_bindgen(method, js_name = addBaseLayer)]
    pub fn add_base_layer(this: &LayersControl, layer: &Layer, name: &str);

    #[wasm_bindgen(method, js_name = addOverlay)]
    pub fn add_overlay(this: &LayersControl, layer: &Layer, name: &str);

    #[wasm_bindgen(js_namespace = ["L", "control"], js_name = scale)]
    pub fn scale_control(options: &JsValue) -> Control;

    #[wasm_bindgen(js_namespace = ["L", "DomEvent"], js_name = disableClickPropagation)]
    pub fn disable_click_propagation(element: &web_sys::HtmlElement);

    /// Payload of map, layer and editing events.
    pub type LeafletEvent;

    #[wasm_bindgen(method, getter, js_name = "type")]
    pub fn kind(this: &LeafletEvent) -> String;

    /// Control label of a `baselayerchange` / `overlayadd` / `overlayremove`.
    #[wasm_bindgen(method, getter)]
    pub fn name(this: &LeafletEvent) -> Option<String>;

    #[wasm_bindgen(method, getter)]
    pub fn layer(this: &LeafletEvent) -> Option<Layer>;

    #[wasm_bindgen(method, getter)]
    pub fn latlng(this: &LeafletEvent) -> Option<LatLng>;

    #[wasm_bindgen(method, getter)]
    pub fn vertex(this: &LeafletEvent) -> Option<VertexMarker>;

    #[wasm_bindgen(method, getter, js_name = originalEvent)]
    pub fn original_event(this: &LeafletEvent) -> Option<web_sys::MouseEvent>;

    pub type VertexMarker;

    /// Resumes drawing from this vertex.
    #[wasm_bindgen(method, js_name = "continue")]
    pub fn continue_line(this: &VertexMarker);
}

/// Converts Rust data into a plain JS object for Leaflet options.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

impl LeafletEvent {
    /// Whether Ctrl (or Cmd on macOS) was held.
    pub fn modifier(&self) -> bool {
        self.original_event()
            .is_some_and(|event| event.ctrl_key() || event.meta_key())
    }
}
