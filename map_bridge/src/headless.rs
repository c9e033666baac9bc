//! In-memory rendering engine.
//!
//! `HeadlessEngine` is the conforming [`MapEngine`] implementation used by
//! the CLI and the test suite. It keeps ordered style layers, per-source
//! GeoJSON data and a web-mercator viewport, and emulates rendered-feature
//! queries by projecting feature coordinates through that viewport.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use geojson::{FeatureCollection, Geometry, JsonObject, JsonValue, Value};

use crate::error::BridgeError;
use crate::engine::{
    EventHandler, GeoBounds, LayerInfo, LayerSpec, ListenerId, LngLat, MapEngine, MapEvent,
    MarkerId, MarkerOptions, QueryGeometry, RenderedFeature, ScreenPoint,
};

const TILE_SIZE: f64 = 512.0;
const MIN_ZOOM: f64 = 0.0;
const MAX_ZOOM: f64 = 22.0;

/// Hit tolerance in pixels for point queries.
const QUERY_TOLERANCE_PX: f64 = 5.0;

/// Camera state: center coordinate, zoom level and viewport pixel size.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub center: LngLat,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LngLat::new(0.0, 0.0),
            zoom: 0.0,
            width: 512.0,
            height: 512.0,
        }
    }
}

#[derive(Debug, Clone)]
struct SourceRecord {
    data: FeatureCollection,
    promote_id_property: String,
}

#[derive(Clone)]
struct LayerRecord {
    info: LayerInfo,
    #[allow(dead_code)]
    spec: LayerSpec,
}

#[derive(Debug, Clone)]
struct MarkerRecord {
    position: LngLat,
    element: String,
}

struct ListenerRecord {
    id: ListenerId,
    event: String,
    target_layer: Option<String>,
    once: bool,
    handler: EventHandler,
}

/// In-memory [`MapEngine`] implementation.
pub struct HeadlessEngine {
    viewport: Mutex<Viewport>,
    sources: Mutex<BTreeMap<String, SourceRecord>>,
    layers: Mutex<Vec<LayerRecord>>,
    markers: Mutex<HashMap<MarkerId, MarkerRecord>>,
    listeners: Mutex<Vec<ListenerRecord>>,
    interactions: Mutex<HashMap<String, bool>>,
    controls: Mutex<Vec<String>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    assets: Mutex<HashMap<String, Vec<u8>>>,
    cursor: Mutex<String>,
    loaded: AtomicBool,
    next_id: AtomicU64,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        let interactions = [
            "drag_pan",
            "scroll_zoom",
            "box_zoom",
            "drag_rotate",
            "keyboard",
            "double_click_zoom",
            "touch_zoom_rotate",
        ]
        .iter()
        .map(|name| (name.to_string(), true))
        .collect();

        Self {
            viewport: Mutex::new(Viewport::default()),
            sources: Mutex::new(BTreeMap::new()),
            layers: Mutex::new(Vec::new()),
            markers: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            interactions: Mutex::new(interactions),
            controls: Mutex::new(Vec::new()),
            images: Mutex::new(HashMap::new()),
            assets: Mutex::new(HashMap::new()),
            cursor: Mutex::new(String::new()),
            loaded: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replaces the camera state.
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.lock().unwrap() = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.lock().unwrap()
    }

    /// Makes image bytes loadable under `location`.
    pub fn register_asset(&self, location: &str, bytes: Vec<u8>) {
        self.assets.lock().unwrap().insert(location.to_string(), bytes);
    }

    /// Whether an image was registered under `image_id`.
    pub fn has_image(&self, image_id: &str) -> bool {
        self.images.lock().unwrap().contains_key(image_id)
    }

    /// Mounted control identifiers, in mount order.
    pub fn controls(&self) -> Vec<String> {
        self.controls.lock().unwrap().clone()
    }

    pub fn cursor(&self) -> String {
        self.cursor.lock().unwrap().clone()
    }

    /// Whether a named interaction handler is currently enabled.
    pub fn interaction_enabled(&self, name: &str) -> Option<bool> {
        self.interactions.lock().unwrap().get(name).copied()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn hit(&self, geometry: &Geometry, query: Option<&QueryGeometry>) -> bool {
        let Some(query) = query else {
            return true;
        };
        let mut hit = false;
        for_each_position(&geometry.value, &mut |lng, lat| {
            if hit {
                return;
            }
            let p = self.project(LngLat::new(lng, lat));
            hit = match query {
                QueryGeometry::Point(q) => {
                    (p.x - q.x).abs() <= QUERY_TOLERANCE_PX
                        && (p.y - q.y).abs() <= QUERY_TOLERANCE_PX
                }
                QueryGeometry::Rect(r) => {
                    p.x >= r.sw.x.min(r.ne.x)
                        && p.x <= r.sw.x.max(r.ne.x)
                        && p.y >= r.sw.y.min(r.ne.y)
                        && p.y <= r.sw.y.max(r.ne.y)
                }
            };
        });
        hit
    }
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MapEngine for HeadlessEngine {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn container(&self) -> String {
        "headless-map".to_string()
    }

    fn add_control(&self, control_id: &str) {
        self.controls.lock().unwrap().push(control_id.to_string());
    }

    fn remove_control(&self, control_id: &str) {
        self.controls.lock().unwrap().retain(|c| c != control_id);
    }

    fn load_image(&self, location: &str) -> Result<Vec<u8>, BridgeError> {
        self.assets
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .ok_or_else(|| BridgeError::Engine(format!("image not found: {location}")))
    }

    fn add_image(&self, image_id: &str, image: Vec<u8>) {
        self.images.lock().unwrap().insert(image_id.to_string(), image);
    }

    fn bounds(&self) -> GeoBounds {
        let vp = self.viewport();
        let sw = self.unproject(ScreenPoint { x: 0.0, y: vp.height });
        let ne = self.unproject(ScreenPoint { x: vp.width, y: 0.0 });
        GeoBounds::new(sw, ne)
    }

    fn fit_bounds(&self, bounds: &GeoBounds) {
        let mut vp = self.viewport.lock().unwrap();
        let (min_x, min_y) = project_world(LngLat::new(bounds.min().x, bounds.max().y), TILE_SIZE);
        let (max_x, max_y) = project_world(LngLat::new(bounds.max().x, bounds.min().y), TILE_SIZE);
        let dx = (max_x - min_x).abs().max(f64::EPSILON);
        let dy = (max_y - min_y).abs().max(f64::EPSILON);
        let scale = (vp.width / dx).min(vp.height / dy);
        vp.zoom = scale.log2().clamp(MIN_ZOOM, MAX_ZOOM);
        vp.center = LngLat::from(bounds.center());
    }

    fn set_cursor(&self, cursor: &str) {
        *self.cursor.lock().unwrap() = cursor.to_string();
    }

    fn set_interaction(&self, name: &str, enabled: bool) -> bool {
        match self.interactions.lock().unwrap().get_mut(name) {
            Some(state) => {
                *state = enabled;
                true
            }
            None => false,
        }
    }

    fn add_geojson_source(
        &self,
        source_id: &str,
        data: &FeatureCollection,
        promote_id_property: &str,
    ) {
        self.sources.lock().unwrap().insert(
            source_id.to_string(),
            SourceRecord {
                data: data.clone(),
                promote_id_property: promote_id_property.to_string(),
            },
        );
    }

    fn source_data(&self, source_id: &str) -> Option<FeatureCollection> {
        self.sources
            .lock()
            .unwrap()
            .get(source_id)
            .map(|record| record.data.clone())
    }

    fn set_source_data(
        &self,
        source_id: &str,
        data: &FeatureCollection,
    ) -> Result<(), BridgeError> {
        match self.sources.lock().unwrap().get_mut(source_id) {
            Some(record) => {
                record.data = data.clone();
                Ok(())
            }
            None => Err(BridgeError::Engine(format!(
                "no source named {source_id}"
            ))),
        }
    }

    fn remove_source(&self, source_id: &str) {
        self.sources.lock().unwrap().remove(source_id);
    }

    fn add_layer(&self, spec: &LayerSpec) {
        self.layers.lock().unwrap().push(LayerRecord {
            info: LayerInfo {
                id: spec.id.clone(),
                source: spec.source.clone(),
            },
            spec: spec.clone(),
        });
    }

    fn layer(&self, layer_id: &str) -> Option<LayerInfo> {
        self.layers
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.info.id == layer_id)
            .map(|record| record.info.clone())
    }

    fn remove_layer(&self, layer_id: &str) {
        self.layers.lock().unwrap().retain(|record| record.info.id != layer_id);
    }

    fn style_layers(&self) -> Vec<LayerInfo> {
        self.layers
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.info.clone())
            .collect()
    }

    fn query_rendered_features(
        &self,
        geometry: Option<&QueryGeometry>,
    ) -> Vec<RenderedFeature> {
        let layers: Vec<LayerRecord> = self.layers.lock().unwrap().clone();
        let mut hits = Vec::new();
        for layer in &layers {
            let Some(record) = self
                .sources
                .lock()
                .unwrap()
                .get(&layer.info.source)
                .cloned()
            else {
                continue;
            };
            for feature in &record.data.features {
                let Some(feature_geometry) = &feature.geometry else {
                    continue;
                };
                if !self.hit(feature_geometry, geometry) {
                    continue;
                }
                let properties = feature.properties.clone().unwrap_or_default();
                let id = properties
                    .get(&record.promote_id_property)
                    .cloned()
                    .or_else(|| feature.id.as_ref().map(feature_id_to_json));
                hits.push(RenderedFeature {
                    id,
                    source: layer.info.source.clone(),
                    geometry: feature_geometry.clone(),
                    properties,
                });
            }
        }
        hits
    }

    fn project(&self, position: LngLat) -> ScreenPoint {
        let vp = self.viewport();
        let ws = world_size(vp.zoom);
        let (x, y) = project_world(position, ws);
        let (cx, cy) = project_world(vp.center, ws);
        ScreenPoint {
            x: x - cx + vp.width / 2.0,
            y: y - cy + vp.height / 2.0,
        }
    }

    fn unproject(&self, point: ScreenPoint) -> LngLat {
        let vp = self.viewport();
        let ws = world_size(vp.zoom);
        let (cx, cy) = project_world(vp.center, ws);
        let wx = point.x - vp.width / 2.0 + cx;
        let wy = point.y - vp.height / 2.0 + cy;
        let lng = (wx / ws - 0.5) * 360.0;
        let n = 0.5 - wy / ws;
        let lat = (2.0 * (n * 2.0 * PI).exp().atan() - PI / 2.0).to_degrees();
        LngLat::new(lng, lat)
    }

    fn add_listener(
        &self,
        event: &str,
        target_layer: Option<&str>,
        once: bool,
        handler: EventHandler,
    ) -> ListenerId {
        let id = self.next_id();
        self.listeners.lock().unwrap().push(ListenerRecord {
            id,
            event: event.to_string(),
            target_layer: target_layer.map(str::to_string),
            once,
            handler,
        });
        id
    }

    fn remove_listener(&self, event: &str, target_layer: Option<&str>, listener: ListenerId) {
        self.listeners.lock().unwrap().retain(|record| {
            !(record.id == listener
                && record.event == event
                && record.target_layer.as_deref() == target_layer)
        });
    }

    fn fire(&self, event: &str, data: &JsonObject) {
        let event_layer = data.get("layer").and_then(JsonValue::as_str);
        let mut due = Vec::new();
        {
            let mut listeners = self.listeners.lock().unwrap();
            for record in listeners.iter() {
                let scoped_match = match &record.target_layer {
                    None => true,
                    Some(target) => event_layer == Some(target.as_str()),
                };
                if record.event == event && scoped_match {
                    due.push((record.target_layer.clone(), record.handler.clone()));
                }
            }
            listeners.retain(|record| {
                !(record.once
                    && record.event == event
                    && match &record.target_layer {
                        None => true,
                        Some(target) => event_layer == Some(target.as_str()),
                    })
            });
        }
        for (target_layer, handler) in due {
            handler(&MapEvent {
                event_type: event.to_string(),
                target_layer,
                data: data.clone(),
            });
        }
    }

    fn add_marker(&self, options: &MarkerOptions, position: LngLat) -> MarkerId {
        let id = self.next_id();
        let element = options
            .class_name
            .clone()
            .unwrap_or_else(|| format!("marker-{id}"));
        self.markers
            .lock()
            .unwrap()
            .insert(id, MarkerRecord { position, element });
        id
    }

    fn marker_element(&self, marker: MarkerId) -> Option<String> {
        self.markers
            .lock()
            .unwrap()
            .get(&marker)
            .map(|record| record.element.clone())
    }

    fn marker_position(&self, marker: MarkerId) -> Option<LngLat> {
        self.markers
            .lock()
            .unwrap()
            .get(&marker)
            .map(|record| record.position)
    }

    fn set_marker_position(&self, marker: MarkerId, position: LngLat) {
        if let Some(record) = self.markers.lock().unwrap().get_mut(&marker) {
            record.position = position;
        }
    }

    fn remove_marker(&self, marker: MarkerId) {
        self.markers.lock().unwrap().remove(&marker);
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Web-mercator projection into a square world of side `world_size` pixels.
fn project_world(position: LngLat, world_size: f64) -> (f64, f64) {
    let x = world_size * (0.5 + position.x() / 360.0);
    let lat = position.y().to_radians();
    let y = world_size * (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI));
    (x, y)
}

fn feature_id_to_json(id: &geojson::feature::Id) -> JsonValue {
    match id {
        geojson::feature::Id::String(s) => JsonValue::String(s.clone()),
        geojson::feature::Id::Number(n) => JsonValue::Number(n.clone()),
    }
}

/// Visits every coordinate position in a geometry, recursing into
/// geometry collections.
fn for_each_position(value: &Value, visit: &mut impl FnMut(f64, f64)) {
    fn position(pos: &[f64], visit: &mut impl FnMut(f64, f64)) {
        if pos.len() >= 2 {
            visit(pos[0], pos[1]);
        }
    }
    match value {
        Value::Point(pos) => position(pos, visit),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            for pos in positions {
                position(pos, visit);
            }
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            for pos in lines.iter().flatten() {
                position(pos, visit);
            }
        }
        Value::MultiPolygon(polygons) => {
            for pos in polygons.iter().flatten().flatten() {
                position(pos, visit);
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                for_each_position(&geometry.value, visit);
            }
        }
    }
}
