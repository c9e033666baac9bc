//! The capability contract the editing toolkit programs against.
//!
//! Every primitive map operation goes through [`MapAdapter`], which
//! translates it into engine calls and returns toolkit-shaped results. The
//! adapter adds no geometry state of its own; it is the sole path between
//! the feature stores, the layer handles and the rendering engine.

use std::sync::Arc;

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue, Value};

use crate::engine::{
    EventHandler, GeoBounds, LayerSpec, ListenerId, LngLat, MapEngine, MarkerOptions,
    QueryGeometry, RenderedFeature, ScreenBounds, ScreenPoint,
};
use crate::error::BridgeError;
use crate::feature::FEATURE_ID_PROPERTY;
use crate::layer::LayerHandle;
use crate::marker::DomMarker;
use crate::registry::FeatureRegistry;
use crate::source::FeatureSource;

/// Event names the engine can delegate to a target layer. The targeted
/// (three-argument) subscription form is only honored for these.
const POINTER_EVENTS: [&str; 13] = [
    "click",
    "dblclick",
    "mousedown",
    "mouseup",
    "mousemove",
    "mouseenter",
    "mouseleave",
    "mouseover",
    "mouseout",
    "contextmenu",
    "touchstart",
    "touchend",
    "touchcancel",
];

fn is_pointer_event(event: &str) -> bool {
    POINTER_EVENTS.contains(&event)
}

/// One record from a full-mode feature query.
#[derive(Debug, Clone)]
pub struct GeoJsonQueryRecord {
    pub id: JsonValue,
    pub source_name: String,
    pub feature: Feature,
}

/// Translates the toolkit's abstract map operations into engine calls.
pub struct MapAdapter {
    engine: Arc<dyn MapEngine>,
    features: Arc<FeatureRegistry>,
}

impl MapAdapter {
    pub fn new(engine: Arc<dyn MapEngine>, features: Arc<FeatureRegistry>) -> Self {
        Self { engine, features }
    }

    /// Handle to the underlying engine.
    pub fn engine(&self) -> Arc<dyn MapEngine> {
        self.engine.clone()
    }

    /// Which engine this adapter drives.
    pub fn map_type(&self) -> &'static str {
        self.engine.name()
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_loaded()
    }

    pub fn container(&self) -> String {
        self.engine.container()
    }

    pub fn add_control(&self, control_id: &str) {
        self.engine.add_control(control_id);
    }

    pub fn remove_control(&self, control_id: &str) {
        self.engine.remove_control(control_id);
    }

    /// Loads an image and registers it under `image_id`. Engine load
    /// failures propagate unchanged so a missing icon is never silent.
    pub fn load_image(&self, image_id: &str, location: &str) -> Result<(), BridgeError> {
        let image = self.engine.load_image(location)?;
        self.engine.add_image(image_id, image);
        Ok(())
    }

    pub fn bounds(&self) -> GeoBounds {
        self.engine.bounds()
    }

    pub fn fit_bounds(&self, bounds: &GeoBounds) {
        self.engine.fit_bounds(bounds);
    }

    pub fn set_cursor(&self, cursor: &str) {
        self.engine.set_cursor(cursor);
    }

    pub fn enable_map_interactions(&self, interactions: &[&str]) {
        self.toggle_interactions(interactions, true);
    }

    pub fn disable_map_interactions(&self, interactions: &[&str]) {
        self.toggle_interactions(interactions, false);
    }

    fn toggle_interactions(&self, interactions: &[&str], enabled: bool) {
        for name in interactions {
            if !self.engine.set_interaction(name, enabled) {
                log::warn!("unknown interaction handler: {name}");
            }
        }
    }

    pub fn set_drag_pan(&self, enabled: bool) {
        self.engine.set_interaction("drag_pan", enabled);
    }

    /// Lightweight query mode: engine hits reduced to (identity, source)
    /// pairs, deduplicated by deep equality, filtered to identified features
    /// in an allowed source, then resolved through the feature registry.
    pub fn query_features(
        &self,
        geometry: Option<&QueryGeometry>,
        source_names: &[&str],
    ) -> Vec<Feature> {
        let mut pairs: Vec<(Option<JsonValue>, String)> = Vec::new();
        for hit in self.engine.query_rendered_features(geometry) {
            let pair = (rendered_identity(&hit), hit.source);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }

        pairs
            .into_iter()
            .filter_map(|(identity, source_name)| {
                let identity = identity?;
                if !source_names.contains(&source_name.as_str()) {
                    return None;
                }
                self.features.get(&source_name, &identity)
            })
            .collect()
    }

    /// Full query mode: engine hits as GeoJSON-shaped records, deduplicated
    /// by identity, with geometry collections and unidentified features
    /// excluded.
    pub fn query_geojson_features(
        &self,
        geometry: Option<&QueryGeometry>,
        source_names: &[&str],
    ) -> Vec<GeoJsonQueryRecord> {
        let mut records: Vec<GeoJsonQueryRecord> = Vec::new();
        for hit in self.engine.query_rendered_features(geometry) {
            let Some((id, feature)) = import_feature(&hit) else {
                continue;
            };
            if records.iter().any(|record| record.id == id) {
                continue;
            }
            records.push(GeoJsonQueryRecord {
                id,
                source_name: hit.source,
                feature,
            });
        }
        records.retain(|record| source_names.contains(&record.source_name.as_str()));
        records
    }

    pub fn project(&self, position: LngLat) -> ScreenPoint {
        self.engine.project(position)
    }

    pub fn unproject(&self, point: ScreenPoint) -> LngLat {
        self.engine.unproject(point)
    }

    /// Projects both corners of a geographic bounding box.
    pub fn coord_bounds_to_screen_bounds(&self, bounds: &GeoBounds) -> ScreenBounds {
        ScreenBounds {
            sw: self.project(LngLat::from(bounds.min())),
            ne: self.project(LngLat::from(bounds.max())),
        }
    }

    pub fn fire(&self, event: &str, data: &JsonObject) {
        self.engine.fire(event, data);
    }

    /// Subscribes to an event. The layer-targeted form is only valid for
    /// pointer events; anything else is an invalid-arguments error.
    pub fn on(
        &self,
        event: &str,
        target_layer: Option<&str>,
        handler: EventHandler,
    ) -> Result<ListenerId, BridgeError> {
        self.subscribe(event, target_layer, false, handler)
    }

    /// Like [`MapAdapter::on`], firing at most once.
    pub fn once(
        &self,
        event: &str,
        target_layer: Option<&str>,
        handler: EventHandler,
    ) -> Result<ListenerId, BridgeError> {
        self.subscribe(event, target_layer, true, handler)
    }

    fn subscribe(
        &self,
        event: &str,
        target_layer: Option<&str>,
        once: bool,
        handler: EventHandler,
    ) -> Result<ListenerId, BridgeError> {
        self.check_event_target(event, target_layer)?;
        Ok(self.engine.add_listener(event, target_layer, once, handler))
    }

    /// Unsubscribes a listener registered with the same event and target.
    pub fn off(
        &self,
        event: &str,
        target_layer: Option<&str>,
        listener: ListenerId,
    ) -> Result<(), BridgeError> {
        self.check_event_target(event, target_layer)?;
        self.engine.remove_listener(event, target_layer, listener);
        Ok(())
    }

    fn check_event_target(
        &self,
        event: &str,
        target_layer: Option<&str>,
    ) -> Result<(), BridgeError> {
        if target_layer.is_some() && !is_pointer_event(event) {
            return Err(BridgeError::InvalidArguments(
                "layer-targeted subscription requires a pointer event",
            ));
        }
        Ok(())
    }

    /// Creates a fresh engine source and registers its store.
    pub fn add_source(&self, source_id: &str, data: FeatureCollection) -> Arc<FeatureSource> {
        self.features.create(source_id, Some(data))
    }

    /// Attaches to a pre-existing engine source and registers its store.
    pub fn get_source(&self, source_id: &str) -> Arc<FeatureSource> {
        self.features.attach(source_id)
    }

    pub fn add_layer(&self, spec: &LayerSpec) -> LayerHandle {
        LayerHandle::create(self.engine.clone(), spec)
    }

    pub fn get_layer(&self, layer_id: &str) -> LayerHandle {
        LayerHandle::attach(self.engine.clone(), layer_id)
    }

    pub fn remove_layer(&self, layer_id: &str) {
        let mut layer = self.get_layer(layer_id);
        layer.destroy();
    }

    /// Invokes `callback` with a handle for every style layer, in rendering
    /// order.
    pub fn each_layer<F: FnMut(LayerHandle)>(&self, mut callback: F) {
        for info in self.engine.style_layers() {
            callback(LayerHandle::attach(self.engine.clone(), &info.id));
        }
    }

    pub fn create_dom_marker(&self, options: &MarkerOptions, position: LngLat) -> DomMarker {
        DomMarker::new(self.engine.clone(), options, position)
    }
}

/// Engine-assigned id, falling back to the identity property.
fn rendered_identity(hit: &RenderedFeature) -> Option<JsonValue> {
    hit.id
        .clone()
        .or_else(|| hit.properties.get(FEATURE_ID_PROPERTY).cloned())
}

/// Converts an engine hit into an importable GeoJSON feature. Unidentified
/// features and geometry collections are rejected.
fn import_feature(hit: &RenderedFeature) -> Option<(JsonValue, Feature)> {
    let id = rendered_identity(hit)?;
    if matches!(hit.geometry.value, Value::GeometryCollection(_)) {
        return None;
    }
    let feature = Feature {
        bbox: None,
        geometry: Some(hit.geometry.clone()),
        id: json_to_feature_id(&id),
        properties: Some(hit.properties.clone()),
        foreign_members: None,
    };
    Some((id, feature))
}

fn json_to_feature_id(value: &JsonValue) -> Option<geojson::feature::Id> {
    match value {
        JsonValue::String(s) => Some(geojson::feature::Id::String(s.clone())),
        JsonValue::Number(n) => Some(geojson::feature::Id::Number(n.clone())),
        _ => None,
    }
}
