//! The rendering-engine seam.
//!
//! [`MapEngine`] is everything the bridge needs from a native map renderer.
//! One conforming implementation exists per supported engine and is selected
//! at composition time; nothing in the bridge inspects which engine is
//! underneath.

use std::sync::Arc;

use geojson::{FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::error::BridgeError;

/// Geographic coordinate. `x` is longitude, `y` is latitude, in degrees.
pub type LngLat = geo_types::Point<f64>;

/// Geographic bounding box; `min()` is the south-west corner, `max()` the
/// north-east corner.
pub type GeoBounds = geo_types::Rect<f64>;

/// A point in screen pixels, origin at the top-left of the map container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// Screen-space bounding box, south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub sw: ScreenPoint,
    pub ne: ScreenPoint,
}

/// Screen-space geometry for rendered-feature queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryGeometry {
    Point(ScreenPoint),
    Rect(ScreenBounds),
}

/// Creation payload for a rendering layer.
#[derive(Debug, Clone, Default)]
pub struct LayerSpec {
    pub id: String,
    /// Engine layer kind, e.g. `"fill"`, `"line"`, `"circle"`.
    pub kind: String,
    /// Identifier of the data source the layer draws from.
    pub source: String,
    /// Remaining engine-specific options (paint, layout, filters).
    pub options: JsonObject,
}

/// A materialized rendering layer as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: String,
    /// Back-reference to the owning source, by identifier.
    pub source: String,
}

/// One hit from a rendered-feature query, in engine-native shape.
#[derive(Debug, Clone)]
pub struct RenderedFeature {
    /// Engine-assigned feature id, when the engine promoted one.
    pub id: Option<JsonValue>,
    /// Name of the source the feature was rendered from.
    pub source: String,
    pub geometry: Geometry,
    pub properties: JsonObject,
}

/// Creation options for a draggable DOM marker.
#[derive(Debug, Clone, Default)]
pub struct MarkerOptions {
    pub draggable: bool,
    pub class_name: Option<String>,
}

/// Opaque marker handle issued by the engine.
pub type MarkerId = u64;

/// Opaque listener handle issued by the engine.
pub type ListenerId = u64;

/// An event delivered to a registered listener.
#[derive(Debug, Clone)]
pub struct MapEvent {
    pub event_type: String,
    /// Layer the event was scoped to, for delegated pointer events.
    pub target_layer: Option<String>,
    pub data: JsonObject,
}

/// Callback invoked when a subscribed event fires.
pub type EventHandler = Arc<dyn Fn(&MapEvent) + Send + Sync>;

/// Capability surface of a native map rendering engine.
///
/// Methods take `&self`; implementations own their interior mutability and
/// must serialize access to each internal table.
pub trait MapEngine: Send + Sync {
    /// Short engine name, e.g. `"headless"`.
    fn name(&self) -> &'static str;

    /// Whether the engine finished its initial load.
    fn is_loaded(&self) -> bool;

    /// Identifier of the DOM container hosting the map.
    fn container(&self) -> String;

    fn add_control(&self, control_id: &str);
    fn remove_control(&self, control_id: &str);

    /// Loads image bytes from an engine-visible location. Failures are
    /// reported to the caller unchanged; the engine never retries.
    fn load_image(&self, location: &str) -> Result<Vec<u8>, BridgeError>;

    /// Registers previously loaded image bytes under `image_id`.
    fn add_image(&self, image_id: &str, image: Vec<u8>);

    /// Current geographic bounds of the viewport.
    fn bounds(&self) -> GeoBounds;

    /// Moves the camera so `bounds` fits the viewport.
    fn fit_bounds(&self, bounds: &GeoBounds);

    fn set_cursor(&self, cursor: &str);

    /// Enables or disables a named interaction handler. Returns `false` when
    /// the name is not in the engine's handler registry.
    fn set_interaction(&self, name: &str, enabled: bool) -> bool;

    /// Adds a GeoJSON source whose feature ids are promoted from
    /// `promote_id_property`.
    fn add_geojson_source(
        &self,
        source_id: &str,
        data: &FeatureCollection,
        promote_id_property: &str,
    );

    /// Serializes the current data of a source, if the source exists.
    fn source_data(&self, source_id: &str) -> Option<FeatureCollection>;

    /// Replaces the full data of an existing source in one call.
    fn set_source_data(
        &self,
        source_id: &str,
        data: &FeatureCollection,
    ) -> Result<(), BridgeError>;

    fn remove_source(&self, source_id: &str);

    fn add_layer(&self, spec: &LayerSpec);

    fn layer(&self, layer_id: &str) -> Option<LayerInfo>;

    fn remove_layer(&self, layer_id: &str);

    /// Every style layer, in rendering order.
    fn style_layers(&self) -> Vec<LayerInfo>;

    /// Features currently rendered at `geometry`, or all rendered features
    /// when `geometry` is `None`. May contain duplicates when a feature is
    /// drawn by more than one layer.
    fn query_rendered_features(&self, geometry: Option<&QueryGeometry>) -> Vec<RenderedFeature>;

    /// Geographic coordinate to screen pixels.
    fn project(&self, position: LngLat) -> ScreenPoint;

    /// Screen pixels to geographic coordinate.
    fn unproject(&self, point: ScreenPoint) -> LngLat;

    /// Registers a listener, optionally scoped to a layer, optionally firing
    /// at most once.
    fn add_listener(
        &self,
        event: &str,
        target_layer: Option<&str>,
        once: bool,
        handler: EventHandler,
    ) -> ListenerId;

    fn remove_listener(&self, event: &str, target_layer: Option<&str>, listener: ListenerId);

    /// Dispatches an event to matching listeners.
    fn fire(&self, event: &str, data: &JsonObject);

    fn add_marker(&self, options: &MarkerOptions, position: LngLat) -> MarkerId;

    fn marker_element(&self, marker: MarkerId) -> Option<String>;

    fn marker_position(&self, marker: MarkerId) -> Option<LngLat>;

    fn set_marker_position(&self, marker: MarkerId, position: LngLat);

    fn remove_marker(&self, marker: MarkerId);
}
