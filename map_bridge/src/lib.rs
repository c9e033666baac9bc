//! Bridges an interactive map-editing toolkit onto a pluggable rendering
//! engine.
//!
//! The toolkit assumes one engine; [`MapAdapter`] satisfies its capability
//! contract on top of any [`engine::MapEngine`] implementation, and
//! [`source::FeatureSource`] keeps an authoritative in-memory GeoJSON
//! collection consistent with the live rendering data source under
//! add/update/remove batches keyed by the [`FEATURE_ID_PROPERTY`] identity
//! property.

pub mod adapter;
pub mod engine;
pub mod error;
pub mod feature;
pub mod headless;
pub mod host;
pub mod layer;
pub mod marker;
pub mod registry;
pub mod source;

pub use adapter::{GeoJsonQueryRecord, MapAdapter};
pub use engine::{
    EventHandler, GeoBounds, LayerInfo, LayerSpec, ListenerId, LngLat, MapEngine, MapEvent,
    MarkerId, MarkerOptions, QueryGeometry, RenderedFeature, ScreenBounds, ScreenPoint,
};
pub use error::BridgeError;
pub use feature::{
    empty_collection, feature_identity, is_renderable, UpdateBatch, FEATURE_ID_PROPERTY,
};
pub use headless::{HeadlessEngine, Viewport};
pub use host::{EditorHost, EventBus, DEFAULT_MARKER_ASSET, DEFAULT_MARKER_IMAGE};
pub use layer::LayerHandle;
pub use marker::DomMarker;
pub use registry::{FeatureRegistry, DEFAULT_SOURCE};
pub use source::FeatureSource;
