//! Feature identity convention and reconciliation batch types.

use geojson::{Feature, FeatureCollection, JsonValue};
use serde::{Deserialize, Serialize};

/// Reserved property key carrying the stable per-feature identity.
///
/// The editing toolkit injects this property before features reach the
/// store; the bridge only ever reads it.
pub const FEATURE_ID_PROPERTY: &str = "_gmid";

/// Returns the identity property of a feature, if present.
pub fn feature_identity(feature: &Feature) -> Option<&JsonValue> {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get(FEATURE_ID_PROPERTY))
}

/// Whether a feature may be pushed to the rendering engine.
///
/// Requires a geometry and a non-empty properties object. Features failing
/// this stay in the authoritative copy (a later batch can correct them) but
/// are never rendered.
pub fn is_renderable(feature: &Feature) -> bool {
    let has_properties = feature
        .properties
        .as_ref()
        .is_some_and(|props| !props.is_empty());
    feature.geometry.is_some() && has_properties
}

/// An empty feature collection.
pub fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

/// One reconciliation step: three independent lanes applied in the fixed
/// order remove, update, add.
///
/// `remove` carries identity values, not features. Entries in `add`/`update`
/// lacking the identity property are skipped during reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBatch {
    #[serde(default)]
    pub add: Vec<Feature>,
    #[serde(default)]
    pub update: Vec<Feature>,
    #[serde(default)]
    pub remove: Vec<JsonValue>,
}

impl UpdateBatch {
    /// True when no lane carries any entry.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }
}
