use std::sync::Arc;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use map_bridge::{
    FeatureSource, HeadlessEngine, LayerSpec, MapEngine, FEATURE_ID_PROPERTY,
};
use serde_json::json;

fn feature(id: &str, coords: [f64; 2]) -> Feature {
    let mut props = JsonObject::new();
    props.insert(FEATURE_ID_PROPERTY.to_string(), json!(id));
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(coords.to_vec()))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn layer(id: &str, source: &str) -> LayerSpec {
    LayerSpec {
        id: id.to_string(),
        kind: "circle".to_string(),
        source: source.to_string(),
        options: JsonObject::new(),
    }
}

#[test]
fn attach_seeds_from_engine() {
    let engine = Arc::new(HeadlessEngine::new());
    engine.add_geojson_source(
        "existing",
        &collection(vec![feature("a", [0.0, 0.0]), feature("b", [1.0, 1.0])]),
        FEATURE_ID_PROPERTY,
    );

    let source = FeatureSource::attach(engine, "existing");
    assert!(source.is_available());
    assert_eq!(source.id().unwrap(), "existing");
    assert_eq!(source.read().features.len(), 2);
}

#[test]
fn attach_to_missing_source_is_inert() {
    let engine = Arc::new(HeadlessEngine::new());
    let source = FeatureSource::attach(engine, "missing");

    assert!(!source.is_available());
    assert!(source.read().features.is_empty());

    let err = source.id().unwrap_err();
    assert_eq!(err.to_string(), "source instance is not available");

    assert!(source.replace(collection(vec![])).is_err());
}

#[test]
fn create_seeds_the_engine_source() {
    let engine = Arc::new(HeadlessEngine::new());
    let source = FeatureSource::create(
        engine.clone(),
        "fresh",
        Some(collection(vec![feature("a", [2.0, 3.0])])),
    );

    assert!(source.is_available());
    let pushed = engine.source_data("fresh").unwrap();
    assert_eq!(pushed.features.len(), 1);
}

#[test]
fn replace_pushes_the_collection_verbatim() {
    let engine = Arc::new(HeadlessEngine::new());
    let source = FeatureSource::create(engine.clone(), "edits", None);

    // Replace does not filter: even a non-renderable feature goes through.
    let mut broken = feature("a", [0.0, 0.0]);
    broken.geometry = None;
    source
        .replace(collection(vec![broken, feature("b", [1.0, 1.0])]))
        .unwrap();

    assert_eq!(source.read().features.len(), 2);
    assert_eq!(engine.source_data("edits").unwrap().features.len(), 2);
}

#[test]
fn destroy_removes_dependent_layers_on_request() {
    let engine = Arc::new(HeadlessEngine::new());
    let source = FeatureSource::create(engine.clone(), "edits", None);
    FeatureSource::create(engine.clone(), "other", None);

    engine.add_layer(&layer("edits-fill", "edits"));
    engine.add_layer(&layer("edits-line", "edits"));
    engine.add_layer(&layer("other-fill", "other"));

    source.destroy(true);

    assert!(engine.layer("edits-fill").is_none());
    assert!(engine.layer("edits-line").is_none());
    assert!(engine.layer("other-fill").is_some());
    assert!(engine.source_data("edits").is_none());

    // Safe to call twice.
    source.destroy(true);
}

#[test]
fn destroy_can_leave_layers_behind() {
    let engine = Arc::new(HeadlessEngine::new());
    let source = FeatureSource::create(engine.clone(), "edits", None);
    engine.add_layer(&layer("edits-fill", "edits"));

    source.destroy(false);

    assert!(engine.layer("edits-fill").is_some());
    assert!(engine.source_data("edits").is_none());
    assert!(!source.is_available());
}
