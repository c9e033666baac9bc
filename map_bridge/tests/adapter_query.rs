use std::sync::Arc;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use map_bridge::{
    feature_identity, FeatureRegistry, HeadlessEngine, LayerSpec, MapAdapter, MapEngine,
    QueryGeometry, ScreenPoint, FEATURE_ID_PROPERTY,
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

fn setup(features: Vec<Feature>) -> (Arc<HeadlessEngine>, MapAdapter) {
    let engine = Arc::new(HeadlessEngine::new());
    let registry = Arc::new(FeatureRegistry::new(engine.clone()));
    registry.create("main", Some(collection(features)));
    let adapter = MapAdapter::new(engine.clone(), registry);
    (engine, adapter)
}

#[test]
fn full_mode_deduplicates_by_identifier() {
    let (engine, adapter) = setup(vec![feature("a", [0.0, 0.0])]);
    // Two layers drawing the same source produce duplicate hits.
    engine.add_layer(&layer("fill", "main"));
    engine.add_layer(&layer("outline", "main"));

    let records = adapter.query_geojson_features(None, &["main"]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, json!("a"));
    assert_eq!(records[0].source_name, "main");
}

#[test]
fn lightweight_mode_resolves_through_the_store() {
    let (engine, adapter) = setup(vec![feature("a", [0.0, 0.0]), feature("b", [1.0, 1.0])]);
    engine.add_layer(&layer("fill", "main"));

    let found = adapter.query_features(None, &["main"]);
    assert_eq!(found.len(), 2);
    assert_eq!(feature_identity(&found[0]), Some(&json!("a")));

    // Sources outside the allowed set are filtered out entirely.
    assert!(adapter.query_features(None, &["other"]).is_empty());
    assert!(adapter.query_geojson_features(None, &["other"]).is_empty());
}

#[test]
fn unidentified_features_are_excluded() {
    let mut anonymous = feature("x", [0.0, 0.0]);
    let props = anonymous.properties.as_mut().unwrap();
    props.remove(FEATURE_ID_PROPERTY);
    props.insert("name".to_string(), json!("no id"));

    let (engine, adapter) = setup(vec![anonymous, feature("a", [1.0, 1.0])]);
    engine.add_layer(&layer("fill", "main"));

    let light = adapter.query_features(None, &["main"]);
    assert_eq!(light.len(), 1);

    let full = adapter.query_geojson_features(None, &["main"]);
    assert_eq!(full.len(), 1);
    assert_eq!(full[0].id, json!("a"));
}

#[test]
fn geometry_collections_are_excluded_from_full_mode() {
    let mut odd = feature("gc", [0.0, 0.0]);
    odd.geometry = Some(Geometry::new(Value::GeometryCollection(vec![
        Geometry::new(Value::Point(vec![0.0, 0.0])),
    ])));

    let (engine, adapter) = setup(vec![odd, feature("a", [0.0, 0.0])]);
    engine.add_layer(&layer("fill", "main"));

    let full = adapter.query_geojson_features(None, &["main"]);
    assert_eq!(full.len(), 1);
    assert_eq!(full[0].id, json!("a"));
}

#[test]
fn screen_space_queries_filter_by_position() {
    // Default viewport: 512x512, zoom 0, centered on (0, 0).
    let (engine, adapter) = setup(vec![feature("center", [0.0, 0.0]), feature("east", [90.0, 0.0])]);
    engine.add_layer(&layer("fill", "main"));

    let at_center = adapter.query_geojson_features(
        Some(&QueryGeometry::Point(ScreenPoint { x: 256.0, y: 256.0 })),
        &["main"],
    );
    assert_eq!(at_center.len(), 1);
    assert_eq!(at_center[0].id, json!("center"));

    let everything = adapter.query_geojson_features(None, &["main"]);
    assert_eq!(everything.len(), 2);
}

#[test]
fn query_records_carry_importable_features() {
    let (engine, adapter) = setup(vec![feature("a", [3.0, 4.0])]);
    engine.add_layer(&layer("fill", "main"));

    let records = adapter.query_geojson_features(None, &["main"]);
    let imported = &records[0].feature;
    assert_eq!(
        imported.id,
        Some(geojson::feature::Id::String("a".to_string()))
    );
    assert!(imported.geometry.is_some());
    assert_eq!(feature_identity(imported), Some(&json!("a")));
}
