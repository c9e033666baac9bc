use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use geojson::JsonObject;
use map_bridge::{
    BridgeError, FeatureRegistry, GeoBounds, HeadlessEngine, LayerSpec, LngLat, MapAdapter,
};
use serde_json::json;

fn setup() -> (Arc<HeadlessEngine>, MapAdapter) {
    let engine = Arc::new(HeadlessEngine::new());
    let registry = Arc::new(FeatureRegistry::new(engine.clone()));
    let adapter = MapAdapter::new(engine.clone(), registry);
    (engine, adapter)
}

fn counter_handler(counter: Arc<AtomicUsize>) -> map_bridge::EventHandler {
    Arc::new(move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn targeted_subscription_requires_a_pointer_event() {
    let (_engine, adapter) = setup();
    let counter = Arc::new(AtomicUsize::new(0));

    let err = adapter
        .on("zoomend", Some("points"), counter_handler(counter))
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArguments(_)));
    assert!(err.to_string().starts_with("invalid arguments"));
}

#[test]
fn untargeted_subscription_accepts_any_event() {
    let (_engine, adapter) = setup();
    let counter = Arc::new(AtomicUsize::new(0));

    adapter
        .on("zoomend", None, counter_handler(counter.clone()))
        .unwrap();
    adapter.fire("zoomend", &JsonObject::new());
    adapter.fire("zoomend", &JsonObject::new());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn once_fires_at_most_once() {
    let (_engine, adapter) = setup();
    let counter = Arc::new(AtomicUsize::new(0));

    adapter
        .once("click", None, counter_handler(counter.clone()))
        .unwrap();
    adapter.fire("click", &JsonObject::new());
    adapter.fire("click", &JsonObject::new());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn layer_targeted_pointer_events_are_delegated() {
    let (_engine, adapter) = setup();
    let counter = Arc::new(AtomicUsize::new(0));

    adapter
        .on("click", Some("points"), counter_handler(counter.clone()))
        .unwrap();

    let mut on_points = JsonObject::new();
    on_points.insert("layer".to_string(), json!("points"));
    adapter.fire("click", &on_points);

    let mut elsewhere = JsonObject::new();
    elsewhere.insert("layer".to_string(), json!("roads"));
    adapter.fire("click", &elsewhere);
    adapter.fire("click", &JsonObject::new());

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn off_unsubscribes() {
    let (_engine, adapter) = setup();
    let counter = Arc::new(AtomicUsize::new(0));

    let listener = adapter
        .on("click", None, counter_handler(counter.clone()))
        .unwrap();
    adapter.off("click", None, listener).unwrap();
    adapter.fire("click", &JsonObject::new());
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // Deregistration is validated the same way as registration.
    assert!(adapter.off("zoomend", Some("points"), listener).is_err());
}

#[test]
fn project_and_unproject_are_inverses() {
    let (_engine, adapter) = setup();
    let position = LngLat::new(12.5, 41.9);
    let back = adapter.unproject(adapter.project(position));
    assert!((back.x() - position.x()).abs() < 1e-9);
    assert!((back.y() - position.y()).abs() < 1e-9);
}

#[test]
fn coord_bounds_project_through_both_corners() {
    let (_engine, adapter) = setup();
    let bounds = GeoBounds::new(LngLat::new(-10.0, -10.0), LngLat::new(10.0, 10.0));
    let screen = adapter.coord_bounds_to_screen_bounds(&bounds);

    assert_eq!(screen.sw, adapter.project(LngLat::new(-10.0, -10.0)));
    assert_eq!(screen.ne, adapter.project(LngLat::new(10.0, 10.0)));
    // Screen y grows downward, so the south-west corner sits lower.
    assert!(screen.sw.x < screen.ne.x);
    assert!(screen.sw.y > screen.ne.y);
}

#[test]
fn interaction_toggles_look_up_the_engine_registry() {
    let (engine, adapter) = setup();

    adapter.disable_map_interactions(&["drag_pan", "scroll_zoom"]);
    assert_eq!(engine.interaction_enabled("drag_pan"), Some(false));
    assert_eq!(engine.interaction_enabled("scroll_zoom"), Some(false));

    adapter.enable_map_interactions(&["drag_pan", "no_such_handler"]);
    assert_eq!(engine.interaction_enabled("drag_pan"), Some(true));

    adapter.set_drag_pan(false);
    assert_eq!(engine.interaction_enabled("drag_pan"), Some(false));
}

#[test]
fn image_load_errors_propagate() {
    let (engine, adapter) = setup();

    let err = adapter.load_image("icon", "/missing.png").unwrap_err();
    assert!(matches!(err, BridgeError::Engine(_)));
    assert!(err.to_string().contains("/missing.png"));
    assert!(!engine.has_image("icon"));

    engine.register_asset("/icon.png", vec![1, 2, 3]);
    adapter.load_image("icon", "/icon.png").unwrap();
    assert!(engine.has_image("icon"));
}

#[test]
fn delegation_passes_through() {
    let (engine, adapter) = setup();

    assert_eq!(adapter.map_type(), "headless");
    assert!(adapter.is_loaded());
    assert_eq!(adapter.container(), "headless-map");

    adapter.set_cursor("crosshair");
    assert_eq!(engine.cursor(), "crosshair");

    adapter.add_control("zoom");
    assert_eq!(engine.controls(), vec!["zoom".to_string()]);
    adapter.remove_control("zoom");
    assert!(engine.controls().is_empty());
}

#[test]
fn each_layer_visits_style_layers_in_order() {
    let (_engine, adapter) = setup();
    for name in ["first", "second", "third"] {
        adapter.add_layer(&LayerSpec {
            id: name.to_string(),
            kind: "line".to_string(),
            source: "main".to_string(),
            options: JsonObject::new(),
        });
    }

    let mut seen = Vec::new();
    adapter.each_layer(|layer| seen.push(layer.id().unwrap().to_string()));
    assert_eq!(seen, vec!["first", "second", "third"]);
}

#[test]
fn fit_bounds_brings_bounds_into_view() {
    let (_engine, adapter) = setup();
    let target = GeoBounds::new(LngLat::new(10.0, 40.0), LngLat::new(11.0, 41.0));
    adapter.fit_bounds(&target);

    let view = adapter.bounds();
    assert!(view.min().x <= 10.0 + 1e-6 && view.max().x >= 11.0 - 1e-6);
    assert!(view.min().y <= 40.0 + 1e-6 && view.max().y >= 41.0 - 1e-6);
}
