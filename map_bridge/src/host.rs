//! Composition root: owns the adapter and drives the boot sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use geojson::{FeatureCollection, JsonObject};
use serde_json::json;

use crate::adapter::MapAdapter;
use crate::engine::{EventHandler, MapEngine, MapEvent};
use crate::error::BridgeError;
use crate::registry::FeatureRegistry;

/// Image id of the marker icon loaded at map load.
pub const DEFAULT_MARKER_IMAGE: &str = "default-marker";
/// Engine location the default marker icon is loaded from.
pub const DEFAULT_MARKER_ASSET: &str = "/default-marker.png";
/// Control mounted during the boot sequence.
pub const TOOLBAR_CONTROL: &str = "toolbar";
/// Host bus event fired when the map finishes loading.
pub const CONTROL_EVENT: &str = "control";

/// Toolkit-level event bus, separate from the engine's map events.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
}

impl EventBus {
    pub fn on(&self, event: &str, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    pub fn fire(&self, event: &str, data: JsonObject) {
        let due: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap()
            .get(event)
            .cloned()
            .unwrap_or_default();
        let map_event = MapEvent {
            event_type: event.to_string(),
            target_layer: None,
            data,
        };
        for handler in due {
            handler(&map_event);
        }
    }
}

/// Owns the engine handle, the feature registry, the adapter and the host
/// event bus.
pub struct EditorHost {
    adapter: MapAdapter,
    features: Arc<FeatureRegistry>,
    events: EventBus,
    loaded: AtomicBool,
}

impl EditorHost {
    /// Constructs the adapter over `engine`. Call [`EditorHost::init`] next.
    pub fn new(engine: Arc<dyn MapEngine>) -> Self {
        let features = Arc::new(FeatureRegistry::new(engine.clone()));
        let adapter = MapAdapter::new(engine, features.clone());
        Self {
            adapter,
            features,
            events: EventBus::default(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Boot sequence: feature-registry initialization, then control
    /// mounting. Adapter construction already happened in `new`.
    pub fn init(&self) {
        self.features.init();
        self.adapter.add_control(TOOLBAR_CONTROL);
    }

    pub fn adapter(&self) -> &MapAdapter {
        &self.adapter
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Map-loaded hook: loads the default marker image and fires the
    /// system-level lifecycle event, exactly once per map instance. A
    /// failed image load propagates and leaves the hook re-runnable.
    pub fn on_map_load(&self) -> Result<(), BridgeError> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.adapter
            .load_image(DEFAULT_MARKER_IMAGE, DEFAULT_MARKER_ASSET)?;

        let mut data = JsonObject::new();
        data.insert("level".to_string(), json!("system"));
        data.insert("type".to_string(), json!("control"));
        data.insert("action".to_string(), json!("loaded"));
        self.events.fire(CONTROL_EVENT, data);

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Full current GeoJSON across every registered source.
    pub fn export_geojson(&self) -> FeatureCollection {
        self.features.export_geojson()
    }
}
