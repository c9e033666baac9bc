//! Named table of feature stores.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use geojson::{Feature, FeatureCollection, JsonValue};

use crate::engine::MapEngine;
use crate::feature::{empty_collection, feature_identity};
use crate::source::FeatureSource;

/// Name of the editing source created at initialization.
pub const DEFAULT_SOURCE: &str = "main";

/// Registry of feature stores keyed by source name.
///
/// Query translation resolves engine hits through this table, and the
/// export surface merges it. Sorted keys keep the export deterministic.
pub struct FeatureRegistry {
    engine: Arc<dyn MapEngine>,
    sources: Mutex<BTreeMap<String, Arc<FeatureSource>>>,
}

impl FeatureRegistry {
    pub fn new(engine: Arc<dyn MapEngine>) -> Self {
        Self {
            engine,
            sources: Mutex::new(BTreeMap::new()),
        }
    }

    /// Creates the default editing source if it does not exist yet.
    pub fn init(&self) {
        let mut sources = self.sources.lock().unwrap();
        if !sources.contains_key(DEFAULT_SOURCE) {
            let source = Arc::new(FeatureSource::create(
                self.engine.clone(),
                DEFAULT_SOURCE,
                None,
            ));
            sources.insert(DEFAULT_SOURCE.to_string(), source);
        }
    }

    /// Creates and registers a new store bound to a fresh engine source.
    pub fn create(&self, source_id: &str, initial: Option<FeatureCollection>) -> Arc<FeatureSource> {
        let source = Arc::new(FeatureSource::create(self.engine.clone(), source_id, initial));
        self.sources
            .lock()
            .unwrap()
            .insert(source_id.to_string(), source.clone());
        source
    }

    /// Registers a store attached to a pre-existing engine source.
    pub fn attach(&self, source_id: &str) -> Arc<FeatureSource> {
        let source = Arc::new(FeatureSource::attach(self.engine.clone(), source_id));
        self.sources
            .lock()
            .unwrap()
            .insert(source_id.to_string(), source.clone());
        source
    }

    /// Looks up a registered store by name.
    pub fn source(&self, source_name: &str) -> Option<Arc<FeatureSource>> {
        self.sources.lock().unwrap().get(source_name).cloned()
    }

    /// Resolves one feature by identity scan over the named store.
    pub fn get(&self, source_name: &str, identity: &JsonValue) -> Option<Feature> {
        let source = self.source(source_name)?;
        source
            .read()
            .features
            .into_iter()
            .find(|feature| feature_identity(feature) == Some(identity))
    }

    /// Destroys and unregisters the named store.
    pub fn remove(&self, source_name: &str, remove_dependent_layers: bool) {
        if let Some(source) = self.sources.lock().unwrap().remove(source_name) {
            source.destroy(remove_dependent_layers);
        }
    }

    /// Registered source names, sorted.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.lock().unwrap().keys().cloned().collect()
    }

    /// Merges every authoritative copy into one collection: the synchronous
    /// export surface.
    pub fn export_geojson(&self) -> FeatureCollection {
        let sources = self.sources.lock().unwrap();
        let mut merged = empty_collection();
        for source in sources.values() {
            merged.features.extend(source.read().features);
        }
        merged
    }
}
