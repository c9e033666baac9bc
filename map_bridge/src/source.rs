//! The feature store: one authoritative GeoJSON collection kept consistent
//! with a live rendering data source.

use std::sync::{Arc, Mutex};

use geojson::{Feature, FeatureCollection};

use crate::engine::MapEngine;
use crate::error::BridgeError;
use crate::feature::{empty_collection, feature_identity, is_renderable, UpdateBatch, FEATURE_ID_PROPERTY};

struct SourceState {
    bound: bool,
    data: FeatureCollection,
}

/// Owns the authoritative copy of one rendering data source.
///
/// The authoritative copy and the engine's copy converge after every
/// reconciliation; engine-internal state is never read back once bound.
pub struct FeatureSource {
    engine: Arc<dyn MapEngine>,
    source_id: String,
    state: Mutex<SourceState>,
}

impl FeatureSource {
    /// Creates a fresh engine source seeded with `initial` (or an empty
    /// collection), then confirms materialization by re-fetching it.
    pub fn create(
        engine: Arc<dyn MapEngine>,
        source_id: &str,
        initial: Option<FeatureCollection>,
    ) -> Self {
        let data = initial.unwrap_or_else(empty_collection);
        engine.add_geojson_source(source_id, &data, FEATURE_ID_PROPERTY);
        let bound = engine.source_data(source_id).is_some();
        Self {
            engine,
            source_id: source_id.to_string(),
            state: Mutex::new(SourceState { bound, data }),
        }
    }

    /// Binds to a pre-existing engine source. When the source is absent the
    /// store is inert: reads return the empty collection and mutating calls
    /// fail with [`BridgeError::InstanceUnavailable`].
    pub fn attach(engine: Arc<dyn MapEngine>, source_id: &str) -> Self {
        let (bound, data) = match engine.source_data(source_id) {
            Some(serialized) => (true, serialized),
            None => (false, empty_collection()),
        };
        Self {
            engine,
            source_id: source_id.to_string(),
            state: Mutex::new(SourceState { bound, data }),
        }
    }

    /// Whether the underlying engine source exists.
    pub fn is_available(&self) -> bool {
        self.state.lock().unwrap().bound
    }

    /// Identifier of the bound engine source.
    pub fn id(&self) -> Result<String, BridgeError> {
        if !self.is_available() {
            return Err(BridgeError::InstanceUnavailable("source"));
        }
        Ok(self.source_id.clone())
    }

    /// Returns the authoritative in-memory copy. Never re-queries the
    /// engine, so reads are immune to asynchronous engine internals.
    pub fn read(&self) -> FeatureCollection {
        self.state.lock().unwrap().data.clone()
    }

    /// Overwrites the authoritative copy and pushes it to the engine
    /// verbatim.
    pub fn replace(&self, collection: FeatureCollection) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        if !state.bound {
            return Err(BridgeError::InstanceUnavailable("source"));
        }
        state.data = collection;
        self.engine.set_source_data(&self.source_id, &state.data)
    }

    /// Applies one update batch: remove, then update, then add.
    ///
    /// The authoritative copy is cloned, the clone is mutated, and only then
    /// swapped in, so a failure part-way never leaves a half-applied state.
    /// The engine always receives one full snapshot filtered down to
    /// renderable features; invalid features stay in the authoritative copy
    /// so a later batch can correct them.
    pub fn reconcile(&self, batch: &UpdateBatch) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        if !state.bound {
            log::debug!("reconcile on unbound source {}, ignoring", self.source_id);
            return Ok(());
        }

        let mut working = state.data.clone();

        for remove_id in &batch.remove {
            let found = working
                .features
                .iter()
                .position(|feature| feature_identity(feature) == Some(remove_id));
            if let Some(index) = found {
                working.features.remove(index);
            }
        }

        // Update and add share update-or-insert semantics; only the lane
        // order differs.
        upsert_all(&mut working, &batch.update, "update");
        upsert_all(&mut working, &batch.add, "add");

        state.data = working;

        let snapshot = FeatureCollection {
            bbox: None,
            features: state
                .data
                .features
                .iter()
                .filter(|feature| is_renderable(feature))
                .cloned()
                .collect(),
            foreign_members: None,
        };
        self.engine.set_source_data(&self.source_id, &snapshot)
    }

    /// Removes the engine source. When `remove_dependent_layers` is set,
    /// every style layer referencing this source is removed first. No-op on
    /// an unbound store; safe to call twice.
    pub fn destroy(&self, remove_dependent_layers: bool) {
        let mut state = self.state.lock().unwrap();
        if !state.bound {
            return;
        }
        if remove_dependent_layers {
            for layer in self.engine.style_layers() {
                if layer.source == self.source_id {
                    self.engine.remove_layer(&layer.id);
                }
            }
        }
        self.engine.remove_source(&self.source_id);
        state.bound = false;
    }
}

/// Update-or-insert each candidate keyed on the identity property. Entries
/// lacking the identity property are skipped with a warning.
fn upsert_all(working: &mut FeatureCollection, candidates: &[Feature], lane: &str) {
    for candidate in candidates {
        let Some(identity) = feature_identity(candidate) else {
            log::warn!(
                "skipping {lane} entry without the {FEATURE_ID_PROPERTY} property"
            );
            continue;
        };
        let existing = working
            .features
            .iter()
            .position(|feature| feature_identity(feature) == Some(identity));
        match existing {
            Some(index) => working.features[index] = candidate.clone(),
            None => working.features.push(candidate.clone()),
        }
    }
}
