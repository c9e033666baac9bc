//! Stateful wrapper around one rendering layer.

use std::sync::Arc;

use crate::engine::{LayerInfo, LayerSpec, MapEngine};
use crate::error::BridgeError;

/// Binds a rendering layer to its source by identifier back-reference.
///
/// The handle may be null when a lookup found nothing or after `destroy`;
/// accessors then fail with [`BridgeError::InstanceUnavailable`].
pub struct LayerHandle {
    engine: Arc<dyn MapEngine>,
    instance: Option<LayerInfo>,
}

impl LayerHandle {
    /// Creates a fresh engine layer, then re-fetches it to confirm
    /// materialization.
    pub fn create(engine: Arc<dyn MapEngine>, spec: &LayerSpec) -> Self {
        engine.add_layer(spec);
        let instance = engine.layer(&spec.id);
        Self { engine, instance }
    }

    /// Looks up an existing engine layer; absent yields a null handle.
    pub fn attach(engine: Arc<dyn MapEngine>, layer_id: &str) -> Self {
        let instance = engine.layer(layer_id);
        Self { engine, instance }
    }

    pub fn is_available(&self) -> bool {
        self.instance.is_some()
    }

    /// Layer identifier.
    pub fn id(&self) -> Result<&str, BridgeError> {
        self.instance
            .as_ref()
            .map(|info| info.id.as_str())
            .ok_or(BridgeError::InstanceUnavailable("layer"))
    }

    /// Identifier of the source this layer draws from.
    pub fn source(&self) -> Result<&str, BridgeError> {
        self.instance
            .as_ref()
            .map(|info| info.source.as_str())
            .ok_or(BridgeError::InstanceUnavailable("layer"))
    }

    /// Removes the engine layer if present and nulls the handle. Safe to
    /// call twice.
    pub fn destroy(&mut self) {
        if let Some(info) = self.instance.take() {
            self.engine.remove_layer(&info.id);
        }
    }
}
