//! Draggable DOM overlay anchored to a geographic coordinate.

use std::sync::Arc;

use crate::engine::{LngLat, MapEngine, MarkerId, MarkerOptions};

/// Fail-soft marker handle: mutating calls on an absent overlay are no-ops
/// and `position` falls back to `(0, 0)` rather than failing. The marker is
/// purely cosmetic, so nothing here returns an error.
pub struct DomMarker {
    engine: Arc<dyn MapEngine>,
    marker: Option<MarkerId>,
}

impl DomMarker {
    pub fn new(engine: Arc<dyn MapEngine>, options: &MarkerOptions, position: LngLat) -> Self {
        let marker = Some(engine.add_marker(options, position));
        Self { engine, marker }
    }

    /// Identifier of the overlay element, when the overlay exists.
    pub fn element(&self) -> Option<String> {
        self.engine.marker_element(self.marker?)
    }

    pub fn set_position(&self, position: LngLat) {
        if let Some(marker) = self.marker {
            self.engine.set_marker_position(marker, position);
        }
    }

    /// Current anchor coordinate, or the `(0, 0)` default when the overlay
    /// was never materialized.
    pub fn position(&self) -> LngLat {
        self.marker
            .and_then(|marker| self.engine.marker_position(marker))
            .unwrap_or_else(|| LngLat::new(0.0, 0.0))
    }

    /// Removes the overlay. Safe to call twice.
    pub fn destroy(&mut self) {
        if let Some(marker) = self.marker.take() {
            self.engine.remove_marker(marker);
        }
    }
}
