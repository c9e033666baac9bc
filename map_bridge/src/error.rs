//! Error types shared across the bridge.

use thiserror::Error;

/// Errors surfaced by the adapter, handles and stores.
///
/// Malformed features are deliberately not represented here: reconciliation
/// and query translation skip them with a warning instead of failing.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The underlying engine object was never created or was already removed.
    #[error("{0} instance is not available")]
    InstanceUnavailable(&'static str),

    /// Malformed call to event (de)registration.
    #[error("invalid arguments: {0}")]
    InvalidArguments(&'static str),

    /// Failure reported by the rendering engine, propagated unchanged.
    #[error("engine error: {0}")]
    Engine(String),
}
