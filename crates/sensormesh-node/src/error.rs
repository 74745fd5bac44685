//! Error types for the node runtime.

use sensormesh_signing::SigningError;
use sensormesh_transport::TransportError;

/// Errors that can occur while configuring or starting a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("signing error: {0}")]
    Signing(#[from] SigningError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
