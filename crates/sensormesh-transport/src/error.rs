//! Transport layer error types.

use sensormesh_core::MessageError;
use sensormesh_signing::SigningError;

use crate::status::TransportState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RadioError {
    #[error("no acknowledgement from next hop")]
    NoAck,

    #[error("radio unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("plaintext too large for a frame: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("malformed frame: {len} bytes")]
    Malformed { len: usize },

    #[error("frame authentication failed")]
    AuthenticationFailed,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("retries exhausted in {state}")]
    RetriesExhausted { state: TransportState },

    #[error("request refused by gateway in {state}")]
    Refused { state: TransportState },

    #[error("transport is not operational")]
    NotOperational,

    #[error("signing is not enabled")]
    SigningDisabled,

    #[error("a signed send is already waiting for a nonce")]
    SendPending,

    #[error("send to {to} failed: {source}")]
    SendFailed {
        to: sensormesh_core::NodeId,
        #[source]
        source: RadioError,
    },

    #[error("message error: {0}")]
    Message(#[from] MessageError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}
