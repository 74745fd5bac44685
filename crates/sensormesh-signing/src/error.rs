//! Signing error types.
//!
//! [`SigningError`] covers failures on the signing side. [`Rejection`] is the
//! diagnostic reason a verification did not accept; callers outside this
//! crate only ever see accepted or not.

use sensormesh_core::NodeId;
use sensormesh_crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("payload too large to sign: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("no signer nonce available")]
    MissingNonce,

    #[error("a verification is already pending")]
    VerificationPending,

    #[error("signer not initialized")]
    NotInitialized,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no verification ongoing")]
    NotOngoing,

    #[error("verification window expired")]
    Expired,

    #[error("verification issued to {expected}, message from {actual}")]
    UnexpectedSender { expected: NodeId, actual: NodeId },

    #[error("message is not signed")]
    NotSigned,

    #[error("no room for a signature")]
    Malformed,

    #[error("unknown signing identifier: {0:#04x}")]
    BadIdentifier(u8),

    #[error("sender {0} is not whitelisted")]
    NotWhitelisted(NodeId),

    #[error("signature mismatch")]
    Mismatch,

    #[error("crypto coprocessor unavailable")]
    CryptoUnavailable,
}
