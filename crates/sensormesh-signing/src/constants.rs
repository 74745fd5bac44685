//! Signing backend constants.

use sensormesh_core::constants::MAX_PAYLOAD;

/// First signature byte; identifies the HMAC-SHA256 coprocessor backend.
pub const SIGNING_IDENTIFIER: u8 = 0x01;

/// Fill byte for purged nonce buffers. Non-zero so a purged buffer is
/// distinguishable from one that was never written.
pub const PURGE_BYTE: u8 = 0xAA;

pub const NONCE_SIZE: usize = 32;
pub const HMAC_SIZE: usize = 32;

/// Bytes of the HMAC chain input consumed per coprocessor call.
pub const CHUNK_SIZE: usize = 32;

/// Nonce bytes that fit in one message; the rest is sentinel-filled on both sides.
pub const NONCE_WIRE_SIZE: usize = if MAX_PAYLOAD < NONCE_SIZE {
    MAX_PAYLOAD
} else {
    NONCE_SIZE
};

/// Largest payload that still leaves room for a signature.
pub const MAX_SIGNABLE_PAYLOAD: usize = MAX_PAYLOAD - 2;

pub const VERIFICATION_TIMEOUT_MS: u32 = 5000;
