//! HMAC-SHA256 as computed by the software coprocessor.
//!
//! The coprocessor takes a 32-byte nonce and a 32-byte data block and MACs
//! their concatenation under its slot secret. This module holds the software
//! rendition of that command.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the coprocessor HMAC: `HMAC-SHA256(secret, nonce || data)`.
pub fn nonce_hmac(secret: &[u8; 32], nonce: &[u8; 32], data: &[u8; 32]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC-SHA256 accepts keys of any length");
    mac.update(nonce);
    mac.update(data);
    mac.finalize().into_bytes().into()
}
