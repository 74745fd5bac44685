//! Test vector types for signing.json
//!
//! HMAC chain, whitelist salting, signed message, nonce whitening and
//! single-block SHA-256 vectors. The coprocessor secret is shared by all of
//! them.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HmacChainVector {
    pub description: String,
    pub nonce: String,
    pub region: String,
    /// HMAC after each 32-byte chunk; the last one is the signature.
    pub chunk_hmacs: Vec<String>,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct SaltedVector {
    pub description: String,
    pub base_hmac: String,
    pub sender: u8,
    pub serial: String,
    pub salted: String,
}

#[derive(Debug, Deserialize)]
pub struct SignedMessageVector {
    pub description: String,
    pub last: u8,
    pub sender: u8,
    pub destination: u8,
    pub command: u8,
    pub message_type: u8,
    pub sensor: u8,
    pub payload: String,
    /// Full 32-byte nonce as seen by both sides (wire prefix plus sentinel fill).
    pub nonce: String,
    /// Sender serial when the signature is whitelist-salted.
    pub serial: Option<String>,
    /// Header as transmitted, signed flag set.
    pub header: String,
    /// Signature bytes as transmitted after the payload.
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct NonceWhiteningVector {
    pub description: String,
    pub random: String,
    pub now_ms: u32,
    pub wire: String,
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
pub struct Sha256SingleBlockVector {
    pub description: String,
    pub input: String,
    pub block: String,
    pub digest: String,
}

#[derive(Debug, Deserialize)]
pub struct SigningVectors {
    pub description: String,
    pub secret: String,
    pub signing_identifier: u8,
    pub purge_byte: u8,
    pub max_payload: usize,
    pub hmac_chain: Vec<HmacChainVector>,
    pub salted: Vec<SaltedVector>,
    pub messages: Vec<SignedMessageVector>,
    pub nonce_whitening: Vec<NonceWhiteningVector>,
    pub sha256_single_block: Vec<Sha256SingleBlockVector>,
}

pub fn load() -> SigningVectors {
    let json = include_str!("../../../.test-vectors/signing.json");
    serde_json::from_str(json).expect("Failed to deserialize signing.json")
}
