//! Test vector types for frames.json
//!
//! AES-128-EAX secure frames with the destination address as associated data.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FrameVector {
    pub description: String,
    pub key: String,
    pub iv: String,
    pub destination: u8,
    pub plaintext: String,
    /// Plaintext extended to its bucket with the padding bytes used to build the vector.
    pub padded_plaintext: String,
    pub ciphertext: String,
    pub tag: String,
    /// `iv || ciphertext || tag`
    pub frame: String,
}

#[derive(Debug, Deserialize)]
pub struct FramesVectors {
    pub description: String,
    pub vectors: Vec<FrameVector>,
}

pub fn load() -> FramesVectors {
    let json = include_str!("../../../.test-vectors/frames.json");
    serde_json::from_str(json).expect("Failed to deserialize frames.json")
}
