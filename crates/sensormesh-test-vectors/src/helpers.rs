//! Shared hex-decoding test helpers. Enable the `helpers` feature to use them.

/// Decode a hex string into a `Vec<u8>`.
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    hex::decode(hex).expect("invalid hex")
}

/// Decode a hex string into a `[u8; 9]` device serial.
pub fn hex_to_serial(hex: &str) -> [u8; 9] {
    let bytes = hex::decode(hex).expect("invalid hex");
    bytes.try_into().expect("must be 9 bytes")
}

/// Decode a hex string into a `[u8; 16]`.
pub fn hex_to_16(hex: &str) -> [u8; 16] {
    let bytes = hex::decode(hex).expect("invalid hex");
    bytes.try_into().expect("must be 16 bytes")
}

/// Decode a hex string into a `[u8; 32]`.
pub fn hex_to_32(hex: &str) -> [u8; 32] {
    let bytes = hex::decode(hex).expect("invalid hex");
    bytes.try_into().expect("must be 32 bytes")
}
