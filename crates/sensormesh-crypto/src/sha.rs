//! Single-block SHA-256.
//!
//! The coprocessor hashes exactly one 64-byte block per command, so callers
//! pad the message themselves: data, `0x80`, zero fill, and the message length
//! in bits (big-endian) in the last two bytes. Messages longer than
//! [`MAX_SINGLE_BLOCK_INPUT`] do not fit and are rejected.

use sha2::Digest;
use sha2::digest::generic_array::GenericArray;

use crate::CryptoError;

/// Size of one SHA-256 message block.
pub const SHA_BLOCK_SIZE: usize = 64;

/// Largest input that still leaves room for the `0x80` marker and length.
pub const MAX_SINGLE_BLOCK_INPUT: usize = SHA_BLOCK_SIZE - 9;

/// SHA-256 initial hash value (FIPS 180-4, 5.3.3).
const SHA256_IV: [u32; 8] = [
    0x6a09_e667,
    0xbb67_ae85,
    0x3c6e_f372,
    0xa54f_f53a,
    0x510e_527f,
    0x9b05_688c,
    0x1f83_d9ab,
    0x5be0_cd19,
];

/// Pad `data` into a single SHA-256 block.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidLength`] if `data` is longer than
/// [`MAX_SINGLE_BLOCK_INPUT`].
pub fn pad_single_block(data: &[u8]) -> Result<[u8; SHA_BLOCK_SIZE], CryptoError> {
    if data.len() > MAX_SINGLE_BLOCK_INPUT {
        return Err(CryptoError::InvalidLength {
            reason: "single-block digest input exceeds 55 bytes",
        });
    }
    let mut block = [0u8; SHA_BLOCK_SIZE];
    block[..data.len()].copy_from_slice(data);
    block[data.len()] = 0x80;
    let bits = (data.len() as u16) << 3;
    block[SHA_BLOCK_SIZE - 2..].copy_from_slice(&bits.to_be_bytes());
    Ok(block)
}

/// Run the SHA-256 compression function over one pre-padded block, starting
/// from the standard initial hash value.
#[must_use]
pub fn compress_block(block: &[u8; SHA_BLOCK_SIZE]) -> [u8; 32] {
    let mut state = SHA256_IV;
    sha2::compress256(&mut state, &[GenericArray::clone_from_slice(block)]);
    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// Plain software SHA-256, used for cross-checks and by host-side tooling.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha2::Sha256::digest(data).into()
}
