//! Secure frame codec (radio-layer encryption).
//!
//! ```text
//! IV (16) || AES-128-EAX ciphertext (16 or 32) || tag (16)
//! ```
//!
//! The plaintext is padded with random bytes to one of two bucket sizes so
//! frame length only reveals "short" or "long". The single-byte radio
//! destination is authenticated as associated data; the receiver uses its own
//! address (or the broadcast address), so a frame replayed to a different
//! node fails its tag.

use rand::RngCore;
use sensormesh_core::NodeId;
use sensormesh_crypto::aead::{IV_SIZE, PSK_SIZE, TAG_SIZE, aead_decrypt, aead_encrypt};
use zeroize::Zeroize;

use crate::constants::RX_WIPE_BYTE;
use crate::error::FrameError;

pub const SMALL_BUCKET: usize = 16;
pub const LARGE_BUCKET: usize = 32;

/// Largest plaintext a frame carries.
pub const MAX_FRAME_PLAINTEXT: usize = LARGE_BUCKET;

pub const MAX_FRAME_LEN: usize = IV_SIZE + LARGE_BUCKET + TAG_SIZE;

/// Padded plaintext length for a plaintext of `len` bytes.
#[must_use]
pub fn bucket_len(len: usize) -> Option<usize> {
    match len {
        0..=SMALL_BUCKET => Some(SMALL_BUCKET),
        _ if len <= LARGE_BUCKET => Some(LARGE_BUCKET),
        _ => None,
    }
}

/// Encrypt an already bucket-padded plaintext into a frame.
///
/// # Errors
///
/// [`FrameError::TooLarge`] if `padded` is not a bucket length.
pub fn seal_frame(
    key: &[u8; PSK_SIZE],
    iv: &[u8; IV_SIZE],
    destination: NodeId,
    padded: &[u8],
) -> Result<Vec<u8>, FrameError> {
    if padded.len() != SMALL_BUCKET && padded.len() != LARGE_BUCKET {
        return Err(FrameError::TooLarge {
            len: padded.len(),
            max: MAX_FRAME_PLAINTEXT,
        });
    }
    let (ciphertext, tag) = aead_encrypt(key, iv, &[destination.get()], padded);
    let mut frame = Vec::with_capacity(IV_SIZE + ciphertext.len() + TAG_SIZE);
    frame.extend_from_slice(iv);
    frame.extend_from_slice(&ciphertext);
    frame.extend_from_slice(&tag);
    Ok(frame)
}

/// Authenticate and decrypt a frame addressed to `local`.
///
/// Returns the full bucket-length plaintext; the message layer knows where
/// its content ends.
///
/// # Errors
///
/// [`FrameError::Malformed`] for a frame of the wrong size,
/// [`FrameError::AuthenticationFailed`] if the tag does not verify.
pub fn open_frame(
    key: &[u8; PSK_SIZE],
    local: NodeId,
    frame: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let body = frame.len().checked_sub(IV_SIZE + TAG_SIZE);
    if !matches!(body, Some(SMALL_BUCKET) | Some(LARGE_BUCKET)) {
        return Err(FrameError::Malformed { len: frame.len() });
    }

    let (iv, rest) = frame.split_at(IV_SIZE);
    let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);
    let mut iv_bytes = [0u8; IV_SIZE];
    iv_bytes.copy_from_slice(iv);
    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag);

    aead_decrypt(key, &iv_bytes, &[local.get()], ciphertext, &tag_bytes)
        .map_err(|_| FrameError::AuthenticationFailed)
}

/// Frame codec holding the pre-shared key, the IV/padding source and the
/// receive scratch buffer.
pub struct FrameCodec<G> {
    key: [u8; PSK_SIZE],
    rng: G,
    scratch: [u8; MAX_FRAME_PLAINTEXT],
}

impl<G: RngCore> FrameCodec<G> {
    pub fn new(key: [u8; PSK_SIZE], rng: G) -> Self {
        Self {
            key,
            rng,
            scratch: [RX_WIPE_BYTE; MAX_FRAME_PLAINTEXT],
        }
    }

    /// Pad `plaintext` to its bucket with random bytes, draw a fresh IV and
    /// seal the frame for `destination`.
    pub fn seal(&mut self, destination: NodeId, plaintext: &[u8]) -> Result<Vec<u8>, FrameError> {
        let bucket = bucket_len(plaintext.len()).ok_or(FrameError::TooLarge {
            len: plaintext.len(),
            max: MAX_FRAME_PLAINTEXT,
        })?;

        let mut iv = [0u8; IV_SIZE];
        self.rng.fill_bytes(&mut iv);
        let mut padded = [0u8; MAX_FRAME_PLAINTEXT];
        self.rng.fill_bytes(&mut padded[..bucket]);
        padded[..plaintext.len()].copy_from_slice(plaintext);

        let frame = seal_frame(&self.key, &iv, destination, &padded[..bucket]);
        padded.zeroize();
        tracing::trace!(to = destination.get(), len = plaintext.len(), bucket, "frame: sealed");
        frame
    }

    /// Open a received frame addressed to `local` or to the broadcast address.
    ///
    /// On failure the scratch buffer is wiped with [`RX_WIPE_BYTE`] and no
    /// plaintext is returned; callers treat that as a zero-length receive.
    pub fn open(&mut self, local: NodeId, frame: &[u8]) -> Result<&[u8], FrameError> {
        let opened = match open_frame(&self.key, local, frame) {
            Err(FrameError::AuthenticationFailed) if local != NodeId::BROADCAST => {
                open_frame(&self.key, NodeId::BROADCAST, frame)
            }
            other => other,
        };
        match opened {
            Ok(mut plaintext) => {
                let n = plaintext.len();
                self.scratch[..n].copy_from_slice(&plaintext);
                plaintext.zeroize();
                Ok(&self.scratch[..n])
            }
            Err(e) => {
                self.scratch.fill(RX_WIPE_BYTE);
                tracing::debug!(len = frame.len(), error = %e, "frame: rejected");
                Err(e)
            }
        }
    }

    /// Receive scratch buffer as last left by [`FrameCodec::open`].
    pub fn scratch(&self) -> &[u8; MAX_FRAME_PLAINTEXT] {
        &self.scratch
    }
}

impl<G> Drop for FrameCodec<G> {
    fn drop(&mut self) {
        self.key.zeroize();
        self.scratch.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sensormesh_test_vectors::helpers::{hex_to_16, hex_to_bytes};

    fn codec() -> FrameCodec<StdRng> {
        FrameCodec::new([0x0F; PSK_SIZE], StdRng::seed_from_u64(11))
    }

    #[test]
    fn test_bucket_len() {
        assert_eq!(bucket_len(0), Some(16));
        assert_eq!(bucket_len(16), Some(16));
        assert_eq!(bucket_len(17), Some(32));
        assert_eq!(bucket_len(32), Some(32));
        assert_eq!(bucket_len(33), None);
    }

    #[test]
    fn test_frame_vectors() {
        let vectors = sensormesh_test_vectors::frames::load();
        for v in &vectors.vectors {
            let key = hex_to_16(&v.key);
            let iv = hex_to_16(&v.iv);
            let padded = hex_to_bytes(&v.padded_plaintext);
            let frame = seal_frame(&key, &iv, NodeId(v.destination), &padded).unwrap();
            assert_eq!(hex::encode(&frame), v.frame, "seal mismatch: {}", v.description);
            assert_eq!(
                hex::encode(&frame[IV_SIZE..frame.len() - TAG_SIZE]),
                v.ciphertext
            );
            assert_eq!(hex::encode(&frame[frame.len() - TAG_SIZE..]), v.tag);

            let opened = open_frame(&key, NodeId(v.destination), &frame).unwrap();
            assert_eq!(opened, padded, "open mismatch: {}", v.description);
            let plaintext = hex_to_bytes(&v.plaintext);
            assert_eq!(&opened[..plaintext.len()], plaintext.as_slice());
        }
    }

    #[test]
    fn test_vector_frame_rejected_at_other_address() {
        let vectors = sensormesh_test_vectors::frames::load();
        let v = &vectors.vectors[0];
        let frame = hex_to_bytes(&v.frame);
        let other = NodeId(v.destination.wrapping_add(1));
        assert_eq!(
            open_frame(&hex_to_16(&v.key), other, &frame),
            Err(FrameError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let mut codec = codec();
        let frame = codec.seal(NodeId(4), b"sensor reading").unwrap();
        assert_eq!(frame.len(), IV_SIZE + SMALL_BUCKET + TAG_SIZE);
        let opened = codec.open(NodeId(4), &frame).unwrap();
        assert_eq!(&opened[..14], b"sensor reading");
    }

    #[test]
    fn test_long_plaintext_uses_large_bucket() {
        let mut codec = codec();
        let frame = codec.seal(NodeId(0), &[0x42; 17]).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_seal_rejects_oversize() {
        let mut codec = codec();
        assert_eq!(
            codec.seal(NodeId(0), &[0; 33]),
            Err(FrameError::TooLarge { len: 33, max: 32 })
        );
    }

    #[test]
    fn test_fresh_iv_per_frame() {
        let mut codec = codec();
        let a = codec.seal(NodeId(1), b"same").unwrap();
        let b = codec.seal(NodeId(1), b"same").unwrap();
        assert_ne!(a[..IV_SIZE], b[..IV_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_failed_open_wipes_scratch() {
        let mut codec = codec();
        let frame = codec.seal(NodeId(2), b"secret").unwrap();
        codec.open(NodeId(2), &frame).unwrap();
        assert_ne!(codec.scratch(), &[RX_WIPE_BYTE; MAX_FRAME_PLAINTEXT]);

        let mut tampered = frame.clone();
        tampered[IV_SIZE] ^= 0x01;
        assert_eq!(
            codec.open(NodeId(2), &tampered),
            Err(FrameError::AuthenticationFailed)
        );
        assert_eq!(codec.scratch(), &[RX_WIPE_BYTE; MAX_FRAME_PLAINTEXT]);
    }

    #[test]
    fn test_broadcast_frame_opens_at_any_address() {
        let mut codec = codec();
        let frame = codec.seal(NodeId::BROADCAST, b"who is there").unwrap();
        assert!(codec.open(NodeId(17), &frame).is_ok());

        let unicast = codec.seal(NodeId(3), b"only for 3").unwrap();
        assert_eq!(
            codec.open(NodeId(17), &unicast),
            Err(FrameError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_open_rejects_bad_lengths() {
        let mut codec = codec();
        for len in [0usize, 16, 31, 47, 49, 63, 65, 80] {
            assert_eq!(
                codec.open(NodeId(0), &vec![0u8; len]),
                Err(FrameError::Malformed { len })
            );
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn roundtrip_returns_plaintext_prefix(
            plaintext in proptest::collection::vec(any::<u8>(), 0..=32),
            to in any::<u8>(),
            seed in any::<u64>(),
        ) {
            let mut codec = FrameCodec::new([0x21; PSK_SIZE], StdRng::seed_from_u64(seed));
            let frame = codec.seal(NodeId(to), &plaintext).unwrap();
            let opened = codec.open(NodeId(to), &frame).unwrap();
            prop_assert_eq!(&opened[..plaintext.len()], plaintext.as_slice());
        }

        #[test]
        fn any_flipped_byte_is_rejected(
            plaintext in proptest::collection::vec(any::<u8>(), 0..=32),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut codec = FrameCodec::new([0x21; PSK_SIZE], StdRng::seed_from_u64(5));
            let mut frame = codec.seal(NodeId(1), &plaintext).unwrap();
            let i = index.index(frame.len());
            frame[i] ^= flip;
            prop_assert!(codec.open(NodeId(1), &frame).is_err());
            prop_assert_eq!(codec.scratch(), &[RX_WIPE_BYTE; MAX_FRAME_PLAINTEXT]);
        }
    }
}
