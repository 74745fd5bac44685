//! AES-128-EAX authenticated encryption.
//!
//! The IV and tag are handled separately from the ciphertext; the radio
//! framing layer decides how they are laid out on the wire.

extern crate alloc;
use alloc::vec::Vec;

use aes::Aes128;
use eax::Eax;
use eax::aead::{AeadInPlace, KeyInit};

use crate::CryptoError;

/// Pre-shared link key size in bytes.
pub const PSK_SIZE: usize = 16;

/// EAX nonce (IV) size in bytes.
pub const IV_SIZE: usize = 16;

/// EAX tag size in bytes.
pub const TAG_SIZE: usize = 16;

type Aes128Eax = Eax<Aes128>;

/// Encrypt `plaintext` under `key`/`iv`, authenticating `associated_data`.
///
/// Returns `(ciphertext, tag)`; the ciphertext has the same length as the
/// plaintext.
#[must_use]
pub fn aead_encrypt(
    key: &[u8; PSK_SIZE],
    iv: &[u8; IV_SIZE],
    associated_data: &[u8],
    plaintext: &[u8],
) -> (Vec<u8>, [u8; TAG_SIZE]) {
    let cipher = Aes128Eax::new(key.into());
    let mut buf = plaintext.to_vec();
    // EAX has no practical plaintext length limit.
    let tag = cipher
        .encrypt_in_place_detached(iv.into(), associated_data, &mut buf)
        .expect("EAX encryption of a bounded buffer never fails");
    (buf, tag.into())
}

/// Verify `tag` and decrypt `ciphertext` under `key`/`iv` and `associated_data`.
///
/// # Errors
///
/// Returns [`CryptoError::AuthenticationFailed`] if the tag does not match.
/// No plaintext is returned in that case.
pub fn aead_decrypt(
    key: &[u8; PSK_SIZE],
    iv: &[u8; IV_SIZE],
    associated_data: &[u8],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128Eax::new(key.into());
    let mut buf = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(iv.into(), associated_data, &mut buf, tag.into()) {
        Ok(()) => Ok(buf),
        Err(_) => {
            buf.fill(0);
            Err(CryptoError::AuthenticationFailed)
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn aead_roundtrip(
            key in any::<[u8; 16]>(),
            iv in any::<[u8; 16]>(),
            ad in any::<u8>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..=32),
        ) {
            let (ct, tag) = aead_encrypt(&key, &iv, &[ad], &plaintext);
            let recovered = aead_decrypt(&key, &iv, &[ad], &ct, &tag).unwrap();
            prop_assert_eq!(recovered, plaintext);
        }

        #[test]
        fn aead_any_flipped_byte_rejects(
            key in any::<[u8; 16]>(),
            iv in any::<[u8; 16]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 1..=32),
            flip_tag in any::<bool>(),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let (mut ct, mut tag) = aead_encrypt(&key, &iv, &[3], &plaintext);
            if flip_tag {
                tag[index.index(TAG_SIZE)] ^= 1 << bit;
            } else {
                let i = index.index(ct.len());
                ct[i] ^= 1 << bit;
            }
            prop_assert_eq!(
                aead_decrypt(&key, &iv, &[3], &ct, &tag),
                Err(CryptoError::AuthenticationFailed)
            );
        }
    }
}
