//! Cryptographic primitive adapter.
//!
//! [`CryptoAdapter`] owns the coprocessor exclusively. Every hardware command
//! runs inside a [`CryptoSession`], which wakes the device on acquisition and
//! releases it (sleep, or idle when asked) when dropped, so early returns on
//! error paths leave the device in a defined power state.

extern crate alloc;
use alloc::vec::Vec;

use zeroize::Zeroize;

use crate::CryptoError;
use crate::aead::{self, IV_SIZE, PSK_SIZE, TAG_SIZE};
use crate::device::{CryptoDevice, SERIAL_SIZE};
use crate::sha::pad_single_block;

/// Power state the device is returned to when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Release {
    #[default]
    Sleep,
    /// Keep volatile device state; used when another command follows shortly.
    Idle,
}

pub struct CryptoAdapter<D> {
    device: D,
}

impl<D: CryptoDevice> CryptoAdapter<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Wake the device and open a session.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Unavailable`] if the device does not wake.
    pub fn session(&mut self) -> Result<CryptoSession<'_, D>, CryptoError> {
        self.device.wake()?;
        Ok(CryptoSession {
            device: &mut self.device,
            release: Release::Sleep,
        })
    }

    /// One-shot single-block SHA-256 in its own session.
    pub fn sha256(&mut self, data: &[u8]) -> Result<[u8; 32], CryptoError> {
        self.session()?.sha256(data)
    }

    /// One-shot coprocessor HMAC in its own session.
    pub fn hmac(&mut self, nonce: &[u8; 32], data: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
        self.session()?.hmac(nonce, data)
    }

    /// AES-128-EAX encryption; runs in software, no session needed.
    pub fn aead_encrypt(
        &self,
        key: &[u8; PSK_SIZE],
        iv: &[u8; IV_SIZE],
        associated_data: &[u8],
        plaintext: &[u8],
    ) -> (Vec<u8>, [u8; TAG_SIZE]) {
        aead::aead_encrypt(key, iv, associated_data, plaintext)
    }

    /// AES-128-EAX decryption with tag verification.
    pub fn aead_decrypt(
        &self,
        key: &[u8; PSK_SIZE],
        iv: &[u8; IV_SIZE],
        associated_data: &[u8],
        ciphertext: &[u8],
        tag: &[u8; TAG_SIZE],
    ) -> Result<Vec<u8>, CryptoError> {
        aead::aead_decrypt(key, iv, associated_data, ciphertext, tag)
    }
}

/// An awake coprocessor, borrowed exclusively for a sequence of commands.
pub struct CryptoSession<'a, D: CryptoDevice> {
    device: &'a mut D,
    release: Release,
}

impl<D: CryptoDevice> CryptoSession<'_, D> {
    /// Release to idle instead of sleep when the session ends.
    pub fn release_to_idle(&mut self) {
        self.release = Release::Idle;
    }

    pub fn release(&self) -> Release {
        self.release
    }

    /// Pad `data` to one block and hash it on the device.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidLength`] if `data` exceeds one block,
    /// [`CryptoError::Unavailable`] on a device failure.
    pub fn sha256(&mut self, data: &[u8]) -> Result<[u8; 32], CryptoError> {
        let mut block = pad_single_block(data)?;
        let digest = self.device.sha256_block(&block);
        block.zeroize();
        digest
    }

    pub fn hmac(&mut self, nonce: &[u8; 32], data: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
        self.device.hmac(nonce, data)
    }

    pub fn random(&mut self) -> Result<[u8; 32], CryptoError> {
        self.device.random()
    }

    pub fn serial(&mut self) -> Result<[u8; SERIAL_SIZE], CryptoError> {
        self.device.serial()
    }

    pub fn is_personalized(&mut self) -> Result<bool, CryptoError> {
        self.device.is_personalized()
    }
}

impl<D: CryptoDevice> Drop for CryptoSession<'_, D> {
    fn drop(&mut self) {
        match self.release {
            Release::Sleep => self.device.sleep(),
            Release::Idle => self.device.idle(),
        }
    }
}
