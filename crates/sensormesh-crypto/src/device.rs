//! Cryptographic coprocessor contract.
//!
//! A [`CryptoDevice`] is the hardware boundary: it holds the HMAC secret in a
//! readout-protected slot and only ever hands back results. Commands are only
//! accepted while the device is awake; idle keeps volatile state (the loaded
//! nonce) while sleep clears it.

use rand::RngCore;
use zeroize::Zeroize;

use crate::CryptoError;
use crate::hmac::nonce_hmac;
use crate::sha::{SHA_BLOCK_SIZE, compress_block};

/// Size of the device serial number.
pub const SERIAL_SIZE: usize = 9;

/// Coprocessor power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Sleep,
    Idle,
    Awake,
}

/// Narrow command set of the cryptographic coprocessor.
pub trait CryptoDevice {
    /// Wake the device. Also resets its watchdog when already awake.
    fn wake(&mut self) -> Result<(), CryptoError>;

    /// Enter idle; volatile state is kept.
    fn idle(&mut self);

    /// Enter sleep; volatile state is lost.
    fn sleep(&mut self);

    /// Whether the configuration zone is locked (device personalized).
    fn is_personalized(&mut self) -> Result<bool, CryptoError>;

    /// Read the 9-byte device serial number.
    fn serial(&mut self) -> Result<[u8; SERIAL_SIZE], CryptoError>;

    /// Draw 32 bytes from the device RNG.
    fn random(&mut self) -> Result<[u8; 32], CryptoError>;

    /// Hash one pre-padded SHA-256 block.
    fn sha256_block(&mut self, block: &[u8; SHA_BLOCK_SIZE]) -> Result<[u8; 32], CryptoError>;

    /// HMAC `data` with the slot secret, seeded by `nonce`.
    fn hmac(&mut self, nonce: &[u8; 32], data: &[u8; 32]) -> Result<[u8; 32], CryptoError>;
}

/// Software coprocessor.
///
/// Mirrors the command semantics of the hardware part (wake requirement,
/// personalization lock, fixed serial) so hosts and tests can run the full
/// signing path. The secret is wiped on drop.
pub struct SoftCoprocessor<R> {
    secret: [u8; 32],
    serial: [u8; SERIAL_SIZE],
    personalized: bool,
    faulted: bool,
    state: PowerState,
    rng: R,
}

impl<R: RngCore> SoftCoprocessor<R> {
    pub fn new(secret: [u8; 32], serial: [u8; SERIAL_SIZE], rng: R) -> Self {
        Self {
            secret,
            serial,
            personalized: true,
            faulted: false,
            state: PowerState::Sleep,
            rng,
        }
    }

    /// A device fresh from the factory: configuration zone not yet locked.
    pub fn unpersonalized(serial: [u8; SERIAL_SIZE], rng: R) -> Self {
        let mut device = Self::new([0u8; 32], serial, rng);
        device.personalized = false;
        device
    }

    pub fn power_state(&self) -> PowerState {
        self.state
    }

    /// Simulate a device that stops answering: every wake fails until cleared.
    pub fn set_faulted(&mut self, faulted: bool) {
        self.faulted = faulted;
        if faulted {
            self.state = PowerState::Sleep;
        }
    }

    fn require_awake(&self) -> Result<(), CryptoError> {
        if self.state == PowerState::Awake {
            Ok(())
        } else {
            Err(CryptoError::Unavailable)
        }
    }
}

impl<R: RngCore> CryptoDevice for SoftCoprocessor<R> {
    fn wake(&mut self) -> Result<(), CryptoError> {
        if self.faulted {
            return Err(CryptoError::Unavailable);
        }
        self.state = PowerState::Awake;
        Ok(())
    }

    fn idle(&mut self) {
        self.state = PowerState::Idle;
    }

    fn sleep(&mut self) {
        self.state = PowerState::Sleep;
    }

    fn is_personalized(&mut self) -> Result<bool, CryptoError> {
        self.require_awake()?;
        Ok(self.personalized)
    }

    fn serial(&mut self) -> Result<[u8; SERIAL_SIZE], CryptoError> {
        self.require_awake()?;
        Ok(self.serial)
    }

    fn random(&mut self) -> Result<[u8; 32], CryptoError> {
        self.require_awake()?;
        let mut out = [0u8; 32];
        self.rng.fill_bytes(&mut out);
        Ok(out)
    }

    fn sha256_block(&mut self, block: &[u8; SHA_BLOCK_SIZE]) -> Result<[u8; 32], CryptoError> {
        self.require_awake()?;
        Ok(compress_block(block))
    }

    fn hmac(&mut self, nonce: &[u8; 32], data: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
        self.require_awake()?;
        if !self.personalized {
            return Err(CryptoError::NotPersonalized);
        }
        Ok(nonce_hmac(&self.secret, nonce, data))
    }
}

impl<R> Drop for SoftCoprocessor<R> {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}
