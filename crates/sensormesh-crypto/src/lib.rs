//! Cryptographic primitives for sensormesh nodes.
//!
//! The HMAC secret lives behind the [`device::CryptoDevice`] boundary; this
//! crate only ever sees the results. Single-block SHA-256 and the radio-layer
//! AES-128-EAX run alongside it behind [`adapter::CryptoAdapter`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod adapter;
pub mod aead;
pub mod device;
pub mod error;
pub mod hmac;
pub mod sha;

pub use adapter::{CryptoAdapter, CryptoSession, Release};
pub use device::{CryptoDevice, PowerState, SERIAL_SIZE, SoftCoprocessor};
pub use error::CryptoError;
