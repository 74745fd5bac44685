//! Core types, constants, and the message wire format for sensormesh.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod message;
pub mod types;

pub use constants::{Command, InternalType, PayloadType};
pub use error::MessageError;
pub use message::Message;
pub use types::{InvalidLength, NodeId, Serial};
