//! Message signing backend for sensormesh.
//!
//! Signatures are HMAC-SHA256 chains computed on a cryptographic coprocessor
//! over a single-use nonce issued by the receiving node. A node holds at most
//! one outstanding verification at a time; the signed reply must arrive within
//! the verification window. Optional whitelisting salts each signature with
//! the sender's device serial.

pub mod constants;
pub mod error;
pub mod nonce;
pub mod signer;
pub mod whitelist;

pub use error::{Rejection, SigningError};
pub use nonce::{Nonce, NonceManager, Verification};
pub use signer::{MessageSigner, NodeIdentity, SignerConfig, hmac_chain, salt};
pub use whitelist::{Whitelist, WhitelistEntry};
