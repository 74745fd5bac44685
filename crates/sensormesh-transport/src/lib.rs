//! Link establishment and radio-layer security for sensormesh nodes.
//!
//! This crate holds the radio and clock contracts, the secure frame codec and
//! the transport state machine that takes a node from power-on to a
//! registered, operational member of the network and keeps it there.

pub mod config;
pub mod constants;
pub mod error;
pub mod frame;
pub mod machine;
pub mod parent;
pub mod radio;
pub mod status;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::TransportConfig;
pub use error::{FrameError, RadioError, TransportError};
pub use frame::FrameCodec;
pub use machine::TransportMachine;
pub use radio::{Clock, Radio, Reception};
pub use status::{TransportState, TransportStatus};
