//! Node runtime for sensormesh.
//!
//! This crate puts the transport and signing layers behind a small
//! application facade and adds configuration, logging and an in-memory
//! gateway simulation used by the `sensormesh-node` binary.

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod sim;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{MonotonicClock, SensorNode, SoftNode};
pub use sim::{LoopbackRadio, Simulation};
