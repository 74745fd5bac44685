//! Radio and clock contracts consumed by the transport.
//!
//! Implementations wrap a physical driver. PHY-level retries, channel access
//! and modulation happen below this boundary.

use sensormesh_core::NodeId;

use crate::error::RadioError;

/// A frame as it came off the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    pub data: Vec<u8>,
    /// Received signal strength in dBm; higher is better.
    pub rssi: i16,
}

pub trait Radio {
    /// Transmit `frame` to the next hop. With `ack` the call only succeeds
    /// once the next hop acknowledged; without it success means "sent".
    fn send(&mut self, to: NodeId, frame: &[u8], ack: bool) -> Result<(), RadioError>;

    fn available(&mut self) -> bool;

    /// Take the next received frame, if any.
    fn receive(&mut self) -> Option<Reception>;

    fn set_address(&mut self, address: NodeId);

    fn address(&self) -> NodeId;
}

/// Monotonic millisecond counter. Wraps at `u32::MAX`.
pub trait Clock {
    fn millis(&self) -> u32;
}
