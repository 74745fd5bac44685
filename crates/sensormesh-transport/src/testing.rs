//! Deterministic radio and clock doubles for driving the state machine.
//!
//! ```rust,ignore
//! use sensormesh_transport::testing::{ManualClock, ScriptedRadio};
//!
//! let mut radio = ScriptedRadio::new();
//! radio.push_message(&reply, -40);
//! let sent = radio.take_sent();
//! ```

use std::cell::Cell;
use std::collections::VecDeque;

use sensormesh_core::{Message, NodeId};

use crate::error::RadioError;
use crate::radio::{Clock, Radio, Reception};

/// A frame handed to the radio, in send order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub to: NodeId,
    pub data: Vec<u8>,
    pub ack: bool,
}

/// In-memory radio: frames pushed by the test are received in order, every
/// send is recorded.
///
/// Failures only affect sends that request an acknowledgement, the same as
/// a real link where a broadcast cannot report loss.
#[derive(Debug)]
pub struct ScriptedRadio {
    address: NodeId,
    inbound: VecDeque<Reception>,
    sent: Vec<SentFrame>,
    failures: usize,
    offline: bool,
}

impl Default for ScriptedRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRadio {
    pub fn new() -> Self {
        Self {
            address: NodeId::AUTO,
            inbound: VecDeque::new(),
            sent: Vec::new(),
            failures: 0,
            offline: false,
        }
    }

    pub fn push(&mut self, data: Vec<u8>, rssi: i16) {
        self.inbound.push_back(Reception { data, rssi });
    }

    /// Queue an unencrypted message for reception.
    pub fn push_message(&mut self, msg: &Message, rssi: i16) {
        self.push(msg.to_bytes(), rssi);
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn sent(&self) -> &[SentFrame] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<SentFrame> {
        std::mem::take(&mut self.sent)
    }

    /// Fail the next `count` acknowledged sends.
    pub fn fail_next(&mut self, count: usize) {
        self.failures = count;
    }

    /// Fail every acknowledged send until cleared.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }
}

impl Radio for ScriptedRadio {
    fn send(&mut self, to: NodeId, frame: &[u8], ack: bool) -> Result<(), RadioError> {
        self.sent.push(SentFrame {
            to,
            data: frame.to_vec(),
            ack,
        });
        if !ack {
            return Ok(());
        }
        if self.offline {
            return Err(RadioError::NoAck);
        }
        if self.failures > 0 {
            self.failures -= 1;
            return Err(RadioError::NoAck);
        }
        Ok(())
    }

    fn available(&mut self) -> bool {
        !self.inbound.is_empty()
    }

    fn receive(&mut self) -> Option<Reception> {
        self.inbound.pop_front()
    }

    fn set_address(&mut self, address: NodeId) {
        self.address = address;
    }

    fn address(&self) -> NodeId {
        self.address
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, millis: u32) {
        self.now.set(millis);
    }

    pub fn advance(&self, millis: u32) {
        self.now.set(self.now.get().wrapping_add(millis));
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u32 {
        self.now.get()
    }
}
