//! Application-facing node facade.
//!
//! [`SensorNode`] owns the transport machine and a clock and exposes the
//! narrow interface an application or gateway layer drives: initialize,
//! advance one tick, send, verify, read status. Signing, framing and radio
//! errors never cross this boundary; callers see `bool` and a
//! [`TransportStatus`] snapshot.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::time::Instant;

use sensormesh_core::{Message, NodeId};
use sensormesh_crypto::{CryptoAdapter, CryptoDevice, SoftCoprocessor};
use sensormesh_signing::MessageSigner;
use sensormesh_transport::{
    Clock, FrameCodec, Radio, TransportMachine, TransportState, TransportStatus,
};

use crate::config::NodeConfig;
use crate::error::NodeError;

/// Milliseconds since construction on the tokio clock, truncated to a
/// wrapping `u32` counter. Follows paused time in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

pub struct SensorNode<R, C, D, G> {
    machine: TransportMachine<R, D, G>,
    clock: C,
}

/// A node backed by the software coprocessor.
pub type SoftNode<R, C> = SensorNode<R, C, SoftCoprocessor<StdRng>, StdRng>;

impl<R: Radio, C: Clock> SoftNode<R, C> {
    /// Build the signer, frame codec and transport settings from `config`.
    pub fn from_config(config: &NodeConfig, radio: R, clock: C) -> Result<Self, NodeError> {
        let transport = config.transport_config()?;

        let signer = match config.signer_config()? {
            Some(signer_config) => {
                let device = SoftCoprocessor::new(
                    config.signing_secret()?,
                    config.signing_serial()?,
                    StdRng::from_entropy(),
                );
                Some(MessageSigner::new(CryptoAdapter::new(device), signer_config))
            }
            None => None,
        };
        let codec = config
            .psk()?
            .map(|psk| FrameCodec::new(psk, StdRng::from_entropy()));

        Ok(Self::new(
            TransportMachine::new(radio, signer, codec, transport),
            clock,
        ))
    }
}

impl<R: Radio, C: Clock, D: CryptoDevice, G: RngCore> SensorNode<R, C, D, G> {
    pub fn new(machine: TransportMachine<R, D, G>, clock: C) -> Self {
        Self { machine, clock }
    }

    /// Bring up the signing backend and radio. `false` leaves the node inert.
    pub fn initialize_transport(&mut self) -> bool {
        match self.machine.initialize(self.clock.millis()) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "node: transport initialization failed");
                false
            }
        }
    }

    /// One non-blocking tick of the transport state machine.
    pub fn advance_transport_state(&mut self) -> TransportState {
        self.machine.tick(self.clock.millis())
    }

    pub fn send(&mut self, msg: Message) -> bool {
        let now = self.clock.millis();
        match self.machine.send(msg, now) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "node: send failed");
                false
            }
        }
    }

    /// Start a signed send. `true` means the nonce request went out; the
    /// message itself follows once the destination answers.
    pub fn send_signed(&mut self, msg: Message) -> bool {
        let now = self.clock.millis();
        match self.machine.send_signed(msg, now) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "node: signed send refused");
                false
            }
        }
    }

    pub fn verify_signed(&mut self, msg: &Message) -> bool {
        let now = self.clock.millis();
        self.machine.verify(msg, now)
    }

    pub fn transport_status(&self) -> TransportStatus {
        self.machine.status()
    }

    pub fn is_operational(&self) -> bool {
        self.machine.state() == TransportState::Operational
    }

    pub fn address(&self) -> NodeId {
        self.machine.address()
    }

    /// Next verified application message.
    pub fn receive(&mut self) -> Option<Message> {
        self.machine.receive()
    }

    pub fn machine(&self) -> &TransportMachine<R, D, G> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut TransportMachine<R, D, G> {
        &mut self.machine
    }

    pub fn radio_mut(&mut self) -> &mut R {
        self.machine.radio_mut()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
