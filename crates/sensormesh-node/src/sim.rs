//! In-memory network: one node, one simulated gateway, a loopback medium.
//!
//! The gateway side answers discovery, address, link-check and registration
//! requests, takes part in the nonce exchange in both directions and checks
//! every application message it receives. [`run`] drives the pair from a
//! tokio interval until shutdown.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::watch;

use sensormesh_core::constants::SERIAL_SIZE;
use sensormesh_core::{Command, InternalType, Message, NodeId, Serial};
use sensormesh_crypto::{CryptoAdapter, CryptoDevice, SoftCoprocessor};
use sensormesh_signing::{MessageSigner, SignerConfig, Whitelist, WhitelistEntry};
use sensormesh_transport::constants::{
    SIGNING_PRESENTATION_REQUIRE_SIGNATURES, SIGNING_PRESENTATION_REQUIRE_WHITELISTING,
    SIGNING_PRESENTATION_VERSION,
};
use sensormesh_transport::{Clock, FrameCodec, Radio, RadioError, Reception, TransportState};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::node::SoftNode;

/// Serial of the simulated gateway's coprocessor unless the node's whitelist
/// enrolls a different one.
pub const GATEWAY_SERIAL: [u8; SERIAL_SIZE] = [0x01, 0x23, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE];

const LINK_RSSI: i16 = -48;

// ---------------------------------------------------------------------------
// LoopbackRadio
// ---------------------------------------------------------------------------

/// Radio whose frames are carried by the simulation instead of the air.
#[derive(Debug)]
pub struct LoopbackRadio {
    address: NodeId,
    inbound: VecDeque<Reception>,
    outbound: Vec<(NodeId, Vec<u8>)>,
    link_up: bool,
}

impl Default for LoopbackRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackRadio {
    pub fn new() -> Self {
        Self {
            address: NodeId::AUTO,
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            link_up: true,
        }
    }

    pub fn deliver(&mut self, data: Vec<u8>, rssi: i16) {
        self.inbound.push_back(Reception { data, rssi });
    }

    pub fn take_outbound(&mut self) -> Vec<(NodeId, Vec<u8>)> {
        std::mem::take(&mut self.outbound)
    }

    /// While the link is down every frame is lost and acked sends fail.
    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }
}

impl Radio for LoopbackRadio {
    fn send(&mut self, to: NodeId, frame: &[u8], ack: bool) -> Result<(), RadioError> {
        if !self.link_up {
            return if ack { Err(RadioError::NoAck) } else { Ok(()) };
        }
        self.outbound.push((to, frame.to_vec()));
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

// ---------------------------------------------------------------------------
// SimulatedGateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub assigned: Vec<NodeId>,
    pub registered: Vec<NodeId>,
    pub accepted: u32,
    pub rejected: u32,
    pub commands_sent: u32,
}

pub struct SimulatedGateway<D, G> {
    signer: Option<MessageSigner<D>>,
    codec: Option<FrameCodec<G>>,
    require_signatures: bool,
    next_id: u8,
    /// Signed command waiting for the node's nonce.
    pending_command: Option<Message>,
    stats: GatewayStats,
}

impl<D: CryptoDevice, G: RngCore> SimulatedGateway<D, G> {
    pub fn new(
        signer: Option<MessageSigner<D>>,
        codec: Option<FrameCodec<G>>,
        require_signatures: bool,
    ) -> Self {
        Self {
            signer,
            codec,
            require_signatures,
            next_id: 1,
            pending_command: None,
            stats: GatewayStats::default(),
        }
    }

    pub fn initialize(&mut self) -> Result<(), NodeError> {
        if let Some(signer) = self.signer.as_mut() {
            signer.initialize(NodeId::GATEWAY)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    pub fn signer(&self) -> Option<&MessageSigner<D>> {
        self.signer.as_ref()
    }

    /// Expire a verification the node never answered.
    pub fn check_timeout(&mut self, now: u32) {
        if let Some(signer) = self.signer.as_mut() {
            signer.check_timeout(now);
        }
    }

    /// Handle a frame the node put on the air; returns frames to deliver
    /// back as `(destination, bytes)`.
    pub fn handle_frame(&mut self, to: NodeId, frame: &[u8], now: u32) -> Vec<(NodeId, Vec<u8>)> {
        if to != NodeId::GATEWAY && to != NodeId::BROADCAST {
            return Vec::new();
        }
        let bytes = match self.codec.as_mut() {
            Some(codec) => match codec.open(NodeId::GATEWAY, frame) {
                Ok(plaintext) => plaintext.to_vec(),
                Err(e) => {
                    tracing::debug!(error = %e, "gateway: dropping frame");
                    return Vec::new();
                }
            },
            None => frame.to_vec(),
        };
        let msg = match Message::from_bytes(&bytes) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, "gateway: dropping unparseable message");
                return Vec::new();
            }
        };

        let replies = if msg.command == Command::Internal {
            self.handle_internal(&msg, now)
        } else {
            self.handle_application(&msg, now);
            Vec::new()
        };
        replies
            .into_iter()
            .filter_map(|reply| self.encode(reply))
            .collect()
    }

    /// Queue a signed command for `msg.destination`; the returned frame asks
    /// the node for a nonce.
    pub fn send_signed_command(&mut self, msg: Message) -> Vec<(NodeId, Vec<u8>)> {
        if self.signer.is_none() || self.pending_command.is_some() {
            return Vec::new();
        }
        let request = Message::internal(NodeId::GATEWAY, msg.destination, InternalType::NonceRequest);
        self.pending_command = Some(msg);
        self.encode(request).into_iter().collect()
    }

    fn encode(&mut self, mut reply: Message) -> Option<(NodeId, Vec<u8>)> {
        reply.last = NodeId::GATEWAY;
        let to = reply.destination;
        let bytes = reply.to_bytes();
        match self.codec.as_mut() {
            Some(codec) => match codec.seal(to, &bytes) {
                Ok(frame) => Some((to, frame)),
                Err(e) => {
                    tracing::warn!(error = %e, "gateway: cannot seal reply");
                    None
                }
            },
            None => Some((to, bytes)),
        }
    }

    fn handle_internal(&mut self, msg: &Message, now: u32) -> Vec<Message> {
        let Some(kind) = msg.internal_type() else {
            return Vec::new();
        };
        let gateway = NodeId::GATEWAY;
        let reply = |kind| Message::internal(gateway, msg.sender, kind);

        match kind {
            InternalType::FindParentRequest => {
                vec![reply(InternalType::FindParentResponse).with_byte(0)]
            }
            InternalType::IdRequest => {
                let id = NodeId(self.next_id);
                self.next_id = self.next_id.saturating_add(1).min(254);
                self.stats.assigned.push(id);
                tracing::info!(id = id.get(), "gateway: assigned node id");
                vec![reply(InternalType::IdResponse).with_byte(id.get())]
            }
            InternalType::Ping => {
                vec![reply(InternalType::Pong).with_byte(msg.byte().unwrap_or(1))]
            }
            InternalType::RegistrationRequest => {
                self.stats.registered.push(msg.sender);
                tracing::info!(node = msg.sender.get(), "gateway: node registered");
                vec![reply(InternalType::RegistrationResponse).with_byte(1)]
            }
            InternalType::SigningPresentation => {
                let payload = msg.payload();
                if payload.len() >= 2
                    && payload[0] == SIGNING_PRESENTATION_VERSION
                    && payload[1] & SIGNING_PRESENTATION_REQUIRE_WHITELISTING != 0
                    && let Some(signer) = self.signer.as_mut()
                {
                    signer.require_salting_for(msg.sender);
                }

                let mut flags = 0;
                if self.require_signatures {
                    flags |= SIGNING_PRESENTATION_REQUIRE_SIGNATURES;
                }
                if self.signer.as_ref().is_some_and(|s| s.whitelist().is_enforced()) {
                    flags |= SIGNING_PRESENTATION_REQUIRE_WHITELISTING;
                }
                reply(InternalType::SigningPresentation)
                    .with_payload(&[SIGNING_PRESENTATION_VERSION, flags])
                    .ok()
                    .into_iter()
                    .collect()
            }
            InternalType::NonceRequest => {
                let Some(signer) = self.signer.as_mut() else {
                    return Vec::new();
                };
                match signer.generate_verifier_nonce(msg.sender, now) {
                    Ok(nonce) => reply(InternalType::NonceResponse)
                        .with_payload(nonce)
                        .ok()
                        .into_iter()
                        .collect(),
                    Err(e) => {
                        tracing::debug!(error = %e, "gateway: no nonce issued");
                        Vec::new()
                    }
                }
            }
            InternalType::NonceResponse => self.complete_signed_command(msg, now),
            _ => Vec::new(),
        }
    }

    fn complete_signed_command(&mut self, msg: &Message, now: u32) -> Vec<Message> {
        let Some(signer) = self.signer.as_mut() else {
            return Vec::new();
        };
        signer.store_signer_nonce(msg.payload(), now);
        let waiting = self
            .pending_command
            .as_ref()
            .is_some_and(|c| c.destination == msg.sender);
        if !waiting {
            return Vec::new();
        }
        let Some(mut command) = self.pending_command.take() else {
            return Vec::new();
        };
        match signer.sign(&mut command) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                vec![command]
            }
            Err(e) => {
                tracing::warn!(error = %e, "gateway: cannot sign command");
                Vec::new()
            }
        }
    }

    fn handle_application(&mut self, msg: &Message, now: u32) {
        let accepted = if msg.is_signed() {
            match self.signer.as_mut().map(|s| s.verify(msg, now)) {
                Some(Ok(())) => true,
                Some(Err(reason)) => {
                    tracing::warn!(sender = msg.sender.get(), %reason, "gateway: signature rejected");
                    false
                }
                None => false,
            }
        } else {
            !self.require_signatures
        };

        if accepted {
            self.stats.accepted += 1;
            tracing::info!(
                sender = msg.sender.get(),
                sensor = msg.sensor,
                signed = msg.is_signed(),
                value = %String::from_utf8_lossy(msg.payload()),
                "gateway: reading accepted"
            );
        } else {
            self.stats.rejected += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub type SoftGateway = SimulatedGateway<SoftCoprocessor<StdRng>, StdRng>;

pub struct Simulation<C> {
    node: SoftNode<LoopbackRadio, C>,
    gateway: SoftGateway,
}

impl<C: Clock> Simulation<C> {
    /// Build both ends from one configuration: the gateway shares the node's
    /// HMAC secret and PSK, and enrolls the node's serial when the node salts
    /// its signatures toward the gateway.
    pub fn from_config(config: &NodeConfig, clock: C) -> Result<Self, NodeError> {
        let node = SoftNode::from_config(config, LoopbackRadio::new(), clock)?;

        let signer = match config.signer_config()? {
            Some(node_signing) => {
                let gateway_serial = node_signing
                    .whitelist
                    .lookup(NodeId::GATEWAY)
                    .map_or(GATEWAY_SERIAL, |s| s.to_bytes());
                let whitelist = if node_signing.salted_destinations.contains(&NodeId::GATEWAY) {
                    let node_id = config.node.address.map_or(NodeId(1), NodeId);
                    Whitelist::enforced(vec![WhitelistEntry {
                        node_id,
                        serial: Serial::new(config.signing_serial()?),
                    }])
                } else {
                    Whitelist::disabled()
                };
                let device = SoftCoprocessor::new(
                    config.signing_secret()?,
                    gateway_serial,
                    StdRng::from_entropy(),
                );
                let gateway_config = SignerConfig {
                    verification_timeout_ms: config.signing.verification_timeout_ms,
                    whitelist,
                    salted_destinations: Vec::new(),
                };
                Some(MessageSigner::new(CryptoAdapter::new(device), gateway_config))
            }
            None => None,
        };
        let codec = config
            .psk()?
            .map(|psk| FrameCodec::new(psk, StdRng::from_entropy()));
        let gateway = SimulatedGateway::new(signer, codec, config.node.require_signatures);

        Ok(Self { node, gateway })
    }

    /// Initialize both ends.
    pub fn start(&mut self) -> Result<(), NodeError> {
        let now = self.node.clock().millis();
        self.gateway.initialize()?;
        self.node.machine_mut().initialize(now)?;
        Ok(())
    }

    /// Tick the node once and carry every frame it sent across the medium.
    pub fn step(&mut self) -> TransportState {
        let state = self.node.advance_transport_state();
        let now = self.node.clock().millis();

        for (to, frame) in self.node.radio_mut().take_outbound() {
            for (_, reply) in self.gateway.handle_frame(to, &frame, now) {
                self.node.radio_mut().deliver(reply, LINK_RSSI);
            }
        }
        self.gateway.check_timeout(now);
        state
    }

    /// Have the gateway push a signed command to the node.
    pub fn gateway_command(&mut self, payload: &[u8]) -> bool {
        let address = self.node.address();
        let Ok(command) = Message::new(NodeId::GATEWAY, address, Command::Set, 2, 1).with_payload(payload)
        else {
            return false;
        };
        let frames = self.gateway.send_signed_command(command);
        let sent = !frames.is_empty();
        for (_, frame) in frames {
            self.node.radio_mut().deliver(frame, LINK_RSSI);
        }
        sent
    }

    pub fn node(&self) -> &SoftNode<LoopbackRadio, C> {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut SoftNode<LoopbackRadio, C> {
        &mut self.node
    }

    pub fn gateway(&self) -> &SoftGateway {
        &self.gateway
    }
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tick: Duration,
    /// Stop after this many ticks; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    /// Ticks between readings once operational.
    pub report_every: u64,
    /// Send readings signed when the node has a signer.
    pub signed: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            max_ticks: None,
            report_every: 20,
            signed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_state: TransportState,
    pub readings_sent: u32,
    pub commands_received: u32,
}

/// Drive the simulation until `max_ticks` or a shutdown signal.
pub async fn run<C: Clock>(
    sim: &mut Simulation<C>,
    options: &RunOptions,
    mut shutdown: watch::Receiver<bool>,
) -> RunSummary {
    let mut interval = tokio::time::interval(options.tick);
    let report_every = options.report_every.max(2);
    let signed = options.signed && sim.node().machine().signer().is_some();
    let mut summary = RunSummary {
        ticks: 0,
        final_state: sim.node().machine().state(),
        readings_sent: 0,
        commands_received: 0,
    };
    let mut operational_ticks = 0u64;

    tracing::info!(tick_ms = options.tick.as_millis() as u64, signed, "sim: entering tick loop");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                tracing::info!("sim: shutdown signal received");
                break;
            }

            _ = interval.tick() => {
                summary.final_state = sim.step();
                summary.ticks += 1;

                if sim.node().is_operational() {
                    operational_ticks += 1;
                    if operational_ticks % report_every == 0 && send_reading(sim, summary.ticks, signed) {
                        summary.readings_sent += 1;
                    }
                    if signed && operational_ticks % report_every == report_every / 2 {
                        sim.gateway_command(b"1");
                    }
                }
                while let Some(msg) = sim.node_mut().receive() {
                    summary.commands_received += 1;
                    tracing::info!(
                        sensor = msg.sensor,
                        value = %String::from_utf8_lossy(msg.payload()),
                        "sim: command received"
                    );
                }

                if options.max_ticks.is_some_and(|max| summary.ticks >= max) {
                    break;
                }
            }
        }
    }

    let status = sim.node().transport_status();
    tracing::info!(
        ticks = summary.ticks,
        state = %status.state,
        readings = summary.readings_sent,
        commands = summary.commands_received,
        accepted = sim.gateway().stats().accepted,
        "sim: stopped"
    );
    summary
}

/// A fake temperature reading derived from the tick count.
fn send_reading<C: Clock>(sim: &mut Simulation<C>, tick: u64, signed: bool) -> bool {
    let node = sim.node_mut();
    let celsius = 18.0 + (tick % 70) as f32 / 10.0;
    let payload = format!("{celsius:.1}");
    let Ok(msg) = Message::new(node.address(), NodeId::GATEWAY, Command::Set, 0, 1)
        .with_payload(payload.as_bytes())
    else {
        return false;
    };
    if signed {
        node.send_signed(msg)
    } else {
        node.send(msg)
    }
}
