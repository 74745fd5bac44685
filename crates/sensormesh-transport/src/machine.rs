//! Transport state machine.
//!
//! ```text
//! INIT -> PARENT_SEARCH -> [ID_REQUEST] -> LINK_CHECK -> REGISTER -> OPERATIONAL
//!                 ^                             |                        |
//!                 +------ failure threshold ----+------------------------+
//! any state --(retries exhausted / refused)--> FAILURE --(backoff)--> INIT
//! ```
//!
//! The machine is driven by [`TransportMachine::tick`]. A tick never blocks:
//! it polls the verification window, handles at most one received frame and
//! performs one bounded step of the current state. Waiting for a reply is a
//! recorded send time checked on later ticks.

use std::collections::VecDeque;

use rand::RngCore;
use sensormesh_core::constants::{DISTANCE_INVALID, PROTOCOL_VERSION};
use sensormesh_core::{Command, InternalType, Message, NodeId};
use sensormesh_crypto::CryptoDevice;
use sensormesh_signing::MessageSigner;
use sensormesh_signing::constants::MAX_SIGNABLE_PAYLOAD;

use crate::config::TransportConfig;
use crate::constants::{
    SIGNING_PRESENTATION_REQUIRE_SIGNATURES, SIGNING_PRESENTATION_REQUIRE_WHITELISTING,
    SIGNING_PRESENTATION_VERSION,
};
use crate::error::TransportError;
use crate::frame::FrameCodec;
use crate::parent::{ParentCandidate, distance_through, select_parent};
use crate::radio::Radio;
use crate::status::{TransportState, TransportStatus, saturating_increment};

/// Verified application messages kept for the application.
pub const INBOX_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Pure time-decision functions
// ---------------------------------------------------------------------------

/// Whether `duration_ms` has passed since `since`, across counter wrap.
pub fn has_elapsed(since: u32, now: u32, duration_ms: u32) -> bool {
    now.wrapping_sub(since) >= duration_ms
}

/// Traffic toward the gateway or our parent counts against the uplink.
pub fn is_uplink(destination: NodeId, parent: NodeId) -> bool {
    destination.is_gateway() || destination == parent
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Send,
    Pending,
    TimedOut,
}

fn wait_state(awaiting: Option<u32>, now: u32, timeout_ms: u32) -> Wait {
    match awaiting {
        None => Wait::Send,
        Some(sent) if has_elapsed(sent, now, timeout_ms) => Wait::TimedOut,
        Some(_) => Wait::Pending,
    }
}

// ---------------------------------------------------------------------------
// TransportMachine
// ---------------------------------------------------------------------------

/// A signed send waiting for the destination's nonce.
#[derive(Debug, Clone)]
struct PendingSigned {
    message: Message,
    requested_at: u32,
}

pub struct TransportMachine<R, D, G> {
    radio: R,
    signer: Option<MessageSigner<D>>,
    codec: Option<FrameCodec<G>>,
    config: TransportConfig,
    status: TransportStatus,
    initialized: bool,
    parent: NodeId,
    distance: u8,
    entered_at: u32,
    attempts: u8,
    awaiting: Option<u32>,
    candidates: Vec<ParentCandidate>,
    presented: bool,
    pending: Option<PendingSigned>,
    inbox: VecDeque<Message>,
    last_error: Option<TransportError>,
}

impl<R: Radio, D: CryptoDevice, G: RngCore> TransportMachine<R, D, G> {
    pub fn new(
        radio: R,
        signer: Option<MessageSigner<D>>,
        codec: Option<FrameCodec<G>>,
        config: TransportConfig,
    ) -> Self {
        Self {
            radio,
            signer,
            codec,
            parent: config.fixed_parent.unwrap_or(NodeId::AUTO),
            config,
            status: TransportStatus::default(),
            initialized: false,
            distance: DISTANCE_INVALID,
            entered_at: 0,
            attempts: 0,
            awaiting: None,
            candidates: Vec::new(),
            presented: false,
            pending: None,
            inbox: VecDeque::new(),
            last_error: None,
        }
    }

    /// Bring up the signing backend and the radio address.
    ///
    /// # Errors
    ///
    /// [`TransportError::Signing`] if the coprocessor is unavailable or not
    /// personalized. The machine stays inert in that case.
    pub fn initialize(&mut self, now: u32) -> Result<(), TransportError> {
        if let Some(signer) = self.signer.as_mut() {
            signer.initialize(self.config.address)?;
        }
        self.radio.set_address(self.config.address);
        self.initialized = true;
        self.transition(TransportState::Init, now);
        tracing::info!(
            address = self.config.address.get(),
            signing = self.signer.is_some(),
            encryption = self.codec.is_some(),
            "transport: initialized"
        );
        Ok(())
    }

    /// Advance the machine by one bounded step.
    pub fn tick(&mut self, now: u32) -> TransportState {
        if !self.initialized {
            return self.status.state;
        }
        if let Some(signer) = self.signer.as_mut() {
            signer.check_timeout(now);
        }
        self.expire_pending_send(now);
        self.process_incoming(now);

        match self.status.state {
            TransportState::Init => self.step_init(now),
            TransportState::ParentSearch => self.step_parent_search(now),
            TransportState::IdRequest => self.step_id_request(now),
            TransportState::LinkCheck => self.step_link_check(now),
            TransportState::Register => self.step_register(now),
            TransportState::Operational => self.step_operational(now),
            TransportState::Failure => self.step_failure(now),
        }
        self.status.state
    }

    /// Leave `FAILURE` (or any state) and restart from `INIT`.
    pub fn reset(&mut self, now: u32) {
        tracing::info!(state = %self.status.state, "transport: reset");
        self.transition(TransportState::Init, now);
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn state(&self) -> TransportState {
        self.status.state
    }

    pub fn address(&self) -> NodeId {
        self.radio.address()
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Hops to the gateway through the current parent.
    pub fn distance(&self) -> u8 {
        self.distance
    }

    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    pub fn is_send_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn signer(&self) -> Option<&MessageSigner<D>> {
        self.signer.as_ref()
    }

    pub fn signer_mut(&mut self) -> Option<&mut MessageSigner<D>> {
        self.signer.as_mut()
    }

    /// Next verified application message, oldest first.
    pub fn receive(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    /// Send an unsigned application message.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotOperational`] before registration completes,
    /// [`TransportError::SendFailed`] if the next hop did not take it.
    pub fn send(&mut self, mut msg: Message, now: u32) -> Result<(), TransportError> {
        if self.status.state != TransportState::Operational {
            return Err(TransportError::NotOperational);
        }
        msg.sender = self.address();
        self.send_route(msg, now)
    }

    /// Request a nonce from the destination and park `msg` until it arrives.
    ///
    /// The message is signed and transmitted from a later tick. If no nonce
    /// arrives within the verification timeout the send is dropped and
    /// counted as a failed transmission.
    ///
    /// # Errors
    ///
    /// [`TransportError::SendPending`] while another signed send waits,
    /// [`TransportError::Signing`] if the payload leaves no room for a
    /// signature.
    pub fn send_signed(&mut self, mut msg: Message, now: u32) -> Result<(), TransportError> {
        if self.status.state != TransportState::Operational {
            return Err(TransportError::NotOperational);
        }
        if self.signer.is_none() {
            return Err(TransportError::SigningDisabled);
        }
        if self.pending.is_some() {
            return Err(TransportError::SendPending);
        }
        if msg.len() > MAX_SIGNABLE_PAYLOAD {
            return Err(sensormesh_signing::SigningError::PayloadTooLarge {
                len: msg.len(),
                max: MAX_SIGNABLE_PAYLOAD,
            }
            .into());
        }

        let address = self.address();
        msg.sender = address;
        let destination = msg.destination;
        let request = Message::internal(address, destination, InternalType::NonceRequest);
        self.send_route(request, now)?;
        self.pending = Some(PendingSigned {
            message: msg,
            requested_at: now,
        });
        tracing::debug!(to = destination.get(), "transport: nonce requested for signed send");
        Ok(())
    }

    /// Verify a signed message against our outstanding challenge.
    pub fn verify(&mut self, msg: &Message, now: u32) -> bool {
        match self.signer.as_mut() {
            Some(signer) => signer.verify(msg, now).is_ok(),
            None => false,
        }
    }

    // -- state steps --

    fn step_init(&mut self, now: u32) {
        self.status = TransportStatus {
            heartbeat: self.status.heartbeat,
            ..TransportStatus::default()
        };
        self.pending = None;
        self.distance = DISTANCE_INVALID;
        self.transition(TransportState::ParentSearch, now);
    }

    fn step_parent_search(&mut self, now: u32) {
        if let Some(parent) = self.config.fixed_parent {
            self.parent = parent;
            self.distance = if parent.is_gateway() { 1 } else { DISTANCE_INVALID };
            self.status.preferred_parent_found = true;
            tracing::info!(parent = parent.get(), "transport: using fixed parent");
            self.after_parent_found(now);
            return;
        }

        match wait_state(self.awaiting, now, self.config.parent_search_window_ms) {
            Wait::Send => {
                let request = Message::internal(
                    self.address(),
                    NodeId::BROADCAST,
                    InternalType::FindParentRequest,
                );
                self.candidates.clear();
                self.status.finding_parent = true;
                self.awaiting = Some(now);
                if let Err(e) = self.send_route(request, now) {
                    tracing::debug!(error = %e, "transport: discovery broadcast failed");
                }
            }
            Wait::Pending => {}
            Wait::TimedOut => {
                self.status.finding_parent = false;
                match select_parent(&self.candidates) {
                    Some(best) => {
                        self.parent = best.node_id;
                        self.distance = best.distance;
                        self.status.preferred_parent_found = true;
                        tracing::info!(
                            parent = best.node_id.get(),
                            distance = best.distance,
                            rssi = best.rssi,
                            candidates = self.candidates.len(),
                            "transport: parent selected"
                        );
                        self.after_parent_found(now);
                    }
                    None => {
                        tracing::warn!(attempt = self.attempts + 1, "transport: no parent found");
                        self.retry_or_fail(now);
                    }
                }
            }
        }
    }

    fn after_parent_found(&mut self, now: u32) {
        if self.address().is_assigned() {
            self.transition(TransportState::LinkCheck, now);
        } else {
            self.transition(TransportState::IdRequest, now);
        }
    }

    fn step_id_request(&mut self, now: u32) {
        match wait_state(self.awaiting, now, self.config.state_timeout_ms) {
            Wait::Send => {
                let request =
                    Message::internal(self.address(), NodeId::GATEWAY, InternalType::IdRequest);
                self.awaiting = Some(now);
                if let Err(e) = self.send_route(request, now) {
                    tracing::debug!(error = %e, "transport: id request not delivered");
                }
            }
            Wait::Pending => {}
            Wait::TimedOut => {
                tracing::warn!(attempt = self.attempts + 1, "transport: id request timed out");
                self.retry_or_fail(now);
            }
        }
    }

    fn step_link_check(&mut self, now: u32) {
        if self.status.pong_received {
            self.status.failed_uplink_transmissions = 0;
            tracing::debug!(parent = self.parent.get(), "transport: uplink ok");
            self.transition(TransportState::Register, now);
            return;
        }

        match wait_state(self.awaiting, now, self.config.state_timeout_ms) {
            Wait::Send => {
                let ping = Message::internal(self.address(), self.parent, InternalType::Ping)
                    .with_byte(1);
                self.status.ping_active = true;
                self.status.pong_received = false;
                self.awaiting = Some(now);
                if let Err(e) = self.send_route(ping, now) {
                    tracing::debug!(error = %e, "transport: ping not delivered");
                }
            }
            Wait::Pending => {}
            Wait::TimedOut => {
                self.status.ping_active = false;
                self.awaiting = None;
                tracing::warn!(parent = self.parent.get(), "transport: no pong from parent");
                self.record_transmission_failure(true, now);
            }
        }
    }

    fn step_register(&mut self, now: u32) {
        if self.status.node_registered {
            tracing::info!(address = self.address().get(), "transport: registered with gateway");
            self.transition(TransportState::Operational, now);
            return;
        }

        match wait_state(self.awaiting, now, self.config.state_timeout_ms) {
            Wait::Send => {
                if !self.presented && self.signer.is_some() {
                    self.presented = true;
                    let sent = self
                        .signing_presentation()
                        .and_then(|presentation| self.send_route(presentation, now));
                    if let Err(e) = sent {
                        tracing::debug!(error = %e, "transport: signing presentation not delivered");
                    }
                    return;
                }
                let request = Message::internal(
                    self.address(),
                    NodeId::GATEWAY,
                    InternalType::RegistrationRequest,
                )
                .with_byte(PROTOCOL_VERSION);
                self.awaiting = Some(now);
                if let Err(e) = self.send_route(request, now) {
                    tracing::debug!(error = %e, "transport: registration request not delivered");
                }
            }
            Wait::Pending => {}
            Wait::TimedOut => {
                tracing::warn!(attempt = self.attempts + 1, "transport: registration timed out");
                self.retry_or_fail(now);
            }
        }
    }

    fn step_operational(&mut self, now: u32) {
        if !self.address().is_assigned() {
            tracing::warn!("transport: address lost");
            self.transition(TransportState::ParentSearch, now);
        }
    }

    fn step_failure(&mut self, now: u32) {
        if has_elapsed(self.entered_at, now, self.config.failure_backoff_ms) {
            tracing::info!("transport: failure backoff elapsed");
            self.transition(TransportState::Init, now);
        }
    }

    fn signing_presentation(&self) -> Result<Message, TransportError> {
        let mut flags = 0;
        if self.config.require_signatures {
            flags |= SIGNING_PRESENTATION_REQUIRE_SIGNATURES;
        }
        if self
            .signer
            .as_ref()
            .is_some_and(|s| s.whitelist().is_enforced())
        {
            flags |= SIGNING_PRESENTATION_REQUIRE_WHITELISTING;
        }
        let msg = Message::internal(
            self.address(),
            NodeId::GATEWAY,
            InternalType::SigningPresentation,
        )
        .with_payload(&[SIGNING_PRESENTATION_VERSION, flags])?;
        Ok(msg)
    }

    // -- transitions --

    fn transition(&mut self, state: TransportState, now: u32) {
        let from = self.status.state;
        if from != state {
            tracing::info!(%from, to = %state, "transport: state change");
        }
        self.status.state = state;
        self.entered_at = now;
        self.attempts = 0;
        self.awaiting = None;

        match state {
            TransportState::ParentSearch => {
                self.status.failed_uplink_transmissions = 0;
                self.status.failed_downlink_transmissions = 0;
                self.status.preferred_parent_found = false;
                self.status.finding_parent = false;
                self.candidates.clear();
                if self.config.fixed_parent.is_none() {
                    self.parent = NodeId::AUTO;
                }
            }
            TransportState::LinkCheck => {
                self.status.ping_active = false;
                self.status.pong_received = false;
            }
            TransportState::Register => {
                self.status.node_registered = false;
                self.presented = false;
            }
            TransportState::Failure => {
                self.status.finding_parent = false;
                self.status.ping_active = false;
                self.pending = None;
            }
            _ => {}
        }
    }

    fn retry_or_fail(&mut self, now: u32) {
        self.attempts = self.attempts.saturating_add(1);
        self.awaiting = None;
        if self.attempts >= self.config.state_retries {
            self.fail(
                TransportError::RetriesExhausted {
                    state: self.status.state,
                },
                now,
            );
        }
    }

    fn fail(&mut self, error: TransportError, now: u32) {
        tracing::warn!(%error, "transport: entering failure state");
        self.last_error = Some(error);
        self.transition(TransportState::Failure, now);
    }

    /// Count a failed transmission; past the threshold the parent is
    /// considered unreachable and discovery starts over.
    fn record_transmission_failure(&mut self, uplink: bool, now: u32) {
        let counter = if uplink {
            &mut self.status.failed_uplink_transmissions
        } else {
            &mut self.status.failed_downlink_transmissions
        };
        saturating_increment(counter);
        let count = *counter;

        let healing = matches!(
            self.status.state,
            TransportState::LinkCheck | TransportState::Operational
        );
        if healing && count >= self.config.transmission_failure_threshold {
            tracing::warn!(
                parent = self.parent.get(),
                failures = count,
                uplink,
                "transport: parent unreachable, searching again"
            );
            self.transition(TransportState::ParentSearch, now);
        }
    }

    // -- sending --

    fn next_hop(&self, destination: NodeId) -> NodeId {
        if destination == NodeId::BROADCAST || !self.parent.is_assigned() {
            destination
        } else {
            self.parent
        }
    }

    fn send_route(&mut self, mut msg: Message, now: u32) -> Result<(), TransportError> {
        msg.last = self.address();
        let to = self.next_hop(msg.destination);
        self.send_write(to, &msg, now)
    }

    fn send_write(&mut self, to: NodeId, msg: &Message, now: u32) -> Result<(), TransportError> {
        self.status.heartbeat = self.status.heartbeat.wrapping_add(1);
        let bytes = msg.to_bytes();
        let frame = match self.codec.as_mut() {
            Some(codec) => codec.seal(to, &bytes)?,
            None => bytes,
        };

        let ack = to != NodeId::BROADCAST;
        let uplink = is_uplink(msg.destination, self.parent);
        match self.radio.send(to, &frame, ack) {
            Ok(()) => {
                // During link check only a pong proves the uplink.
                if ack && self.status.state != TransportState::LinkCheck {
                    if uplink {
                        self.status.failed_uplink_transmissions = 0;
                    } else {
                        self.status.failed_downlink_transmissions = 0;
                    }
                }
                tracing::trace!(
                    to = to.get(),
                    destination = msg.destination.get(),
                    len = frame.len(),
                    "transport: sent"
                );
                Ok(())
            }
            Err(source) => {
                tracing::debug!(to = to.get(), error = %source, "transport: send failed");
                // Link check counts a lost ping once, when its wait times out.
                if ack && self.status.state != TransportState::LinkCheck {
                    self.record_transmission_failure(uplink, now);
                }
                Err(TransportError::SendFailed { to, source })
            }
        }
    }

    fn expire_pending_send(&mut self, now: u32) {
        let Some(timeout) = self.signer.as_ref().map(|s| s.nonces().timeout_ms()) else {
            return;
        };
        let expired = self
            .pending
            .as_ref()
            .is_some_and(|p| has_elapsed(p.requested_at, now, timeout));
        if expired && let Some(pending) = self.pending.take() {
            let destination = pending.message.destination;
            tracing::warn!(to = destination.get(), "transport: no nonce received, signed send dropped");
            self.record_transmission_failure(is_uplink(destination, self.parent), now);
        }
    }

    // -- receiving --

    fn process_incoming(&mut self, now: u32) {
        if !self.radio.available() {
            return;
        }
        let Some(rx) = self.radio.receive() else {
            return;
        };
        self.status.heartbeat = self.status.heartbeat.wrapping_add(1);

        let local = self.address();
        let bytes = match self.codec.as_mut() {
            Some(codec) => match codec.open(local, &rx.data) {
                Ok(plaintext) => plaintext.to_vec(),
                Err(_) => return,
            },
            None => rx.data,
        };

        let msg = match Message::from_bytes(&bytes) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, "transport: dropping unparseable message");
                return;
            }
        };
        if msg.destination != local && msg.destination != NodeId::BROADCAST {
            tracing::trace!(destination = msg.destination.get(), "transport: not addressed to us");
            return;
        }

        let result = if msg.command == Command::Internal {
            self.handle_internal(msg, rx.rssi, now)
        } else {
            self.handle_application(msg, now);
            Ok(())
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "transport: failed to handle message");
        }
    }

    fn handle_internal(&mut self, msg: Message, rssi: i16, now: u32) -> Result<(), TransportError> {
        let Some(kind) = msg.internal_type() else {
            tracing::trace!(message_type = msg.message_type, "transport: unhandled internal message");
            return Ok(());
        };

        match kind {
            InternalType::FindParentResponse => {
                if self.status.finding_parent
                    && let Some(distance) = msg.byte().and_then(distance_through)
                {
                    tracing::debug!(candidate = msg.sender.get(), distance, rssi, "transport: parent candidate");
                    self.candidates.push(ParentCandidate {
                        node_id: msg.sender,
                        distance,
                        rssi,
                    });
                }
            }
            InternalType::IdResponse => {
                if self.status.state == TransportState::IdRequest {
                    self.accept_id(msg.byte(), now);
                }
            }
            InternalType::Ping => {
                let hops = msg.byte().unwrap_or(1);
                let pong = Message::internal(self.address(), msg.sender, InternalType::Pong)
                    .with_byte(hops);
                self.send_route(pong, now)?;
            }
            InternalType::Pong => {
                if self.status.ping_active && msg.sender == self.parent {
                    self.status.ping_active = false;
                    self.status.pong_received = true;
                }
            }
            InternalType::RegistrationResponse => {
                if self.status.state == TransportState::Register {
                    if msg.byte().is_some_and(|b| b != 0) {
                        self.status.node_registered = true;
                    } else {
                        self.fail(
                            TransportError::Refused {
                                state: TransportState::Register,
                            },
                            now,
                        );
                    }
                }
            }
            InternalType::Config => {
                if self.status.state == TransportState::Register {
                    self.status.node_registered = true;
                }
            }
            InternalType::NonceRequest => self.answer_nonce_request(msg.sender, now)?,
            InternalType::NonceResponse => self.accept_nonce(&msg, now)?,
            InternalType::SigningPresentation => self.accept_signing_presentation(&msg),
            _ => {
                tracing::trace!(?kind, "transport: ignoring internal message");
            }
        }
        Ok(())
    }

    fn accept_id(&mut self, id: Option<u8>, now: u32) {
        match id.map(NodeId) {
            Some(id) if id == NodeId::AUTO => {
                self.fail(
                    TransportError::Refused {
                        state: TransportState::IdRequest,
                    },
                    now,
                );
            }
            Some(id) if !id.is_gateway() => {
                tracing::info!(address = id.get(), "transport: address assigned");
                self.radio.set_address(id);
                if let Some(signer) = self.signer.as_mut() {
                    signer.set_address(id);
                }
                self.transition(TransportState::LinkCheck, now);
            }
            _ => {
                tracing::debug!(?id, "transport: ignoring invalid id response");
            }
        }
    }

    fn answer_nonce_request(&mut self, peer: NodeId, now: u32) -> Result<(), TransportError> {
        let Some(signer) = self.signer.as_mut() else {
            return Ok(());
        };
        let nonce = signer.generate_verifier_nonce(peer, now)?.to_vec();
        let reply = Message::internal(self.address(), peer, InternalType::NonceResponse)
            .with_payload(&nonce)?;
        self.send_route(reply, now)
    }

    fn accept_nonce(&mut self, msg: &Message, now: u32) -> Result<(), TransportError> {
        let Some(signer) = self.signer.as_mut() else {
            return Ok(());
        };
        signer.store_signer_nonce(msg.payload(), now);

        let waiting_for_sender = self
            .pending
            .as_ref()
            .is_some_and(|p| p.message.destination == msg.sender);
        if !waiting_for_sender {
            return Ok(());
        }
        let Some(PendingSigned { mut message, .. }) = self.pending.take() else {
            return Ok(());
        };

        if let Err(e) = signer.sign(&mut message) {
            let destination = message.destination;
            self.record_transmission_failure(is_uplink(destination, self.parent), now);
            return Err(e.into());
        }
        tracing::debug!(to = message.destination.get(), "transport: sending signed message");
        self.send_route(message, now)
    }

    fn accept_signing_presentation(&mut self, msg: &Message) {
        let payload = msg.payload();
        if payload.len() < 2 || payload[0] != SIGNING_PRESENTATION_VERSION {
            tracing::debug!(sender = msg.sender.get(), "transport: unknown signing presentation");
            return;
        }
        if payload[1] & SIGNING_PRESENTATION_REQUIRE_WHITELISTING != 0
            && let Some(signer) = self.signer.as_mut()
        {
            signer.require_salting_for(msg.sender);
        }
    }

    fn handle_application(&mut self, msg: Message, now: u32) {
        if self.status.state != TransportState::Operational {
            tracing::debug!(state = %self.status.state, "transport: dropping traffic before registration");
            return;
        }

        let accepted = if msg.is_signed() {
            match self.signer.as_mut().map(|s| s.verify(&msg, now)) {
                Some(Ok(())) => true,
                Some(Err(reason)) => {
                    tracing::warn!(sender = msg.sender.get(), %reason, "transport: signature rejected");
                    false
                }
                None => false,
            }
        } else if self.config.require_signatures {
            tracing::warn!(sender = msg.sender.get(), "transport: unsigned message dropped");
            false
        } else {
            true
        };

        if !accepted {
            return;
        }
        if self.inbox.len() >= INBOX_CAPACITY {
            tracing::warn!(sender = msg.sender.get(), "transport: inbox full, message dropped");
            return;
        }
        self.inbox.push_back(msg);
    }
}
