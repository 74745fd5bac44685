//! Message signing and verification.
//!
//! A signature is an HMAC chain over the message minus its first header byte
//! (the relay byte changes per hop). The region is fed to the coprocessor in
//! 32-byte zero-padded chunks; the nonce seeds the first call and each HMAC
//! seeds the next. The nonce is purged as soon as it has been used.
//!
//! With whitelisting the chain result is salted once more:
//! `sha256(hmac || sender || serial)`, binding the signature to the physical
//! device rather than only its claimed address.
//!
//! The first signature byte is replaced by [`SIGNING_IDENTIFIER`] and as much
//! of the signature as fits is carried after the payload.

use std::collections::BTreeSet;

use sensormesh_core::constants::SERIAL_SIZE;
use sensormesh_core::{Message, NodeId, Serial};
use sensormesh_crypto::{CryptoAdapter, CryptoDevice, CryptoError, CryptoSession};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::constants::{CHUNK_SIZE, HMAC_SIZE, MAX_SIGNABLE_PAYLOAD, SIGNING_IDENTIFIER};
use crate::error::{Rejection, SigningError};
use crate::nonce::{Nonce, NonceManager};
use crate::whitelist::Whitelist;

/// Address and coprocessor serial of this node.
///
/// The serial is read once at initialization and never changes; the address
/// follows whatever the transport is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIdentity {
    pub address: NodeId,
    pub serial: Serial,
}

#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub verification_timeout_ms: u32,
    pub whitelist: Whitelist,
    /// Destinations that expect whitelist-salted signatures from us.
    pub salted_destinations: Vec<NodeId>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            verification_timeout_ms: crate::constants::VERIFICATION_TIMEOUT_MS,
            whitelist: Whitelist::disabled(),
            salted_destinations: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Signature computation
// ---------------------------------------------------------------------------

/// Run the HMAC chain over `region`, seeded by `nonce`.
///
/// `nonce` is purged after the first call and reused as chaining scratch; it
/// is left purged on every exit path.
pub fn hmac_chain<D: CryptoDevice>(
    session: &mut CryptoSession<'_, D>,
    nonce: &mut Nonce,
    region: &[u8],
) -> Result<[u8; HMAC_SIZE], CryptoError> {
    let chunks = region.len().div_ceil(CHUNK_SIZE).max(1);
    let mut hmac = [0u8; HMAC_SIZE];

    for i in 0..chunks {
        let start = i * CHUNK_SIZE;
        let end = region.len().min(start + CHUNK_SIZE);
        let mut chunk = [0u8; CHUNK_SIZE];
        chunk[..end.saturating_sub(start)].copy_from_slice(&region[start.min(end)..end]);

        let result = session.hmac(nonce.as_bytes(), &chunk);
        nonce.purge();
        hmac = result?;

        if i + 1 < chunks {
            nonce.set(&hmac);
        }
    }
    Ok(hmac)
}

/// Salt a chain result with the sender's address and device serial.
pub fn salt<D: CryptoDevice>(
    session: &mut CryptoSession<'_, D>,
    hmac: &[u8; HMAC_SIZE],
    sender: NodeId,
    serial: &Serial,
) -> Result<[u8; HMAC_SIZE], CryptoError> {
    let mut input = [0u8; HMAC_SIZE + 1 + SERIAL_SIZE];
    input[..HMAC_SIZE].copy_from_slice(hmac);
    input[HMAC_SIZE] = sender.get();
    input[HMAC_SIZE + 1..].copy_from_slice(serial.as_ref());
    let digest = session.sha256(&input);
    input.zeroize();
    digest
}

fn compute_signature<D: CryptoDevice>(
    adapter: &mut CryptoAdapter<D>,
    nonce: &mut Nonce,
    region: &[u8],
    salt_with: Option<(NodeId, Serial)>,
) -> Result<[u8; HMAC_SIZE], CryptoError> {
    let mut session = adapter.session()?;
    let mut signature = hmac_chain(&mut session, nonce, region)?;
    if let Some((sender, serial)) = salt_with {
        let salted = salt(&mut session, &signature, sender, &serial);
        signature.zeroize();
        signature = salted?;
    }
    signature[0] = SIGNING_IDENTIFIER;
    Ok(signature)
}

// ---------------------------------------------------------------------------
// MessageSigner
// ---------------------------------------------------------------------------

pub struct MessageSigner<D> {
    adapter: CryptoAdapter<D>,
    identity: Option<NodeIdentity>,
    nonces: NonceManager,
    whitelist: Whitelist,
    salted_destinations: BTreeSet<NodeId>,
}

impl<D: CryptoDevice> MessageSigner<D> {
    pub fn new(adapter: CryptoAdapter<D>, config: SignerConfig) -> Self {
        Self {
            adapter,
            identity: None,
            nonces: NonceManager::new(config.verification_timeout_ms),
            whitelist: config.whitelist,
            salted_destinations: config.salted_destinations.into_iter().collect(),
        }
    }

    /// Check the coprocessor is personalized and cache its serial.
    ///
    /// # Errors
    ///
    /// [`CryptoError::NotPersonalized`] if the configuration zone is not
    /// locked, [`CryptoError::Unavailable`] if the device does not respond.
    pub fn initialize(&mut self, address: NodeId) -> Result<NodeIdentity, SigningError> {
        if let Some(identity) = self.identity.as_mut() {
            identity.address = address;
            return Ok(*identity);
        }

        let mut session = self.adapter.session()?;
        if !session.is_personalized()? {
            tracing::error!("signing: coprocessor is not personalized");
            return Err(CryptoError::NotPersonalized.into());
        }
        let serial = Serial::new(session.serial()?);
        drop(session);

        let identity = NodeIdentity { address, serial };
        self.identity = Some(identity);
        tracing::info!(address = address.get(), %serial, "signing: backend initialized");
        Ok(identity)
    }

    pub fn identity(&self) -> Option<&NodeIdentity> {
        self.identity.as_ref()
    }

    pub fn set_address(&mut self, address: NodeId) {
        if let Some(identity) = self.identity.as_mut() {
            identity.address = address;
        }
    }

    pub fn nonces(&self) -> &NonceManager {
        &self.nonces
    }

    pub fn adapter(&self) -> &CryptoAdapter<D> {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut CryptoAdapter<D> {
        &mut self.adapter
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Record that `peer` expects salted signatures (it announced whitelisting).
    pub fn require_salting_for(&mut self, peer: NodeId) {
        if self.salted_destinations.insert(peer) {
            tracing::debug!(peer = peer.get(), "signing: peer requires salted signatures");
        }
    }

    pub fn requires_salting(&self, peer: NodeId) -> bool {
        self.salted_destinations.contains(&peer)
    }

    /// Issue a verifier nonce to `peer`; returns the bytes to transmit.
    pub fn generate_verifier_nonce(
        &mut self,
        peer: NodeId,
        now: u32,
    ) -> Result<&[u8], SigningError> {
        if self.identity.is_none() {
            return Err(SigningError::NotInitialized);
        }
        self.nonces
            .generate_verifier_nonce(peer, now, &mut self.adapter)
    }

    pub fn store_signer_nonce(&mut self, received: &[u8], now: u32) {
        self.nonces.store_signer_nonce(received, now);
    }

    /// Poll the verification window. `false` means a verification expired
    /// (or the backend is not initialized).
    pub fn check_timeout(&mut self, now: u32) -> bool {
        if self.identity.is_none() {
            return false;
        }
        self.nonces.check_timeout(now)
    }

    /// Sign `msg` with the stored signer nonce.
    ///
    /// The signed flag is set before hashing because it is covered by the
    /// signature. On any error the message is left as it was.
    ///
    /// # Errors
    ///
    /// [`SigningError::PayloadTooLarge`] if no room remains for a signature,
    /// [`SigningError::MissingNonce`] without a signer nonce,
    /// [`SigningError::Crypto`] on a device failure (the nonce is purged).
    pub fn sign(&mut self, msg: &mut Message) -> Result<(), SigningError> {
        let identity = self.identity.ok_or(SigningError::NotInitialized)?;
        if msg.len() > MAX_SIGNABLE_PAYLOAD {
            tracing::warn!(len = msg.len(), "signing: payload too large to sign");
            return Err(SigningError::PayloadTooLarge {
                len: msg.len(),
                max: MAX_SIGNABLE_PAYLOAD,
            });
        }
        if !self.nonces.has_signer_nonce() {
            return Err(SigningError::MissingNonce);
        }

        let was_signed = msg.is_signed();
        msg.set_signed(true);
        let region = msg.signed_region();
        let salt_with = self
            .requires_salting(msg.destination)
            .then_some((msg.sender, identity.serial));

        match compute_signature(
            &mut self.adapter,
            self.nonces.signer_mut(),
            &region,
            salt_with,
        ) {
            Ok(mut signature) => {
                let trailer = msg.trailer_mut();
                let n = trailer.len().min(HMAC_SIZE);
                trailer[..n].copy_from_slice(&signature[..n]);
                signature.zeroize();
                tracing::debug!(
                    destination = msg.destination.get(),
                    salted = salt_with.is_some(),
                    signature_len = n,
                    "signing: message signed"
                );
                Ok(())
            }
            Err(e) => {
                self.nonces.signer_mut().purge();
                msg.set_signed(was_signed);
                tracing::warn!(error = %e, "signing: signature computation failed");
                Err(e.into())
            }
        }
    }

    /// Verify a signed message against the outstanding verifier nonce.
    ///
    /// Any outcome other than `Ok(())` means the message is not authentic.
    /// The verification is consumed by this call whether it accepts or not.
    pub fn verify(&mut self, msg: &Message, now: u32) -> Result<(), Rejection> {
        if self.identity.is_none() {
            return Err(Rejection::CryptoUnavailable);
        }
        if !msg.is_signed() {
            return Err(Rejection::NotSigned);
        }
        self.nonces.claim_verification(msg.sender, now)?;

        let outcome = self.check_signature(msg);
        self.nonces.verifier_mut().purge();
        match &outcome {
            Ok(()) => tracing::debug!(sender = msg.sender.get(), "signing: signature verified"),
            Err(reason) => {
                tracing::warn!(sender = msg.sender.get(), %reason, "signing: verification rejected");
            }
        }
        outcome
    }

    fn check_signature(&mut self, msg: &Message) -> Result<(), Rejection> {
        let received = msg.trailer();
        if received.len() < 2 {
            return Err(Rejection::Malformed);
        }
        if received[0] != SIGNING_IDENTIFIER {
            return Err(Rejection::BadIdentifier(received[0]));
        }

        let salt_with = if self.whitelist.is_enforced() {
            let serial = self
                .whitelist
                .lookup(msg.sender)
                .ok_or(Rejection::NotWhitelisted(msg.sender))?;
            Some((msg.sender, *serial))
        } else {
            None
        };

        let region = msg.signed_region();
        let mut expected = compute_signature(
            &mut self.adapter,
            self.nonces.verifier_mut(),
            &region,
            salt_with,
        )
        .map_err(|_| Rejection::CryptoUnavailable)?;

        let n = received.len().min(HMAC_SIZE);
        let matches: bool = expected[..n].ct_eq(&received[..n]).into();
        expected.zeroize();
        if matches {
            Ok(())
        } else {
            Err(Rejection::Mismatch)
        }
    }
}
