//! Challenge nonces and the verification window.
//!
//! Two nonces exist side by side: the verifier nonce this node issues to a
//! peer that wants to send it a signed message, and the signer nonce a peer
//! issued to this node. Each is used exactly once and then overwritten with
//! [`PURGE_BYTE`].

use sensormesh_core::NodeId;
use sensormesh_crypto::{CryptoAdapter, CryptoDevice};
use zeroize::Zeroize;

use crate::constants::{NONCE_SIZE, NONCE_WIRE_SIZE, PURGE_BYTE, VERIFICATION_TIMEOUT_MS};
use crate::error::{Rejection, SigningError};

// ---------------------------------------------------------------------------
// Pure time-decision functions
// ---------------------------------------------------------------------------

/// Normalize an issue timestamp so its window does not wrap.
///
/// A window that would run past `u32::MAX` starts at 0 instead: replies that
/// arrive before the millisecond counter turns over are rejected, replies
/// after it get the full timeout.
pub fn window_start(issued_at: u32, timeout_ms: u32) -> u32 {
    if issued_at.checked_add(timeout_ms).is_none() {
        0
    } else {
        issued_at
    }
}

/// Whether `now` falls outside `[issued_at, issued_at + timeout_ms)`.
pub fn is_verification_expired_at(issued_at: u32, now: u32, timeout_ms: u32) -> bool {
    now < issued_at || now - issued_at >= timeout_ms
}

/// Mix the low byte of the millisecond counter into every random byte.
pub fn whiten(random: &mut [u8; NONCE_SIZE], now_ms: u32) {
    let mix = (now_ms & 0xFF) as u8;
    for byte in random.iter_mut() {
        *byte ^= mix;
    }
}

// ---------------------------------------------------------------------------
// Nonce
// ---------------------------------------------------------------------------

/// A 32-byte single-use nonce buffer with a validity flag.
pub struct Nonce {
    bytes: [u8; NONCE_SIZE],
    valid: bool,
}

impl Nonce {
    pub const fn purged() -> Self {
        Self {
            bytes: [PURGE_BYTE; NONCE_SIZE],
            valid: false,
        }
    }

    /// A nonce holding all 32 bytes as given.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self { bytes, valid: true }
    }

    /// Load a nonce as received over the air: the transmitted prefix, then
    /// [`PURGE_BYTE`] for everything that does not fit in a message.
    pub fn load_wire(&mut self, received: &[u8]) {
        let n = received.len().min(NONCE_WIRE_SIZE);
        self.bytes = [PURGE_BYTE; NONCE_SIZE];
        self.bytes[..n].copy_from_slice(&received[..n]);
        self.valid = true;
    }

    pub fn set(&mut self, bytes: &[u8; NONCE_SIZE]) {
        self.bytes = *bytes;
        self.valid = true;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }

    /// The part of the nonce that is transmitted.
    pub fn wire(&self) -> &[u8] {
        &self.bytes[..NONCE_WIRE_SIZE]
    }

    pub fn purge(&mut self) {
        self.bytes = [PURGE_BYTE; NONCE_SIZE];
        self.valid = false;
    }
}

impl Drop for Nonce {
    fn drop(&mut self) {
        self.purge();
    }
}

impl core::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Nonce").field("valid", &self.valid).finish()
    }
}

// ---------------------------------------------------------------------------
// Nonce manager
// ---------------------------------------------------------------------------

/// Verifier-side state: "verification ongoing" is `AwaitingReply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Idle,
    AwaitingReply { peer: NodeId, issued_at: u32 },
}

pub struct NonceManager {
    timeout_ms: u32,
    verifier: Nonce,
    signer: Nonce,
    signer_received_at: u32,
    verification: Verification,
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new(VERIFICATION_TIMEOUT_MS)
    }
}

impl NonceManager {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            verifier: Nonce::purged(),
            signer: Nonce::purged(),
            signer_received_at: 0,
            verification: Verification::Idle,
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn verification(&self) -> Verification {
        self.verification
    }

    pub fn is_verification_ongoing(&self) -> bool {
        matches!(self.verification, Verification::AwaitingReply { .. })
    }

    pub fn has_signer_nonce(&self) -> bool {
        self.signer.is_valid()
    }

    /// Issue a fresh verifier nonce to `peer` and start the verification window.
    ///
    /// Returns the bytes to transmit. The coprocessor is left idle since the
    /// signed reply is expected shortly.
    ///
    /// # Errors
    ///
    /// [`SigningError::VerificationPending`] while another verification is
    /// still inside its window; [`SigningError::Crypto`] on a device failure.
    pub fn generate_verifier_nonce<D: CryptoDevice>(
        &mut self,
        peer: NodeId,
        now: u32,
        adapter: &mut CryptoAdapter<D>,
    ) -> Result<&[u8], SigningError> {
        self.check_timeout(now);
        if self.is_verification_ongoing() {
            return Err(SigningError::VerificationPending);
        }

        let mut session = adapter.session()?;
        let mut random = session.random()?;
        whiten(&mut random, now);
        let digest = session.sha256(&random);
        random.zeroize();
        let mut digest = digest?;
        session.release_to_idle();

        self.verifier.load_wire(&digest[..NONCE_WIRE_SIZE]);
        digest.zeroize();
        self.verification = Verification::AwaitingReply {
            peer,
            issued_at: window_start(now, self.timeout_ms),
        };
        tracing::debug!(peer = peer.get(), now, "signing: verifier nonce issued");
        Ok(self.verifier.wire())
    }

    /// Store the nonce a peer sent us so the next outgoing signed message
    /// can be signed with it.
    pub fn store_signer_nonce(&mut self, received: &[u8], now: u32) {
        self.signer.load_wire(received);
        self.signer_received_at = now;
        tracing::trace!(len = received.len(), "signing: signer nonce stored");
    }

    /// Enforce the verification window.
    ///
    /// Returns `false` when an ongoing verification has expired; both nonces
    /// are purged in that case. A signer nonce older than the window is
    /// dropped as well.
    pub fn check_timeout(&mut self, now: u32) -> bool {
        if self.signer.is_valid()
            && is_verification_expired_at(
                window_start(self.signer_received_at, self.timeout_ms),
                now,
                self.timeout_ms,
            )
        {
            tracing::debug!("signing: stale signer nonce purged");
            self.signer.purge();
        }

        if let Verification::AwaitingReply { peer, issued_at } = self.verification
            && is_verification_expired_at(issued_at, now, self.timeout_ms)
        {
            tracing::warn!(peer = peer.get(), issued_at, now, "signing: verification timed out");
            self.purge_all();
            return false;
        }
        true
    }

    /// Consume the ongoing verification for a message from `sender`.
    ///
    /// On success the window is closed and the verifier nonce is ready for
    /// exactly one signature computation.
    pub fn claim_verification(&mut self, sender: NodeId, now: u32) -> Result<(), Rejection> {
        let Verification::AwaitingReply { peer, .. } = self.verification else {
            return Err(Rejection::NotOngoing);
        };
        if !self.check_timeout(now) {
            return Err(Rejection::Expired);
        }
        if peer != sender {
            return Err(Rejection::UnexpectedSender {
                expected: peer,
                actual: sender,
            });
        }
        self.verification = Verification::Idle;
        Ok(())
    }

    pub fn purge_all(&mut self) {
        self.verifier.purge();
        self.signer.purge();
        self.verification = Verification::Idle;
    }

    pub(crate) fn verifier_mut(&mut self) -> &mut Nonce {
        &mut self.verifier
    }

    pub(crate) fn signer_mut(&mut self) -> &mut Nonce {
        &mut self.signer
    }

    #[cfg(test)]
    pub(crate) fn verifier(&self) -> &Nonce {
        &self.verifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;
    use sensormesh_crypto::SoftCoprocessor;
    use sensormesh_test_vectors::helpers::{hex_to_32, hex_to_bytes};

    /// Yields the same 32 bytes on every fill.
    struct FixedRng([u8; 32]);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
        }
        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for (d, s) in dest.iter_mut().zip(self.0.iter().cycle()) {
                *d = *s;
            }
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn adapter_with(random: [u8; 32]) -> CryptoAdapter<SoftCoprocessor<FixedRng>> {
        CryptoAdapter::new(SoftCoprocessor::new([0; 32], [0; 9], FixedRng(random)))
    }

    #[test]
    fn test_window_start_collapses_on_wrap() {
        assert_eq!(window_start(1000, 5000), 1000);
        assert_eq!(window_start(u32::MAX - 5000, 5000), u32::MAX - 5000);
        assert_eq!(window_start(u32::MAX - 4999, 5000), 0);
    }

    #[test]
    fn test_expiry_table() {
        let cases: &[(u32, u32, bool)] = &[
            (1000, 1000, false),
            (1000, 5999, false),
            (1000, 6000, true),
            (1000, 6001, true),
            (1000, 999, true),
            (0, 4999, false),
            (0, u32::MAX, true),
        ];
        for &(issued, now, expired) in cases {
            assert_eq!(
                is_verification_expired_at(issued, now, 5000),
                expired,
                "issued={issued} now={now}"
            );
        }
    }

    #[test]
    fn test_whitening_vectors() {
        let vectors = sensormesh_test_vectors::signing::load();
        for v in &vectors.nonce_whitening {
            let random = hex_to_32(&v.random);
            let mut manager = NonceManager::default();
            let mut adapter = adapter_with(random);
            let wire = manager
                .generate_verifier_nonce(NodeId(1), v.now_ms, &mut adapter)
                .unwrap()
                .to_vec();
            assert_eq!(wire, hex_to_bytes(&v.wire), "wire mismatch: {}", v.description);
            assert_eq!(
                manager.verifier().as_bytes(),
                &hex_to_32(&v.nonce),
                "nonce mismatch: {}",
                v.description
            );
        }
    }

    #[test]
    fn test_generate_leaves_device_idle() {
        let mut manager = NonceManager::default();
        let mut adapter = adapter_with([7; 32]);
        manager
            .generate_verifier_nonce(NodeId(1), 10, &mut adapter)
            .unwrap();
        assert_eq!(
            adapter.device().power_state(),
            sensormesh_crypto::PowerState::Idle
        );
    }

    #[test]
    fn test_single_outstanding_challenge() {
        let mut manager = NonceManager::default();
        let mut adapter = adapter_with([7; 32]);
        manager.generate_verifier_nonce(NodeId(1), 0, &mut adapter).unwrap();
        assert!(matches!(
            manager.generate_verifier_nonce(NodeId(2), 100, &mut adapter),
            Err(SigningError::VerificationPending)
        ));
        // Once the window lapses a new challenge may be issued.
        assert!(manager.generate_verifier_nonce(NodeId(2), 5000, &mut adapter).is_ok());
    }

    #[test]
    fn test_store_signer_nonce_fills_tail() {
        let mut manager = NonceManager::default();
        manager.store_signer_nonce(&[0x11; 25], 0);
        assert!(manager.has_signer_nonce());
        let bytes = manager.signer_mut().as_bytes();
        assert!(bytes[..25].iter().all(|&b| b == 0x11));
        assert!(bytes[25..].iter().all(|&b| b == PURGE_BYTE));
    }

    #[test]
    fn test_store_signer_nonce_truncates_long_input() {
        let mut manager = NonceManager::default();
        manager.store_signer_nonce(&[0x22; 40], 0);
        let bytes = manager.signer_mut().as_bytes();
        assert!(bytes[25..].iter().all(|&b| b == PURGE_BYTE));
    }

    #[test]
    fn test_check_timeout_purges_both_nonces() {
        let mut manager = NonceManager::default();
        let mut adapter = adapter_with([7; 32]);
        manager.generate_verifier_nonce(NodeId(1), 1000, &mut adapter).unwrap();
        manager.store_signer_nonce(&[0x11; 25], 1000);

        assert!(manager.check_timeout(5999));
        assert!(manager.is_verification_ongoing());

        assert!(!manager.check_timeout(1000 + 5000 + 1));
        assert!(!manager.is_verification_ongoing());
        assert!(!manager.has_signer_nonce());
        assert!(manager.verifier().as_bytes().iter().all(|&b| b == PURGE_BYTE));
    }

    #[test]
    fn test_check_timeout_idle_is_true() {
        let mut manager = NonceManager::default();
        assert!(manager.check_timeout(123_456));
    }

    #[test]
    fn test_stale_signer_nonce_dropped() {
        let mut manager = NonceManager::default();
        manager.store_signer_nonce(&[0x11; 25], 0);
        assert!(manager.check_timeout(6000));
        assert!(!manager.has_signer_nonce());
    }

    #[test]
    fn test_claim_verification() {
        let mut manager = NonceManager::default();
        let mut adapter = adapter_with([7; 32]);
        assert_eq!(
            manager.claim_verification(NodeId(1), 0),
            Err(Rejection::NotOngoing)
        );

        manager.generate_verifier_nonce(NodeId(1), 0, &mut adapter).unwrap();
        assert_eq!(
            manager.claim_verification(NodeId(2), 10),
            Err(Rejection::UnexpectedSender {
                expected: NodeId(1),
                actual: NodeId(2)
            })
        );
        assert!(manager.is_verification_ongoing());
        assert_eq!(manager.claim_verification(NodeId(1), 10), Ok(()));
        assert!(!manager.is_verification_ongoing());
        assert_eq!(
            manager.claim_verification(NodeId(1), 20),
            Err(Rejection::NotOngoing)
        );
    }

    #[test]
    fn test_claim_after_window_is_expired() {
        let mut manager = NonceManager::default();
        let mut adapter = adapter_with([7; 32]);
        manager.generate_verifier_nonce(NodeId(1), 0, &mut adapter).unwrap();
        assert_eq!(
            manager.claim_verification(NodeId(1), 5001),
            Err(Rejection::Expired)
        );
        assert!(!manager.is_verification_ongoing());
    }

    #[test]
    fn test_nonce_purge_sentinel() {
        let mut nonce = Nonce::from_bytes([0x01; 32]);
        assert!(nonce.is_valid());
        nonce.purge();
        assert!(!nonce.is_valid());
        assert_eq!(nonce.as_bytes(), &[PURGE_BYTE; 32]);
        assert_eq!(format!("{nonce:?}"), "Nonce { valid: false }");
    }
}
