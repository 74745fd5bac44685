//! End-to-end signing scenarios between two nodes sharing a coprocessor secret.

use rand::SeedableRng;
use rand::rngs::StdRng;
use sensormesh_core::{Command, Message, NodeId, Serial};
use sensormesh_crypto::{CryptoAdapter, CryptoError, SoftCoprocessor};
use sensormesh_signing::{
    MessageSigner, Rejection, SignerConfig, SigningError, Whitelist, WhitelistEntry,
};

type Signer = MessageSigner<SoftCoprocessor<StdRng>>;

const SECRET: [u8; 32] = [0x5C; 32];
const GATEWAY: NodeId = NodeId(0);
const SENSOR: NodeId = NodeId(5);
const SENSOR_SERIAL: [u8; 9] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x01];

fn signer(address: NodeId, serial: [u8; 9], config: SignerConfig) -> Signer {
    let device = SoftCoprocessor::new(SECRET, serial, StdRng::seed_from_u64(address.get() as u64));
    let mut signer = MessageSigner::new(CryptoAdapter::new(device), config);
    signer.initialize(address).unwrap();
    signer
}

fn reading(payload: &[u8]) -> Message {
    Message::new(SENSOR, GATEWAY, Command::Set, 0, 1)
        .with_payload(payload)
        .unwrap()
}

/// Gateway challenges the sensor; the sensor signs `msg` with the nonce.
fn challenge_and_sign(gateway: &mut Signer, sensor: &mut Signer, msg: &mut Message, now: u32) {
    let nonce = gateway
        .generate_verifier_nonce(msg.sender, now)
        .unwrap()
        .to_vec();
    sensor.store_signer_nonce(&nonce, now);
    sensor.sign(msg).unwrap();
}

fn enforced_whitelist(serial: [u8; 9]) -> SignerConfig {
    SignerConfig {
        whitelist: Whitelist::enforced(vec![WhitelistEntry {
            node_id: SENSOR,
            serial: Serial::new(serial),
        }]),
        ..SignerConfig::default()
    }
}

fn salting_sensor() -> Signer {
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    sensor.require_salting_for(GATEWAY);
    sensor
}

#[test]
fn signed_message_verifies() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");

    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 1000);
    assert!(msg.is_signed());
    assert_eq!(msg.trailer()[0], 0x01);
    assert_eq!(gateway.verify(&msg, 1200), Ok(()));
}

#[test]
fn signed_message_survives_the_wire() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"hello");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    let mut wire = msg.to_bytes();
    assert_eq!(wire.len(), 32);
    // A relay rewrites the first byte; it is not covered by the signature.
    wire[0] = 9;
    let received = Message::from_bytes(&wire).unwrap();
    assert_eq!(gateway.verify(&received, 10), Ok(()));
}

#[test]
fn replayed_message_is_rejected() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    assert_eq!(gateway.verify(&msg, 10), Ok(()));
    assert_eq!(gateway.verify(&msg, 20), Err(Rejection::NotOngoing));
}

#[test]
fn verification_window_boundaries() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());

    let mut msg = reading(b"1");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 1000);
    assert_eq!(gateway.verify(&msg, 5999), Ok(()));

    let mut msg = reading(b"2");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 10_000);
    assert_eq!(gateway.verify(&msg, 15_000), Err(Rejection::Expired));
}

#[test]
fn timed_out_verification_rejects_late_reply() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    assert!(gateway.check_timeout(4999));
    assert!(!gateway.check_timeout(5000));
    assert!(!gateway.nonces().is_verification_ongoing());
    assert_eq!(gateway.verify(&msg, 5001), Err(Rejection::NotOngoing));
}

#[test]
fn reply_from_other_node_keeps_verification_open() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    let mut forged = msg.clone();
    forged.sender = NodeId(7);
    assert_eq!(
        gateway.verify(&forged, 10),
        Err(Rejection::UnexpectedSender {
            expected: SENSOR,
            actual: NodeId(7)
        })
    );
    assert_eq!(gateway.verify(&msg, 20), Ok(()));
}

#[test]
fn tampered_payload_is_rejected() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    let mut wire = msg.to_bytes();
    wire[7] ^= 0x01;
    let tampered = Message::from_bytes(&wire).unwrap();
    assert_eq!(gateway.verify(&tampered, 10), Err(Rejection::Mismatch));
    // The attempt consumed the verification.
    assert_eq!(gateway.verify(&msg, 20), Err(Rejection::NotOngoing));
}

#[test]
fn unsigned_message_is_rejected() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    gateway.generate_verifier_nonce(SENSOR, 0).unwrap();
    assert_eq!(
        gateway.verify(&reading(b"23.5"), 10),
        Err(Rejection::NotSigned)
    );
    assert!(gateway.nonces().is_verification_ongoing());
}

#[test]
fn unknown_identifier_is_rejected() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    msg.trailer_mut()[0] = 0x02;
    assert_eq!(gateway.verify(&msg, 10), Err(Rejection::BadIdentifier(0x02)));
}

#[test]
fn largest_signable_payload_carries_two_signature_bytes() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(&[0x42; 23]);
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    assert_eq!(msg.trailer().len(), 2);
    assert_eq!(gateway.verify(&msg, 10), Ok(()));
}

#[test]
fn oversized_payload_is_not_signed() {
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    sensor.store_signer_nonce(&[0x11; 25], 0);
    let mut msg = reading(&[0x42; 24]);
    let before = msg.clone();

    assert!(matches!(
        sensor.sign(&mut msg),
        Err(SigningError::PayloadTooLarge { len: 24, max: 23 })
    ));
    assert_eq!(msg, before);
    assert!(!msg.is_signed());
}

#[test]
fn signing_without_nonce_fails() {
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    assert!(matches!(
        sensor.sign(&mut msg),
        Err(SigningError::MissingNonce)
    ));
    assert!(!msg.is_signed());
}

#[test]
fn signer_nonce_is_single_use() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    let mut second = reading(b"24.0");
    assert!(matches!(
        sensor.sign(&mut second),
        Err(SigningError::MissingNonce)
    ));
}

#[test]
fn whitelisted_sender_verifies() {
    let mut gateway = signer(GATEWAY, [0; 9], enforced_whitelist(SENSOR_SERIAL));
    let mut sensor = salting_sensor();
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);
    assert_eq!(gateway.verify(&msg, 10), Ok(()));
}

#[test]
fn whitelist_with_wrong_serial_rejects() {
    let mut gateway = signer(GATEWAY, [0; 9], enforced_whitelist([0xEE; 9]));
    let mut sensor = salting_sensor();
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);
    assert_eq!(gateway.verify(&msg, 10), Err(Rejection::Mismatch));
}

#[test]
fn unsalted_signature_rejected_when_whitelist_enforced() {
    let mut gateway = signer(GATEWAY, [0; 9], enforced_whitelist(SENSOR_SERIAL));
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);
    assert_eq!(gateway.verify(&msg, 10), Err(Rejection::Mismatch));
}

#[test]
fn sender_missing_from_whitelist_rejects() {
    let config = SignerConfig {
        whitelist: Whitelist::enforced(vec![WhitelistEntry {
            node_id: NodeId(6),
            serial: Serial::new(SENSOR_SERIAL),
        }]),
        ..SignerConfig::default()
    };
    let mut gateway = signer(GATEWAY, [0; 9], config);
    let mut sensor = salting_sensor();
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);
    assert_eq!(
        gateway.verify(&msg, 10),
        Err(Rejection::NotWhitelisted(SENSOR))
    );
}

#[test]
fn salted_signatures_depend_on_device_serial() {
    let nonce = [0x3C; 25];
    let mut first = salting_sensor();
    let mut second = signer(SENSOR, [0x77; 9], SignerConfig::default());
    second.require_salting_for(GATEWAY);

    let mut a = reading(b"23.5");
    let mut b = reading(b"23.5");
    first.store_signer_nonce(&nonce, 0);
    second.store_signer_nonce(&nonce, 0);
    first.sign(&mut a).unwrap();
    second.sign(&mut b).unwrap();
    assert_ne!(a.trailer(), b.trailer());
}

#[test]
fn coprocessor_failure_during_verify() {
    let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    let mut msg = reading(b"23.5");
    challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

    gateway.adapter_mut().device_mut().set_faulted(true);
    assert_eq!(gateway.verify(&msg, 10), Err(Rejection::CryptoUnavailable));
    assert!(!gateway.nonces().is_verification_ongoing());
}

#[test]
fn coprocessor_failure_during_sign() {
    let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
    sensor.store_signer_nonce(&[0x11; 25], 0);
    sensor.adapter_mut().device_mut().set_faulted(true);

    let mut msg = reading(b"23.5");
    assert!(matches!(
        sensor.sign(&mut msg),
        Err(SigningError::Crypto(CryptoError::Unavailable))
    ));
    assert!(!msg.is_signed());
    assert!(!sensor.nonces().has_signer_nonce());
}

#[test]
fn generate_requires_initialized_backend() {
    let device = SoftCoprocessor::new(SECRET, [0; 9], StdRng::seed_from_u64(1));
    let mut gateway = MessageSigner::new(CryptoAdapter::new(device), SignerConfig::default());
    assert!(matches!(
        gateway.generate_verifier_nonce(SENSOR, 0),
        Err(SigningError::NotInitialized)
    ));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn any_signed_bit_flip_is_rejected(
            payload in proptest::collection::vec(any::<u8>(), 0..=23),
            bit in 8usize..(32 * 8),
        ) {
            let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
            let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
            let mut msg = reading(&payload);
            challenge_and_sign(&mut gateway, &mut sensor, &mut msg, 0);

            let mut wire = msg.to_bytes();
            wire[bit / 8] ^= 1 << (bit % 8);
            if let Ok(received) = Message::from_bytes(&wire) {
                prop_assert!(gateway.verify(&received, 10).is_err());
            }
        }

        #[test]
        fn verify_accepts_inside_window(now in 0u32..u32::MAX - 5000, delay in 0u32..5000) {
            let mut gateway = signer(GATEWAY, [0; 9], SignerConfig::default());
            let mut sensor = signer(SENSOR, SENSOR_SERIAL, SignerConfig::default());
            let mut msg = reading(b"23.5");
            challenge_and_sign(&mut gateway, &mut sensor, &mut msg, now);
            prop_assert_eq!(gateway.verify(&msg, now + delay), Ok(()));
        }
    }
}
