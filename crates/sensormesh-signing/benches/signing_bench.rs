use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sensormesh_core::{Command, Message, NodeId};
use sensormesh_crypto::{CryptoAdapter, SoftCoprocessor};
use sensormesh_signing::{MessageSigner, Nonce, SignerConfig, hmac_chain};

fn make_signer(address: u8) -> MessageSigner<SoftCoprocessor<StdRng>> {
    let device = SoftCoprocessor::new([0x42; 32], [address; 9], StdRng::seed_from_u64(0));
    let mut signer = MessageSigner::new(CryptoAdapter::new(device), SignerConfig::default());
    signer.initialize(NodeId(address)).unwrap();
    signer
}

fn bench_hmac_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("hmac_chain");
    let mut adapter = CryptoAdapter::new(SoftCoprocessor::new(
        [0x42; 32],
        [0x01; 9],
        StdRng::seed_from_u64(0),
    ));

    for len in [10usize, 31, 64, 96] {
        let region = vec![0xABu8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &region, |b, r| {
            b.iter(|| {
                let mut nonce = Nonce::from_bytes([0x13; 32]);
                let mut session = adapter.session().unwrap();
                hmac_chain(&mut session, &mut nonce, r).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_sign_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("signing");
    let mut gateway = make_signer(0);
    let mut sensor = make_signer(5);

    group.bench_function("challenge_sign_verify", |b| {
        let mut now = 0u32;
        b.iter(|| {
            now = now.wrapping_add(1);
            let nonce = gateway
                .generate_verifier_nonce(NodeId(5), now)
                .unwrap()
                .to_vec();
            sensor.store_signer_nonce(&nonce, now);
            let mut msg = Message::new(NodeId(5), NodeId(0), Command::Set, 0, 1)
                .with_payload(b"23.5")
                .unwrap();
            sensor.sign(&mut msg).unwrap();
            gateway.verify(&msg, now).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_hmac_chain, bench_sign_verify);
criterion_main!(benches);
