use criterion::{Criterion, criterion_group, criterion_main};
use sensormesh_core::constants::MAX_PAYLOAD;
use sensormesh_core::{Command, Message, NodeId};

fn bench_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("message");

    let mut msg = Message::new(NodeId(5), NodeId(0), Command::Set, 0, 1)
        .with_payload(&[0xAB; 20])
        .unwrap();
    msg.set_signed(true);
    let bytes = msg.to_bytes();

    group.bench_function("to_bytes", |b| b.iter(|| msg.to_bytes()));
    group.bench_function("from_bytes", |b| {
        b.iter(|| Message::from_bytes(&bytes).unwrap())
    });
    group.bench_function("signed_region", |b| b.iter(|| msg.signed_region()));
    group.bench_function("set_payload_max", |b| {
        let mut m = msg.clone();
        b.iter(|| m.set_payload(&[0x11; MAX_PAYLOAD]).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_message);
criterion_main!(benches);
