use std::{hint::black_box, sync::Arc};

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use listpoint::{Consumer, Endpoint, EndpointSettings, Message, StrategyKind};
use listpoint_error::ListpointResult;

/// Журнал без ограничений, поэтому endpoint периодически перезапускается.
const RESTART_EVERY: usize = 100_000;

fn noop_consumers(
    endpoint: &Arc<Endpoint>,
    n: usize,
) -> Vec<Consumer> {
    (0..n)
        .map(|_| {
            let consumer = endpoint.create_consumer(|msg: &Message| -> ListpointResult<()> {
                black_box(msg.len());
                Ok(())
            });
            consumer.start();
            consumer
        })
        .collect()
}

fn bench_send_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("send_broadcast");
    for subs in [0usize, 1, 10, 100] {
        let endpoint = Arc::new(Endpoint::new("bench"));
        endpoint.start();
        let _consumers = noop_consumers(&endpoint, subs);
        let producer = endpoint.create_producer();
        let payload = Bytes::from_static(b"x");
        let mut sent = 0usize;

        group.bench_with_input(BenchmarkId::from_parameter(subs), &subs, |b, _| {
            b.iter(|| {
                producer.send(black_box(Message::new(payload.clone()))).unwrap();
                sent += 1;
                if sent % RESTART_EVERY == 0 {
                    endpoint.stop();
                    endpoint.start();
                }
            })
        });
    }
    group.finish();
}

fn bench_send_round_robin(c: &mut Criterion) {
    let settings = EndpointSettings {
        strategy: StrategyKind::RoundRobin,
        ..EndpointSettings::default()
    };
    let endpoint = Arc::new(Endpoint::with_settings("bench-rr", &settings));
    endpoint.start();
    let _consumers = noop_consumers(&endpoint, 10);
    let producer = endpoint.create_producer();
    let mut sent = 0usize;

    c.bench_function("send_round_robin_10_subs", |b| {
        b.iter(|| {
            producer.send(black_box(Message::new("x"))).unwrap();
            sent += 1;
            if sent % RESTART_EVERY == 0 {
                endpoint.stop();
                endpoint.start();
            }
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    for len in [10usize, 1_000, 10_000] {
        let endpoint = Endpoint::new("bench-snap");
        endpoint.start();
        for _ in 0..len {
            endpoint.on_message(Message::new("x")).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(endpoint.snapshot()))
        });
    }
    group.finish();
}

fn bench_register_deregister(c: &mut Criterion) {
    let endpoint = Arc::new(Endpoint::new("bench-reg"));
    let _background = noop_consumers(&endpoint, 10);

    c.bench_function("consumer_start_stop", |b| {
        b.iter(|| {
            let consumer = endpoint.create_consumer(|_: &Message| -> ListpointResult<()> { Ok(()) });
            black_box(consumer.start());
            consumer.stop();
        })
    });
}

criterion_group!(
    benches,
    bench_send_fanout,
    bench_send_round_robin,
    bench_snapshot,
    bench_register_deregister,
);
criterion_main!(benches);
