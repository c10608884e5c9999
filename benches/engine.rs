use std::net::Ipv4Addr;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dns_flood_guard::core::{mitigation_queue, DetectionConfig, DetectionEngine};
use dns_flood_guard::utils::ManualClock;

fn query(name: &str) -> Vec<u8> {
    let mut msg = vec![0u8; 12];
    for label in name.split('.') {
        msg.push(label.len() as u8);
        msg.extend_from_slice(label.as_bytes());
    }
    msg.push(0);
    msg
}

fn engine_benchmark(c: &mut Criterion) {
    let names: Vec<Vec<u8>> = (0..64).map(|i| query(&format!("h{}.example.com", i))).collect();

    c.bench_function("handle_query_hot_path", |b| {
        let clock = ManualClock::new(0);
        let (queue, _requests) = mitigation_queue(1024);
        let engine = DetectionEngine::new(DetectionConfig::default(), Arc::new(clock), queue);
        let mut i = 0usize;
        b.iter(|| {
            i = i.wrapping_add(1);
            let source = Ipv4Addr::new(10, 0, (i >> 8) as u8, i as u8);
            black_box(engine.handle_query(source, &names[i % names.len()]))
        })
    });

    c.bench_function("window_rollover_1000_events", |b| {
        let clock = ManualClock::new(0);
        let (queue, _requests) = mitigation_queue(1024);
        let engine = DetectionEngine::new(DetectionConfig::default(), Arc::new(clock.clone()), queue);
        b.iter(|| {
            for (i, name) in names.iter().cycle().take(1000).enumerate() {
                engine.handle_query(Ipv4Addr::new(10, 0, 0, (i % 200) as u8), name);
            }
            clock.advance(1000);
            black_box(engine.tick())
        })
    });
}

criterion_group!(benches, engine_benchmark);
criterion_main!(benches);
