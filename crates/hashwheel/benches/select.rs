// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Benchmarks for ring lookup.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use hashwheel::Wheel;

fn build_wheel(nodes: usize) -> Wheel {
    let mut wheel = Wheel::new(50);
    wheel.add((0..nodes).map(|i| format!("http://cache-{i}:8001")));
    wheel
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for nodes in [3, 16, 64] {
        let wheel = build_wheel(nodes);
        let keys: Vec<String> = (0..1024).map(|i| format!("key-{i}")).collect();

        group.bench_function(format!("{nodes}_nodes"), |b| {
            let mut i = 0;
            b.iter(|| {
                let key = &keys[i % keys.len()];
                i = i.wrapping_add(1);
                black_box(wheel.select(black_box(key)))
            });
        });
    }

    group.finish();
}

fn bench_add(c: &mut Criterion) {
    c.bench_function("add_16_nodes", |b| {
        b.iter(|| {
            let wheel = build_wheel(black_box(16));
            black_box(wheel.len())
        });
    });
}

criterion_group!(benches, bench_select, bench_add);
criterion_main!(benches);
