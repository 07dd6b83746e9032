// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Benchmarks for the byte-budgeted LRU store.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use hoard::{ByteView, store::Store};

fn bench_insert_with_eviction(c: &mut Criterion) {
    c.bench_function("insert_under_budget_pressure", |b| {
        // Budget for roughly 64 of the 256 distinct entries, so steady-state inserts
        // keep the eviction path hot.
        let mut store = Store::new(64 * 40);
        let payload = ByteView::copied_from_slice(&[0u8; 32]);
        let mut i = 0u32;
        b.iter(|| {
            let key = format!("key-{}", i % 256);
            i = i.wrapping_add(1);
            store.insert(black_box(&key), black_box(payload.clone()));
        });
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("get_hit", |b| {
        let mut store = Store::new(0);
        for i in 0..256 {
            store.insert(&format!("key-{i}"), ByteView::copied_from_slice(&[0u8; 32]));
        }
        let mut i = 0u32;
        b.iter(|| {
            let key = format!("key-{}", i % 256);
            i = i.wrapping_add(1);
            black_box(store.get(black_box(&key)).is_some())
        });
    });
}

criterion_group!(benches, bench_insert_with_eviction, bench_get_hit);
criterion_main!(benches);
