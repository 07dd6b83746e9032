// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for [`Coalescer::run()`].

use std::{
    sync::{
        Arc,
        atomic::{
            AtomicUsize,
            Ordering::{AcqRel, Acquire},
        },
    },
    time::Duration,
};

use coflight::Coalescer;
use futures::{StreamExt, stream::FuturesUnordered};
use static_assertions::assert_impl_all;

fn unreachable_future() -> std::future::Pending<String> {
    std::future::pending()
}

#[test]
fn thread_safe_type() {
    assert_impl_all!(Coalescer<String, String>: Send, Sync);
}

#[tokio::test]
async fn direct_call() {
    let flights = Coalescer::<String, String>::new();
    let result = flights
        .run("key".to_string(), || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "Result".to_string()
        })
        .await;
    assert_eq!(result, "Result");
}

#[tokio::test]
async fn parallel_callers_share_one_execution() {
    let call_counter = AtomicUsize::default();

    let flights = Coalescer::<String, String>::new();
    let futures = FuturesUnordered::new();
    for _ in 0..50 {
        futures.push(flights.run("key".to_string(), || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            call_counter.fetch_add(1, AcqRel);
            "Result".to_string()
        }));
    }

    assert!(futures.all(|out| async move { out == "Result" }).await);
    assert_eq!(call_counter.load(Acquire), 1);
}

#[tokio::test]
async fn sequential_calls_execute_again() {
    let call_counter = AtomicUsize::default();

    let flights = Coalescer::<String, String>::new();
    for _ in 0..3 {
        let result = flights
            .run("key".to_string(), || async {
                call_counter.fetch_add(1, AcqRel);
                "Result".to_string()
            })
            .await;
        assert_eq!(result, "Result");
    }

    // Each completed flight is unlinked; nothing is retained between calls.
    assert_eq!(call_counter.load(Acquire), 3);
}

#[tokio::test]
async fn errors_are_shared_but_not_retained() {
    let call_counter = Arc::new(AtomicUsize::default());

    let flights = Coalescer::<String, Result<String, String>>::new();

    // Two overlapping callers observe the same failure...
    let futures = FuturesUnordered::new();
    for _ in 0..2 {
        let call_counter = Arc::clone(&call_counter);
        futures.push(flights.run("key".to_string(), move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            call_counter.fetch_add(1, AcqRel);
            Err("boom".to_string())
        }));
    }
    assert!(futures.all(|out| async move { out == Err("boom".to_string()) }).await);
    assert_eq!(call_counter.load(Acquire), 1);

    // ...and the next call runs afresh.
    let result = flights
        .run("key".to_string(), || async { Ok("recovered".to_string()) })
        .await;
    assert_eq!(result, Ok("recovered".to_string()));
    assert_eq!(call_counter.load(Acquire), 1);
}

#[tokio::test]
async fn late_joiner_still_observes_result() {
    let flights = Coalescer::<String, String>::new();
    let fut_early = flights.run("key".to_string(), || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        "Result".to_string()
    });
    let fut_late = flights.run("key".to_string(), unreachable_future);
    assert_eq!(fut_early.await, "Result");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fut_late.await, "Result");
}

#[tokio::test]
async fn dropped_leader_promotes_a_follower() {
    let flights = Coalescer::<String, String>::new();

    // The leader is cancelled; the next caller starts its own execution.
    let fut_cancel = flights.run("key".to_string(), unreachable_future);
    let _ = tokio::time::timeout(Duration::from_millis(10), fut_cancel).await;
    let fut_late = flights.run("key".to_string(), || async { "Result2".to_string() });
    assert_eq!(fut_late.await, "Result2");

    // A slow but undropped leader keeps the lead; the follower's closure never runs.
    let begin = tokio::time::Instant::now();
    let fut_1 = flights.run("key".to_string(), || async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        "Result1".to_string()
    });
    let fut_2 = flights.run("key".to_string(), unreachable_future);
    let (v1, v2) = tokio::join!(fut_1, fut_2);
    assert_eq!(v1, "Result1");
    assert_eq!(v2, "Result1");
    assert!(begin.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
async fn call_with_custom_key() {
    #[derive(Clone, PartialEq, Eq, Hash)]
    struct K(i32);
    let flights = Coalescer::<K, String>::new();
    let result = flights
        .run(K(1), || async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            "Result".to_string()
        })
        .await;
    assert_eq!(result, "Result");
}

#[tokio::test]
async fn clone_shares_the_flight_table() {
    let flights_1 = Coalescer::<String, String>::new();
    let flights_2 = flights_1.clone();

    let call_counter = AtomicUsize::default();

    let fut_1 = flights_1.run("key".to_string(), || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        call_counter.fetch_add(1, AcqRel);
        "Result".to_string()
    });
    let fut_2 = flights_2.run("key".to_string(), || async {
        call_counter.fetch_add(1, AcqRel);
        "Unreachable".to_string()
    });

    let (r1, r2) = tokio::join!(fut_1, fut_2);
    assert_eq!(r1, "Result");
    assert_eq!(r2, "Result");
    assert_eq!(call_counter.load(Acquire), 1);
}

#[tokio::test]
async fn debug_impl() {
    let flights: Coalescer<String, String> = Coalescer::new();

    let debug_str = format!("{flights:?}");
    assert!(debug_str.contains("Coalescer"));

    let fut = flights.run("key".to_string(), || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        "Result".to_string()
    });

    // Debug still works with an entry in the table.
    let debug_str = format!("{flights:?}");
    assert!(debug_str.contains("FlightHandle"));

    assert_eq!(fut.await, "Result");
}
