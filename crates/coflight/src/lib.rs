// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalesces duplicate concurrent async computations into a single execution.
//!
//! This crate provides [`Coalescer`], a mechanism for deduplicating concurrent async
//! operations. When multiple tasks request the same work (identified by a key), only the
//! first task (the "leader") performs the actual work while subsequent tasks (the
//! "followers") wait and receive a clone of the result.
//!
//! # When to Use
//!
//! Use a [`Coalescer`] when an expensive operation may be requested concurrently with the
//! same parameters:
//!
//! - **Cache population**: Prevent a thundering herd of loads for one missing entry
//! - **API calls**: Deduplicate concurrent requests to the same endpoint
//! - **Database queries**: Coalesce identical queries issued simultaneously
//!
//! # Example
//!
//! ```
//! use coflight::Coalescer;
//!
//! # futures::executor::block_on(async {
//! let flights: Coalescer<String, String> = Coalescer::new();
//!
//! // Concurrent calls with the same key share a single execution.
//! let result = flights
//!     .run("user:42".to_string(), || async {
//!         // This expensive operation runs only once, even if called concurrently.
//!         "expensive_result".to_string()
//!     })
//!     .await;
//! # });
//! ```
//!
//! # Result Lifetime
//!
//! A result lives only as long as its flight: once the leader publishes and the entry is
//! unlinked, the next call for the same key starts a fresh execution. Nothing is cached,
//! which also means a flight that produces an `Err` does not poison subsequent calls.
//!
//! # Cancellation
//!
//! If the leader's future is dropped before it publishes a result, one waiting follower
//! is promoted to leader and executes its own closure. Followers that joined while the
//! flight was live always observe either the published result or a promotion, never a
//! lost wakeup.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use event_listener::Event;
use parking_lot::Mutex as SyncMutex;

type FlightTable<K, T> = Arc<SyncMutex<HashMap<K, FlightHandle<T>>>>;

/// Represents a class of work and creates a space in which units of work can be
/// executed with duplicate suppression.
///
/// Cloning a `Coalescer` yields a handle to the same flight table; clones coalesce
/// with each other.
#[derive(Debug)]
pub struct Coalescer<K, T> {
    flights: FlightTable<K, T>,
}

impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self {
            flights: Arc::default(),
        }
    }
}

impl<K, T> Clone for Coalescer<K, T> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

/// Shared state of one in-flight execution.
struct Flight<T> {
    /// Written once by the leader, then lock-free reads.
    result: OnceLock<T>,
    /// Wakes followers when the result lands or the leader goes away.
    done: Event,
    /// True while some caller is executing the closure.
    executing: AtomicBool,
}

impl<T> Flight<T> {
    fn new() -> Self {
        Self {
            result: OnceLock::new(),
            done: Event::new(),
            executing: AtomicBool::new(false),
        }
    }
}

/// Table entry pointing at a flight without keeping it alive.
///
/// The strong references live in the participating futures; when every caller has
/// dropped out, the handle dangles and the next arrival starts over.
struct FlightHandle<T> {
    flight: Weak<Flight<T>>,
}

impl<T> FlightHandle<T> {
    fn new() -> (Self, Arc<Flight<T>>) {
        let flight = Arc::new(Flight::new());
        (
            Self {
                flight: Arc::downgrade(&flight),
            },
            flight,
        )
    }
}

impl<T> std::fmt::Debug for FlightHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FlightHandle")
    }
}

/// RAII guard marking the flight as actively executing; cleared on drop.
struct LeaderGuard<T> {
    flight: Option<Arc<Flight<T>>>,
}

impl<T> LeaderGuard<T> {
    /// Tries to claim the leader slot. Fails while another leader is executing.
    fn try_claim(flight: &Arc<Flight<T>>) -> Option<Self> {
        flight
            .executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flight: Some(Arc::clone(flight)),
            })
    }

    /// Consumes the guard without waking anyone (the result has been published).
    fn disarm(mut self) {
        self.flight.take();
    }
}

impl<T> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        if let Some(flight) = &self.flight {
            flight.executing.store(false, Ordering::Release);
            // Leader went away without publishing: wake one follower for promotion.
            if flight.result.get().is_none() {
                flight.done.notify(1);
            }
        }
    }
}

/// Role of a caller in the flight.
enum Role<T, F> {
    /// Executes the closure.
    Leader { func: F, guard: LeaderGuard<T> },
    /// Waits for the leader's result. Keeps its closure for potential promotion.
    Follower { func: F },
}

struct Waiter<K, T, F> {
    role: Role<T, F>,
    flight: Arc<Flight<T>>,
    key: K,
    table: FlightTable<K, T>,
}

impl<K, T, F> Waiter<K, T, F> {
    /// Joins a live flight, as leader if the slot is free (the previous leader may
    /// have been dropped before executing), otherwise as follower.
    fn join(flight: Arc<Flight<T>>, func: F, key: K, table: FlightTable<K, T>) -> Self {
        let role = match LeaderGuard::try_claim(&flight) {
            Some(guard) => Role::Leader { func, guard },
            None => Role::Follower { func },
        };
        Self {
            role,
            flight,
            key,
            table,
        }
    }

    /// Starts a fresh flight; the first caller is always the leader.
    fn lead(flight: Arc<Flight<T>>, func: F, key: K, table: FlightTable<K, T>) -> Self {
        let guard = LeaderGuard::try_claim(&flight).expect("fresh flight must have a free leader slot");
        Self {
            role: Role::Leader { func, guard },
            flight,
            key,
            table,
        }
    }
}

impl<K, T, F, Fut> Waiter<K, T, F>
where
    K: Hash + Eq,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
    T: Clone,
{
    async fn wait(self) -> T {
        let Self {
            role,
            flight,
            key,
            table,
        } = self;
        match role {
            Role::Leader { func, guard } => Self::run_as_leader(flight, key, table, func, guard).await,
            Role::Follower { func } => Self::wait_as_follower(flight, key, table, func).await,
        }
    }

    async fn run_as_leader(flight: Arc<Flight<T>>, key: K, table: FlightTable<K, T>, func: F, guard: LeaderGuard<T>) -> T {
        // A promoted caller may find the result already published (lock-free read).
        if let Some(result) = flight.result.get() {
            guard.disarm();
            return result.clone();
        }

        let value = func().await;

        // Publish before unlinking the table entry, so that any caller that observed
        // the entry still observes the result.
        let _ = flight.result.set(value.clone());
        table.lock().remove(&key);

        // Wake ALL waiting followers.
        flight.done.notify(usize::MAX);
        guard.disarm();

        value
    }

    async fn wait_as_follower(flight: Arc<Flight<T>>, key: K, table: FlightTable<K, T>, func: F) -> T {
        let mut func = Some(func);
        loop {
            // Fast path: result already available.
            if let Some(result) = flight.result.get() {
                return result.clone();
            }

            // Register the listener BEFORE re-checking state to avoid missed wakeups.
            let listener = flight.done.listen();

            if let Some(result) = flight.result.get() {
                return result.clone();
            }

            // The leader dropped without publishing: try to take over. Losing the
            // claim race just means another follower got promoted first.
            if !flight.executing.load(Ordering::Acquire) {
                if let Some(guard) = LeaderGuard::try_claim(&flight) {
                    let func = func.take().expect("promotion happens at most once");
                    return Self::run_as_leader(flight, key, table, func, guard).await;
                }
            }

            listener.await;
        }
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Hash + Eq + Clone,
{
    /// Creates a new `Coalescer`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes `func` for `key`, making sure at most one execution per key is in
    /// flight at a time.
    ///
    /// If a flight for `key` is already running, this caller waits for it instead and
    /// returns a clone of its result. The closure is still consumed in that case; it
    /// only runs if this caller ends up leading (including by promotion after a
    /// dropped leader).
    pub fn run<F, Fut>(&self, key: K, func: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        T: Clone,
    {
        let table = Arc::clone(&self.flights);
        let waiter = {
            let mut flights = self.flights.lock();
            match flights.get_mut(&key) {
                Some(handle) => match handle.flight.upgrade() {
                    // Live flight: join it.
                    Some(flight) => Waiter::join(flight, func, key, table),
                    // Every participant dropped out: restart in place.
                    None => {
                        let (fresh, flight) = FlightHandle::new();
                        *handle = fresh;
                        Waiter::lead(flight, func, key, table)
                    }
                },
                None => {
                    let (handle, flight) = FlightHandle::new();
                    flights.insert(key.clone(), handle);
                    Waiter::lead(flight, func, key, table)
                }
            }
        };
        waiter.wait()
    }
}
