// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Weighted consistent hashing over a 32-bit ring.
//!
//! A [`Wheel`] maps arbitrary string keys onto a fixed set of named nodes such that
//! adding a node relocates only a small fraction of the keyspace. Each node is placed
//! on the ring as `replicas` virtual points, which smooths the load distribution across
//! nodes even when the node count is small.
//!
//! # Example
//!
//! ```
//! use hashwheel::Wheel;
//!
//! let mut wheel = Wheel::new(50);
//! wheel.add(["http://cache-a:8001", "http://cache-b:8001"]);
//!
//! let owner = wheel.select("user:42").expect("wheel is not empty");
//! assert!(owner.starts_with("http://cache-"));
//!
//! // Selection is a pure function of the key.
//! assert_eq!(wheel.select("user:42"), Some(owner));
//! ```
//!
//! The default point hash is CRC32/IEEE; [`Wheel::with_hasher`] substitutes any
//! `Fn(&[u8]) -> u32`, which tests use to make placements predictable.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::collections::{HashMap, HashSet};

type Hasher = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// A consistent-hash ring of named nodes.
///
/// The wheel is intended to be configured once (one or more [`add`](Self::add) batches)
/// and then read; it provides no interior synchronization.
pub struct Wheel {
    hasher: Hasher,
    replicas: usize,
    /// Sorted virtual points; the authoritative lookup structure.
    points: Vec<u32>,
    /// Point hash to node name. On hash collision the later insertion wins, which is
    /// acceptable because the replica factor dilutes the impact.
    nodes: HashMap<u32, String>,
}

impl Wheel {
    /// Creates an empty wheel placing `replicas` points per node, hashing with
    /// CRC32/IEEE.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, |data| crc32fast::hash(data))
    }

    /// Creates an empty wheel with a caller-provided point hash.
    ///
    /// # Panics
    ///
    /// Panics if `replicas` is 0.
    #[must_use]
    pub fn with_hasher(replicas: usize, hasher: impl Fn(&[u8]) -> u32 + Send + Sync + 'static) -> Self {
        assert!(replicas > 0, "replicas must be at least 1");
        Self {
            hasher: Box::new(hasher),
            replicas,
            points: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds nodes to the wheel.
    ///
    /// Each node is placed as `replicas` points hashed from `"{name}{i}"` for
    /// `i in 0..replicas`, and the point list is re-sorted.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in nodes {
            let node = node.into();
            for i in 0..self.replicas {
                let point = (self.hasher)(format!("{node}{i}").as_bytes());
                self.points.push(point);
                self.nodes.insert(point, node.clone());
            }
        }
        self.points.sort_unstable();
    }

    /// Returns the node responsible for `key`, or `None` if the wheel is empty.
    ///
    /// The owner is the node bound to the first point at or clockwise of the key's
    /// hash, wrapping to the smallest point past the top of the ring.
    #[must_use]
    pub fn select(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }
        let target = (self.hasher)(key.as_bytes());
        let idx = self.points.partition_point(|&point| point < target);
        let point = self.points[idx % self.points.len()];
        self.nodes.get(&point).map(String::as_str)
    }

    /// Returns true if no nodes have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the number of distinct nodes on the wheel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.values().collect::<HashSet<_>>().len()
    }
}

impl std::fmt::Debug for Wheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wheel")
            .field("replicas", &self.replicas)
            .field("points", &self.points.len())
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}
