// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Peer-sharded read-through byte cache engine.
//!
//! A fleet of `hoard` nodes shares one keyspace: consistent hashing assigns every key
//! an authoritative home node, each node serves its shard from a byte-budgeted LRU
//! store, and a miss anywhere is filled by asking the owning peer or, at the owner
//! itself, by running a user-supplied backing loader. Duplicate concurrent misses for
//! the same key are collapsed into one load.
//!
//! This crate is the cache engine; the HTTP transport that carries peer requests lives
//! in `hoard_http`.
//!
//! # Reading Through a Group
//!
//! A [`Group`] is a named cache namespace wired to a [`Loader`]:
//!
//! ```
//! use hoard::{BoxError, Group, LoaderFn};
//!
//! # futures::executor::block_on(async {
//! let group = Group::new("scores", 1000, LoaderFn::new(|key: String| async move {
//!     match key.as_str() {
//!         "Tom" => Ok(b"630".to_vec()),
//!         _ => Err(BoxError::from(format!("{key} is not found"))),
//!     }
//! }));
//!
//! // First read runs the loader; the second is served from the local shard.
//! assert_eq!(group.get("Tom").await?.to_string(), "630");
//! assert_eq!(group.get("Tom").await?.to_string(), "630");
//! # Ok::<(), hoard::Error>(())
//! # });
//! ```
//!
//! # Peer Topology
//!
//! Installing a [`peers::NodePicker`] via [`Group::register_nodes`] turns the group
//! into one shard of a fleet: keys the picker assigns elsewhere are fetched from
//! their owning node and passed through without entering the local store.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod peers;
pub mod store;

mod cache;
mod error;
mod group;
mod view;

pub use error::{Error, Result};
pub use group::{BoxError, Group, Loader, LoaderFn};
pub use view::ByteView;
