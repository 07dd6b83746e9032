// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Peer-selection capabilities consumed by [`Group`](crate::Group).
//!
//! A group that has a [`NodePicker`] registered asks it, on every cache miss, whether
//! the missed key belongs to a remote node. The picker answers with a [`NodeFetcher`]
//! bound to the owning node, or with `None` when the key should be served locally,
//! either because this node owns it or because no topology is configured at all.
//!
//! The transport behind a fetcher is opaque to the cache engine; its whole contract is
//! "return the raw payload or fail", and any failure is recoverable (the group falls
//! back to its own loader).

use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

/// Selects the node responsible for a key.
pub trait NodePicker: Send + Sync {
    /// Returns a fetcher bound to the remote node that owns `key`, or `None` when the
    /// key is served locally.
    fn pick_node(&self, key: &str) -> Option<Arc<dyn NodeFetcher>>;
}

/// Retrieves one group's payload for a key from a remote node.
pub trait NodeFetcher: Send + Sync {
    /// Fetches the payload for `key` in `group` from the node this fetcher is bound to.
    fn fetch<'a>(&'a self, group: &'a str, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// A failed attempt to fetch a key from a remote node.
///
/// Recoverable by design: the group logs the failure and falls back to its local
/// loader, so a dead peer degrades throughput rather than availability.
#[derive(Clone, Debug, Error)]
#[error("fetch from node {endpoint} failed")]
pub struct FetchError {
    endpoint: String,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync>,
}

impl FetchError {
    /// Creates an error for a failed fetch against `endpoint`.
    pub fn new(endpoint: impl Into<String>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            source: Arc::from(source.into()),
        }
    }

    /// The endpoint of the node the fetch was sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
