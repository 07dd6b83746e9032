// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, OnceLock},
};

use coflight::Coalescer;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    cache::SyncCache,
    error::{Error, Result},
    peers::{NodeFetcher, NodePicker},
    view::ByteView,
};

/// Boxed error type accepted from backing loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the authoritative payload for keys this node owns.
///
/// The loader is called once per admitted cache miss; concurrent misses for the same
/// key are coalesced into a single call. The returned buffer becomes cache-owned.
pub trait Loader: Send + Sync {
    /// Loads the payload for `key` from the backing source.
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, std::result::Result<Vec<u8>, BoxError>>;
}

/// Adapts a plain async closure into a [`Loader`].
///
/// # Examples
///
/// ```
/// use hoard::{BoxError, LoaderFn};
///
/// let loader = LoaderFn::new(|key: String| async move {
///     if key == "Tom" {
///         Ok(b"630".to_vec())
///     } else {
///         Err(BoxError::from(format!("{key} is not found")))
///     }
/// });
/// ```
pub struct LoaderFn<F>(F);

impl<F> LoaderFn<F> {
    /// Wraps `func` as a loader.
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Vec<u8>, BoxError>> + Send + 'static,
{
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, std::result::Result<Vec<u8>, BoxError>> {
        Box::pin((self.0)(key.to_owned()))
    }
}

/// The process-wide group directory. Written once per group at startup, read by the
/// transport on every peer request; never torn down.
static GROUPS: LazyLock<RwLock<HashMap<String, Arc<Group>>>> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// A named cache namespace with its own byte budget, loader, and peer topology.
///
/// A `Group` serves reads through a local byte-budgeted LRU shard. On a miss it either
/// fetches the key from the peer that owns it or runs the backing loader, with
/// duplicate concurrent misses for one key collapsed into a single load.
///
/// # Examples
///
/// ```
/// use hoard::{BoxError, Group, LoaderFn};
///
/// # futures::executor::block_on(async {
/// let group = Group::new("scores", 1000, LoaderFn::new(|key: String| async move {
///     Ok::<_, BoxError>(format!("value for {key}").into_bytes())
/// }));
///
/// let view = group.get("Tom").await?;
/// assert_eq!(view.to_string(), "value for Tom");
/// # Ok::<(), hoard::Error>(())
/// # });
/// ```
pub struct Group {
    name: String,
    loader: Box<dyn Loader>,
    cache: SyncCache,
    nodes: OnceLock<Arc<dyn NodePicker>>,
    flights: Coalescer<String, Result<ByteView>>,
}

impl Group {
    /// Creates a group and enters it into the process-wide directory.
    ///
    /// `cache_bytes` is the byte budget of the local shard; 0 disables eviction.
    /// Creating a group under a name that is already registered replaces the
    /// directory entry; holders of the old group keep using it.
    pub fn new(name: impl Into<String>, cache_bytes: u64, loader: impl Loader + 'static) -> Arc<Self> {
        let name = name.into();
        let group = Arc::new(Self {
            name: name.clone(),
            loader: Box::new(loader),
            cache: SyncCache::new(cache_bytes),
            nodes: OnceLock::new(),
            flights: Coalescer::new(),
        });
        GROUPS.write().insert(name, Arc::clone(&group));
        group
    }

    /// Looks a group up in the process-wide directory.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Arc<Group>> {
        GROUPS.read().get(name).cloned()
    }

    /// Returns the group's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs the peer topology. May be called at most once per group.
    ///
    /// # Panics
    ///
    /// Panics on a second call; re-registering the topology is a programming error.
    pub fn register_nodes(&self, picker: Arc<dyn NodePicker>) {
        assert!(self.nodes.set(picker).is_ok(), "register_nodes called more than once");
    }

    /// Reads the value for `key`.
    ///
    /// Serves from the local shard when possible. On a miss the group either fetches
    /// from the owning peer (without entering the local shard) or runs the backing
    /// loader and caches the result; concurrent misses for the same key share one
    /// load.
    ///
    /// # Errors
    ///
    /// Fails on an empty key, or when the key is served locally and the backing
    /// loader fails. Loader failures are not cached.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(view) = self.cache.get(key) {
            debug!(group = %self.name, key, "cache hit");
            return Ok(view);
        }

        self.load(key).await
    }

    /// Coalesced miss path: at most one fetch-or-load per key is in flight at a time.
    async fn load(&self, key: &str) -> Result<ByteView> {
        self.flights
            .run(key.to_owned(), || async move {
                if let Some(picker) = self.nodes.get() {
                    if let Some(fetcher) = picker.pick_node(key) {
                        match self.fetch_from_node(fetcher.as_ref(), key).await {
                            Ok(view) => return Ok(view),
                            Err(error) => {
                                warn!(group = %self.name, key, %error, "peer fetch failed, falling back to loader");
                            }
                        }
                    }
                }
                self.load_locally(key).await
            })
            .await
    }

    /// Fetches the key from the owning peer. The payload is passed through without
    /// entering the local shard: the peer, not this node, is its authoritative home.
    async fn fetch_from_node(&self, fetcher: &dyn NodeFetcher, key: &str) -> std::result::Result<ByteView, crate::peers::FetchError> {
        let payload = fetcher.fetch(&self.name, key).await?;
        Ok(ByteView::from(payload))
    }

    /// Runs the backing loader and caches the produced payload in the local shard.
    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        let payload = self.loader.load(key).await.map_err(|source| Error::Load {
            key: key.to_owned(),
            source: Arc::from(source),
        })?;
        let view = ByteView::from(payload);
        self.cache.insert(key, view.clone());
        Ok(view)
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
