// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use hashwheel::Wheel;
use hoard::{
    Group,
    peers::{NodeFetcher, NodePicker},
};
use parking_lot::Mutex;
use tracing::debug;

use crate::fetcher::HttpFetcher;

/// Path prefix under which peer requests are served.
pub const DEFAULT_BASE_PATH: &str = "/_hoard";

/// Virtual points placed per node on the wheel.
const DEFAULT_REPLICAS: usize = 50;

/// Topology snapshot: the wheel and the per-node fetchers always change together.
struct Topology {
    wheel: Wheel,
    fetchers: HashMap<String, Arc<HttpFetcher>>,
}

/// A node's HTTP transport identity: peer picker and peer-facing server in one.
///
/// The pool knows the whole fleet (via [`set_nodes`](Self::set_nodes)) and which
/// member this node is, so it can answer "who owns this key" with either "you do" or
/// a fetcher bound to the owning peer. Its [`router`](Self::router) serves the same
/// protocol to the other nodes.
pub struct HttpPool {
    self_endpoint: String,
    base_path: String,
    client: reqwest::Client,
    topology: Mutex<Topology>,
}

impl HttpPool {
    /// Creates a pool for the node reachable at `self_endpoint` (e.g.
    /// `http://10.0.0.1:8001`), serving peers under [`DEFAULT_BASE_PATH`].
    #[must_use]
    pub fn new(self_endpoint: impl Into<String>) -> Self {
        Self::with_base_path(self_endpoint, DEFAULT_BASE_PATH)
    }

    /// Creates a pool serving peers under a custom base path.
    ///
    /// # Panics
    ///
    /// Panics if `base_path` does not start with `/` or is only `/`.
    #[must_use]
    pub fn with_base_path(self_endpoint: impl Into<String>, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        assert!(
            base_path.starts_with('/') && base_path.len() > 1,
            "base path must start with '/' and name a prefix"
        );
        Self {
            self_endpoint: self_endpoint.into(),
            base_path: base_path.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
            topology: Mutex::new(Topology {
                wheel: Wheel::new(DEFAULT_REPLICAS),
                fetchers: HashMap::new(),
            }),
        }
    }

    /// Installs the fleet topology, replacing any previous one.
    ///
    /// Rebuilds the wheel and the per-node fetcher table in one step; `nodes` should
    /// list every fleet member's endpoint, normally including this node's own.
    pub fn set_nodes<I, S>(&self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nodes: Vec<String> = nodes.into_iter().map(Into::into).collect();

        let mut wheel = Wheel::new(DEFAULT_REPLICAS);
        wheel.add(nodes.iter().cloned());

        let fetchers = nodes
            .into_iter()
            .map(|node| {
                let fetcher = HttpFetcher::new(self.client.clone(), node.clone(), self.base_path.clone());
                (node, Arc::new(fetcher))
            })
            .collect();

        *self.topology.lock() = Topology { wheel, fetchers };
    }

    /// Returns the router serving peer requests at `{base}/{group}/{key}`.
    ///
    /// Dispatch goes through the process-wide group directory, so every group
    /// registered in this process is reachable through one router.
    #[must_use]
    pub fn router(&self) -> Router {
        let peer_routes = Router::new().route("/{group}/{key}", get(serve_key));
        Router::new().nest(&self.base_path, peer_routes)
    }
}

impl NodePicker for HttpPool {
    fn pick_node(&self, key: &str) -> Option<Arc<dyn NodeFetcher>> {
        let topology = self.topology.lock();
        let node = topology.wheel.select(key)?;
        if node == self.self_endpoint {
            return None;
        }
        debug!(node, key, "picked remote node");
        topology.fetchers.get(node).map(|fetcher| Arc::clone(fetcher) as Arc<dyn NodeFetcher>)
    }
}

impl std::fmt::Debug for HttpPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPool")
            .field("self_endpoint", &self.self_endpoint)
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

/// Serves one peer request: look the group up, read the key, return the raw payload.
async fn serve_key(Path((group_name, key)): Path<(String, String)>) -> Response {
    debug!(group = %group_name, key = %key, "serving peer request");

    let Some(group) = Group::lookup(&group_name) else {
        return (StatusCode::NOT_FOUND, format!("no such group: {group_name}")).into_response();
    };

    match group.get(&key).await {
        Ok(view) => ([(header::CONTENT_TYPE, "application/octet-stream")], view.to_vec()).into_response(),
        Err(error) => (StatusCode::NOT_FOUND, error.to_string()).into_response(),
    }
}
