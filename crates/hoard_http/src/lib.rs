// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! HTTP peer transport for the `hoard` cache engine.
//!
//! An [`HttpPool`] is a node's transport identity: it carries the fleet topology (a
//! consistent-hash wheel plus one HTTP client per peer) and the HTTP surface other
//! nodes call into. Install it into a group with
//! [`Group::register_nodes`](hoard::Group::register_nodes) and mount its
//! [`router`](HttpPool::router) on a listener.
//!
//! Peer requests travel as `GET {base}/{group}/{key}` with both path components
//! URL-escaped; the response body is the raw payload.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hoard::{BoxError, Group, LoaderFn};
//! use hoard_http::HttpPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let group = Group::new("scores", 1 << 20, LoaderFn::new(|key: String| async move {
//!     Ok::<_, BoxError>(format!("value for {key}").into_bytes())
//! }));
//!
//! let pool = Arc::new(HttpPool::new("http://127.0.0.1:8001"));
//! pool.set_nodes([
//!     "http://127.0.0.1:8001",
//!     "http://127.0.0.1:8002",
//!     "http://127.0.0.1:8003",
//! ]);
//! group.register_nodes(Arc::clone(&pool) as Arc<dyn hoard::peers::NodePicker>);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8001").await?;
//! axum::serve(listener, pool.router()).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod fetcher;
mod pool;

pub use pool::{DEFAULT_BASE_PATH, HttpPool};
