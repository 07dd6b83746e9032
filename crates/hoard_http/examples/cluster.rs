// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A three-node demo fleet on localhost.
//!
//! Start each node in its own terminal:
//!
//! ```bash
//! cargo run --example cluster -- --port 8001
//! cargo run --example cluster -- --port 8002
//! cargo run --example cluster -- --port 8003 --api
//! ```
//!
//! Then query through the front-end API and watch the key get served by its owning
//! node while duplicate requests collapse into one slow-DB lookup:
//!
//! ```bash
//! curl http://127.0.0.1:9999/api/Tom
//! ```

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{Context, Result, ensure};
use axum::{Router, extract::Path, http::StatusCode, response::IntoResponse, routing::get};
use clap::Parser;
use hoard::{BoxError, Group, LoaderFn};
use hoard_http::HttpPool;
use tokio::net::TcpListener;
use tracing::info;

const NODE_PORTS: [u16; 3] = [8001, 8002, 8003];
const API_ADDR: &str = "127.0.0.1:9999";

#[derive(Debug, Parser)]
#[command(about = "One node of a three-node hoard demo fleet")]
struct Args {
    /// Cache node port; one of 8001, 8002 or 8003.
    #[arg(long, default_value_t = 8001)]
    port: u16,

    /// Also serve the front-end API on port 9999.
    #[arg(long)]
    api: bool,
}

/// The "slow database" backing the fleet.
fn sample_db() -> HashMap<&'static str, &'static str> {
    HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")])
}

fn create_group() -> Arc<Group> {
    let db = sample_db();
    Group::new(
        "scores",
        2 << 10,
        LoaderFn::new(move |key: String| {
            let db = db.clone();
            async move {
                info!(key, "slow db lookup");
                tokio::time::sleep(Duration::from_secs(1)).await;
                match db.get(key.as_str()) {
                    Some(value) => Ok(value.as_bytes().to_vec()),
                    None => Err(BoxError::from(format!("{key} is not found"))),
                }
            }
        }),
    )
}

/// Serves `GET /api/{key}` by reading through the group.
fn api_router(group: Arc<Group>) -> Router {
    Router::new().route(
        "/api/{key}",
        get(move |Path(key): Path<String>| {
            let group = Arc::clone(&group);
            async move {
                match group.get(&key).await {
                    Ok(view) => view.to_vec().into_response(),
                    Err(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response(),
                }
            }
        }),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    ensure!(NODE_PORTS.contains(&args.port), "--port must be one of {NODE_PORTS:?}");

    let endpoints = NODE_PORTS.map(|port| format!("http://127.0.0.1:{port}"));
    let self_endpoint = format!("http://127.0.0.1:{}", args.port);

    let group = create_group();
    let pool = Arc::new(HttpPool::new(self_endpoint.clone()));
    pool.set_nodes(endpoints);
    group.register_nodes(Arc::clone(&pool) as Arc<dyn hoard::peers::NodePicker>);

    if args.api {
        let api = api_router(Arc::clone(&group));
        tokio::spawn(async move {
            let listener = TcpListener::bind(API_ADDR).await.expect("bind the api listener");
            info!("api server listening on http://{API_ADDR}");
            axum::serve(listener, api).await.expect("api server runs");
        });
    }

    let addr = format!("127.0.0.1:{}", args.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    info!(%self_endpoint, "cache node listening");
    axum::serve(listener, pool.router()).await.context("cache server runs")?;
    Ok(())
}
