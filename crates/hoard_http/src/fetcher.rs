// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use futures::future::BoxFuture;
use hoard::peers::{FetchError, NodeFetcher};

/// Fetches `(group, key)` payloads from one remote node over HTTP.
pub(crate) struct HttpFetcher {
    client: reqwest::Client,
    /// The node's endpoint, e.g. `http://127.0.0.1:8002`.
    endpoint: String,
    base_path: String,
}

impl HttpFetcher {
    pub(crate) fn new(client: reqwest::Client, endpoint: String, base_path: String) -> Self {
        Self {
            client,
            endpoint,
            base_path,
        }
    }
}

impl NodeFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, group: &'a str, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let url = format!(
                "{}{}/{}/{}",
                self.endpoint,
                self.base_path,
                urlencoding::encode(group),
                urlencoding::encode(key),
            );

            let response = self
                .client
                .get(url.as_str())
                .send()
                .await
                .map_err(|source| FetchError::new(&self.endpoint, source))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::new(&self.endpoint, format!("node returned {status}")));
            }

            let payload = response
                .bytes()
                .await
                .map_err(|source| FetchError::new(&self.endpoint, source))?;
            Ok(payload.to_vec())
        })
    }
}
