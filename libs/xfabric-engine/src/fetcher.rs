use std::future::Future;

use xfabric_api::{FabricError, Schema};

use crate::config::HttpClientConfig;
use crate::error::EngineError;

/// Retrieves a schema document by URL.
///
/// Implementations must be safe to call concurrently; the cache guarantees
/// at most one in-flight fetch per key but may fetch different keys at once.
pub trait SchemaFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Schema, FabricError>> + Send;
}

/// HTTPS fetcher with bounded connect and read timeouts.
#[derive(Debug, Clone)]
pub struct HttpSchemaFetcher {
    http: reqwest::Client,
}

impl HttpSchemaFetcher {
    pub fn new(config: &HttpClientConfig) -> Result<Self, EngineError> {
        Ok(Self {
            http: config.build_client()?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl SchemaFetcher for HttpSchemaFetcher {
    async fn fetch(&self, url: &str) -> Result<Schema, FabricError> {
        let fail = |detail: String| FabricError::SchemaFetch {
            url: url.to_string(),
            detail,
        };

        tracing::debug!(url, "GET schema");
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| fail(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("unexpected status {status}")));
        }

        let body = response.text().await.map_err(|e| fail(describe(&e)))?;
        Schema::parse_str(&body).map_err(|e| fail(e.to_string()))
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
