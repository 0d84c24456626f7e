use http::StatusCode;
use http::header::AUTHORIZATION;
use serde::Deserialize;

use xfabric_engine::HttpClientConfig;

use crate::error::TransportError;
use crate::outbound::OutboundMessage;

/// Where and how to publish.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Fabric endpoint; the topic path is appended to it.
    pub base_url: String,

    #[serde(flatten)]
    pub http: HttpClientConfig,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: HttpClientConfig::default(),
        }
    }
}

/// Publishes messages to fabric topics over verified TLS.
#[derive(Debug, Clone)]
pub struct FabricClient {
    http: reqwest::Client,
    base_url: String,
}

impl FabricClient {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: config.http.build_client()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `message` to `topic` and return the response status.
    ///
    /// Any status is returned as-is; only transport failures are errors.
    /// Nothing is retried.
    pub async fn post(
        &self,
        topic: &str,
        token: &str,
        message: &OutboundMessage,
    ) -> Result<StatusCode, TransportError> {
        let url = self.topic_url(topic);
        let response = self
            .http
            .post(&url)
            .headers(message.headers()?)
            .header(AUTHORIZATION, format!("Bearer {}", token.trim()))
            .body(message.payload.clone())
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(
            topic,
            %status,
            bytes = message.payload.len(),
            content_type = %message.content_type,
            "posted message"
        );
        Ok(status)
    }

    fn topic_url(&self, topic: &str) -> String {
        if topic.starts_with('/') {
            format!("{}{topic}", self.base_url)
        } else {
            format!("{}/{topic}", self.base_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_urls() {
        let client = FabricClient::new(&TransportConfig::new("https://fabric.example/api/")).unwrap();
        assert_eq!(client.base_url(), "https://fabric.example/api");
        assert_eq!(
            client.topic_url("/orders/created"),
            "https://fabric.example/api/orders/created"
        );
        assert_eq!(client.topic_url("orders"), "https://fabric.example/api/orders");
    }

    #[test]
    fn config_flattens_http_settings() {
        let config: TransportConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://fabric.example",
            "read_timeout_ms": 250
        }))
        .unwrap();
        assert_eq!(config.http.read_timeout_ms, 250);
        assert!(config.http.https_only);
    }
}
