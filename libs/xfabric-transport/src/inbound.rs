use std::sync::Arc;

use bytes::Bytes;
use http::HeaderMap;
use subtle::ConstantTimeEq;

use xfabric_api::{ContentType, FabricError, Record, Schema};
use xfabric_engine::codec;
use xfabric_engine::{MessageDecoder, SchemaFetcher, WireEnvelope};

use crate::error::TransportError;
use crate::headers;

/// A message delivered by the fabric: the request path names the topic,
/// headers carry the metadata and the body is the payload.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub content_type: ContentType,
    pub authorization: Option<String>,
    pub tenant_id: Option<String>,
    pub publisher: Option<String>,
    pub publisher_pseudonym: Option<String>,
    pub message_guid: Option<String>,
    pub schema_uri: Option<String>,
    pub schema_version: Option<String>,
    pub result_correlation_id: Option<String>,
    pub payload: Bytes,
}

impl InboundMessage {
    /// Build from request parts. The content type must be one of the two wire
    /// forms; everything else is optional here and checked where it is used.
    pub fn from_parts(
        path: &str,
        headers: &HeaderMap,
        body: impl Into<Bytes>,
    ) -> Result<Self, TransportError> {
        let content_type = header(headers, "content-type")?
            .ok_or(TransportError::MissingHeader("content-type"))?;
        let content_type = ContentType::from_header(&content_type)?;

        Ok(Self {
            topic: path.to_string(),
            content_type,
            authorization: header(headers, "authorization")?,
            tenant_id: header(headers, headers::TENANT_ID)?,
            publisher: header(headers, headers::PUBLISHER)?,
            publisher_pseudonym: header(headers, headers::PUBLISHER_PSEUDONYM)?,
            message_guid: header(headers, headers::MESSAGE_GUID)?,
            schema_uri: header(headers, headers::SCHEMA_URI)?,
            schema_version: header(headers, headers::SCHEMA_VERSION)?,
            result_correlation_id: header(headers, headers::RESULT_CORRELATION_ID)?,
            payload: body.into(),
        })
    }

    /// Published by the fabric itself rather than another tenant.
    pub fn is_fabric_system_message(&self) -> bool {
        headers::SYSTEM_TOPICS.contains(&self.topic.as_str())
    }

    /// Token from the `Authorization` header, without the `Bearer` scheme.
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization.as_deref().map(strip_bearer)
    }

    /// Whether the request carries `expected` as its bearer token.
    pub fn is_authorized(&self, expected: &str) -> bool {
        token_matches(self.authorization.as_deref(), expected)
    }

    /// Decoding metadata. Requires the schema version header.
    pub fn envelope(&self) -> Result<WireEnvelope<'_>, TransportError> {
        let schema_version = self
            .schema_version
            .as_deref()
            .ok_or(TransportError::MissingHeader(headers::SCHEMA_VERSION))?;
        Ok(WireEnvelope {
            topic: &self.topic,
            schema_version,
            schema_uri: self.schema_uri.as_deref(),
            content_type: self.content_type,
            payload: &self.payload,
        })
    }

    pub async fn decode<F: SchemaFetcher>(
        &self,
        decoder: &MessageDecoder<F>,
        reader: &Arc<Schema>,
    ) -> Result<Record, TransportError> {
        Ok(decoder.decode(&self.envelope()?, reader).await?)
    }

    /// Decode into `reader` and render in the textual form.
    pub async fn as_json_string<F: SchemaFetcher>(
        &self,
        decoder: &MessageDecoder<F>,
        reader: &Arc<Schema>,
    ) -> Result<String, TransportError> {
        Ok(decoder
            .message_as_json_string(&self.envelope()?, reader)
            .await?)
    }

    /// Textual payload re-emitted without a schema.
    pub fn raw_json_string(&self) -> Result<String, FabricError> {
        codec::raw_json_string(&self.payload, self.content_type)
    }
}

fn header(headers: &HeaderMap, name: &'static str) -> Result<Option<String>, TransportError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|e| TransportError::InvalidHeader {
        name,
        detail: e.to_string(),
    })?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// Check the `Authorization` header of a request that has not been parsed
/// yet, so unauthenticated callers learn nothing about their payload.
pub fn is_authorized_request(headers: &HeaderMap, expected: &str) -> bool {
    let presented = headers.get("authorization").and_then(|v| v.to_str().ok());
    token_matches(presented, expected)
}

fn token_matches(presented: Option<&str>, expected: &str) -> bool {
    let expected = strip_bearer(expected);
    // Timing depends only on lengths, never on where the tokens differ.
    !expected.is_empty()
        && presented
            .map(strip_bearer)
            .is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => value,
    }
}
