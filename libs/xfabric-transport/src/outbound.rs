use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};

use xfabric_api::{ContentType, FabricError, Record};
use xfabric_engine::codec;

use crate::error::TransportError;
use crate::headers;

/// A payload ready to publish, with the optional fabric headers.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub content_type: ContentType,
    pub payload: Bytes,
    pub continuation_guid: Option<String>,
    pub destination_id: Option<String>,
    pub schema_version: Option<String>,
    pub schema_uri: Option<String>,
    pub idempotency_id: Option<String>,
    pub correlation_id: Option<String>,
}

impl OutboundMessage {
    pub fn new(content_type: ContentType, payload: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            payload: payload.into(),
            continuation_guid: None,
            destination_id: None,
            schema_version: None,
            schema_uri: None,
            idempotency_id: None,
            correlation_id: None,
        }
    }

    /// Encode `record`; the schema version header defaults to the record
    /// schema's `version` property.
    pub fn from_record(record: &Record, content_type: ContentType) -> Result<Self, FabricError> {
        let payload = codec::encode(record, content_type)?;
        let mut message = Self::new(content_type, payload);
        message.schema_version = record.schema().version().map(str::to_string);
        Ok(message)
    }

    /// A textual payload supplied as-is. It must at least be a JSON document.
    pub fn from_json_string(text: impl Into<String>) -> Result<Self, FabricError> {
        let text = text.into();
        serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| FabricError::Encode(format!("not a JSON document: {e}")))?;
        Ok(Self::new(ContentType::Json, text))
    }

    pub fn with_continuation_guid(mut self, guid: impl Into<String>) -> Self {
        self.continuation_guid = Some(guid.into());
        self
    }

    pub fn with_destination_id(mut self, id: impl Into<String>) -> Self {
        self.destination_id = Some(id.into());
        self
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    pub fn with_schema_uri(mut self, uri: impl Into<String>) -> Self {
        self.schema_uri = Some(uri.into());
        self
    }

    pub fn with_idempotency_id(mut self, id: impl Into<String>) -> Self {
        self.idempotency_id = Some(id.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Request headers for this message, excluding `Authorization`.
    pub fn headers(&self) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::new();
        map.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(self.content_type.mime()),
        );

        let optional = [
            (headers::MESSAGE_GUID_CONTINUATION, &self.continuation_guid),
            (headers::DESTINATION_ID, &self.destination_id),
            (headers::SCHEMA_VERSION, &self.schema_version),
            (headers::SCHEMA_URI, &self.schema_uri),
            (headers::IDEMPOTENCY_ID, &self.idempotency_id),
            (headers::RESULT_CORRELATION_ID, &self.correlation_id),
        ];
        for (name, value) in optional {
            let Some(value) = value else { continue };
            let value = HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                name,
                detail: e.to_string(),
            })?;
            map.insert(HeaderName::from_static(name), value);
        }
        Ok(map)
    }
}
