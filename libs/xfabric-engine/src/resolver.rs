use std::sync::Arc;

use xfabric_api::{ContentType, FabricError, Record, Schema, SchemaKey};

use crate::cache::SchemaCache;
use crate::codec;
use crate::fetcher::{HttpSchemaFetcher, SchemaFetcher};

/// Metadata that travels with a payload on the fabric.
#[derive(Debug, Clone, Copy)]
pub struct WireEnvelope<'a> {
    pub topic: &'a str,
    /// Version of the schema the sender wrote with.
    pub schema_version: &'a str,
    /// Where that schema can be fetched if it is not cached.
    pub schema_uri: Option<&'a str>,
    pub content_type: ContentType,
    pub payload: &'a [u8],
}

/// Where the writer schema for a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterSource {
    /// Claimed version equals the reader's; the reader schema is reused.
    Reader,
    /// Looked up in the cache, fetching on a miss.
    Cache,
}

/// Decodes inbound payloads into the consumer's reader schema, obtaining
/// the writer schema from the cache when the versions differ.
pub struct MessageDecoder<F = HttpSchemaFetcher> {
    cache: Arc<SchemaCache<F>>,
}

impl<F> Clone for MessageDecoder<F> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<F> std::fmt::Debug for MessageDecoder<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDecoder")
            .field("cache", &self.cache)
            .finish()
    }
}

impl<F: SchemaFetcher> MessageDecoder<F> {
    pub fn new(cache: Arc<SchemaCache<F>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<SchemaCache<F>> {
        &self.cache
    }

    /// Pick the schema the payload was written with.
    ///
    /// A cache miss without a URL, or a failed fetch, is `SchemaUnavailable`.
    pub async fn writer_schema(
        &self,
        envelope: &WireEnvelope<'_>,
        reader: &Arc<Schema>,
    ) -> Result<(Arc<Schema>, WriterSource), FabricError> {
        if reader.version() == Some(envelope.schema_version) {
            return Ok((Arc::clone(reader), WriterSource::Reader));
        }

        let key = SchemaKey::new(envelope.topic, envelope.schema_version);
        match self
            .cache
            .resolve(envelope.topic, envelope.schema_version, envelope.schema_uri)
            .await
        {
            Ok(Some(schema)) => Ok((schema, WriterSource::Cache)),
            Ok(None) => Err(FabricError::SchemaUnavailable {
                key,
                reason: "not cached and no schema URI supplied".into(),
            }),
            Err(e @ FabricError::SchemaFetch { .. }) => Err(FabricError::SchemaUnavailable {
                key,
                reason: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Decode a payload and present it as `reader`.
    pub async fn decode(
        &self,
        envelope: &WireEnvelope<'_>,
        reader: &Arc<Schema>,
    ) -> Result<Record, FabricError> {
        let topic = envelope.topic;
        let version = envelope.schema_version;

        let (writer, source) = match self.writer_schema(envelope, reader).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(topic, version, error = %e, "resolution failed");
                return Err(e);
            }
        };
        tracing::debug!(topic, version, ?source, "writer schema ready");

        match codec::decode(envelope.payload, &writer, reader, envelope.content_type) {
            Ok(record) => {
                tracing::debug!(topic, version, bytes = envelope.payload.len(), "message decoded");
                Ok(record)
            }
            Err(e) => {
                tracing::debug!(topic, version, error = %e, "decode failed");
                Err(e)
            }
        }
    }

    /// Decode a payload and render it in the textual form of the reader schema.
    pub async fn message_as_json_string(
        &self,
        envelope: &WireEnvelope<'_>,
        reader: &Arc<Schema>,
    ) -> Result<String, FabricError> {
        let record = self.decode(envelope, reader).await?;
        codec::to_json_string(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xfabric_api::Value;

    struct Unreachable;

    impl SchemaFetcher for Unreachable {
        async fn fetch(&self, url: &str) -> Result<Schema, FabricError> {
            Err(FabricError::SchemaFetch {
                url: url.to_string(),
                detail: "connection refused".into(),
            })
        }
    }

    fn reader() -> Arc<Schema> {
        Arc::new(
            Schema::parse_str(
                r#"{"type": "record", "name": "Tick", "topic": "/ticks", "version": "3",
                    "fields": [{"name": "seq", "type": "long"}]}"#,
            )
            .unwrap(),
        )
    }

    fn payload(reader: &Arc<Schema>) -> Vec<u8> {
        let record = Record::from_fields(Arc::clone(reader), [("seq", Value::Long(11))]).unwrap();
        codec::encode(&record, ContentType::Binary).unwrap()
    }

    #[tokio::test]
    async fn matching_version_skips_the_cache() {
        let decoder = MessageDecoder::new(Arc::new(SchemaCache::new(Unreachable)));
        let reader = reader();
        let bytes = payload(&reader);
        let envelope = WireEnvelope {
            topic: "/ticks",
            schema_version: "3",
            schema_uri: None,
            content_type: ContentType::Binary,
            payload: &bytes,
        };

        let (_, source) = decoder.writer_schema(&envelope, &reader).await.unwrap();
        assert_eq!(source, WriterSource::Reader);
        let record = decoder.decode(&envelope, &reader).await.unwrap();
        assert_eq!(record.field("seq"), Some(&Value::Long(11)));
        assert!(decoder.cache().is_empty());
    }

    #[tokio::test]
    async fn unavailable_writer_schema() {
        let decoder = MessageDecoder::new(Arc::new(SchemaCache::new(Unreachable)));
        let reader = reader();
        let bytes = payload(&reader);
        let mut envelope = WireEnvelope {
            topic: "/ticks",
            schema_version: "2",
            schema_uri: None,
            content_type: ContentType::Binary,
            payload: &bytes,
        };

        let err = decoder.decode(&envelope, &reader).await.unwrap_err();
        assert!(matches!(err, FabricError::SchemaUnavailable { ref key, .. } if key.version() == "2"));

        envelope.schema_uri = Some("https://schemas.example/ticks/2");
        let err = decoder.decode(&envelope, &reader).await.unwrap_err();
        assert!(matches!(err, FabricError::SchemaUnavailable { ref reason, .. } if reason.contains("connection refused")));
    }

    #[tokio::test]
    async fn renders_decoded_message_as_text() {
        let decoder = MessageDecoder::new(Arc::new(SchemaCache::new(Unreachable)));
        let reader = reader();
        let bytes = payload(&reader);
        let envelope = WireEnvelope {
            topic: "/ticks",
            schema_version: "3",
            schema_uri: None,
            content_type: ContentType::Binary,
            payload: &bytes,
        };
        assert_eq!(
            decoder.message_as_json_string(&envelope, &reader).await.unwrap(),
            r#"{"seq":11}"#
        );
    }
}
