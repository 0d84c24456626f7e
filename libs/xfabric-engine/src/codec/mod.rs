//! Record serialization in the two wire forms, plus writer → reader
//! reconciliation on the way in.

mod binary;
mod conform;
mod json;
mod names;
mod reconcile;

use std::sync::Arc;

use xfabric_api::{ContentType, FabricError, Record, Schema};

use self::reconcile::Reconciler;

/// Serialize a record with its own schema. No schema identifier is embedded.
pub fn encode(record: &Record, format: ContentType) -> Result<Vec<u8>, FabricError> {
    let schema = record.schema().avro();
    match format {
        ContentType::Binary => binary::encode(schema, record.value()),
        ContentType::Json => json::encode(schema, record.value()),
    }
}

/// Parse `bytes` written with `writer` and present the result as `reader`.
///
/// When both are the same definition the decoded value is returned as-is.
pub fn decode(
    bytes: &[u8],
    writer: &Arc<Schema>,
    reader: &Arc<Schema>,
    format: ContentType,
) -> Result<Record, FabricError> {
    let written = match format {
        ContentType::Binary => binary::decode(writer.avro(), bytes)?,
        ContentType::Json => json::decode(writer.avro(), bytes)?,
    };

    if Arc::ptr_eq(writer, reader) || writer.avro() == reader.avro() {
        return Ok(Record::new(Arc::clone(reader), written));
    }

    let reconciler = Reconciler::new(writer.avro(), reader.avro());
    let value = reconciler.reconcile(written, writer.avro(), reader.avro(), "")?;
    Ok(Record::new(Arc::clone(reader), value))
}

/// Textual rendering of a record, as in the `avro/json` wire form.
pub fn to_json_string(record: &Record) -> Result<String, FabricError> {
    let json = json::render(record.schema().avro(), record.value())?;
    serde_json::to_string(&json).map_err(|e| FabricError::Encode(e.to_string()))
}

/// Re-emit a textual payload compactly, without looking at any schema.
///
/// Binary payloads have no schema-free rendering and are rejected.
pub fn raw_json_string(bytes: &[u8], format: ContentType) -> Result<String, FabricError> {
    if format != ContentType::Json {
        return Err(FabricError::Decode(format!(
            "{format} payload has no textual form without its schema"
        )));
    }
    let json: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| FabricError::Decode(format!("malformed document: {e}")))?;
    serde_json::to_string(&json).map_err(|e| FabricError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xfabric_api::Value;

    fn schema(text: &str) -> Arc<Schema> {
        Arc::new(Schema::parse_str(text).unwrap())
    }

    fn account() -> Arc<Schema> {
        schema(
            r#"{"type": "record", "name": "Account", "fields": [
                {"name": "id", "type": "long"},
                {"name": "owner", "type": "string"}
            ]}"#,
        )
    }

    fn record() -> Record {
        Record::from_fields(
            account(),
            [("id", Value::Long(42)), ("owner", Value::String("ada".into()))],
        )
        .unwrap()
    }

    #[test]
    fn both_forms_decode_what_they_encode() {
        let writer = account();
        for format in [ContentType::Binary, ContentType::Json] {
            let bytes = encode(&record(), format).unwrap();
            let decoded = decode(&bytes, &writer, &writer, format).unwrap();
            assert_eq!(decoded.value(), record().value(), "{format}");
        }
    }

    #[test]
    fn wrong_content_type_does_not_decode() {
        let bytes = encode(&record(), ContentType::Binary).unwrap();
        assert!(decode(&bytes, &account(), &account(), ContentType::Json).is_err());
    }

    #[test]
    fn json_rendering() {
        let json = to_json_string(&record()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!({"id": 42, "owner": "ada"}));
    }

    #[test]
    fn reader_view_differs_from_writer() {
        let reader = schema(
            r#"{"type": "record", "name": "Account", "fields": [
                {"name": "owner", "type": "string"},
                {"name": "active", "type": "boolean", "default": true}
            ]}"#,
        );
        let bytes = encode(&record(), ContentType::Binary).unwrap();
        let decoded = decode(&bytes, &account(), &reader, ContentType::Binary).unwrap();
        assert_eq!(decoded.field("owner"), Some(&Value::String("ada".into())));
        assert_eq!(decoded.field("active"), Some(&Value::Boolean(true)));
        assert_eq!(decoded.field("id"), None);
        assert!(Arc::ptr_eq(decoded.schema(), &reader));
    }

    #[test]
    fn narrower_value_is_refused_by_both_forms() {
        let loose = Record::new(
            account(),
            Value::Record(vec![
                ("id".into(), Value::Int(42)),
                ("owner".into(), Value::String("ada".into())),
            ]),
        );
        for format in [ContentType::Binary, ContentType::Json] {
            match encode(&loose, format) {
                Err(FabricError::Encode(msg)) => {
                    assert!(msg.contains("int value does not conform to long"), "{format}: {msg}")
                }
                other => panic!("{format}: {other:?}"),
            }
        }
    }

    #[test]
    fn plain_writer_reads_as_timestamp_in_both_forms() {
        let reader = schema(
            r#"{"type": "record", "name": "Account", "fields": [
                {"name": "id", "type": {"type": "long", "logicalType": "timestamp-millis"}},
                {"name": "owner", "type": "string"}
            ]}"#,
        );
        for format in [ContentType::Binary, ContentType::Json] {
            let bytes = encode(&record(), format).unwrap();
            let decoded = decode(&bytes, &account(), &reader, format).unwrap();
            assert_eq!(decoded.field("id"), Some(&Value::TimestampMillis(42)), "{format}");
        }
    }

    #[test]
    fn raw_rendering_only_for_text() {
        assert_eq!(
            raw_json_string(br#"{ "a" : [1, 2] }"#, ContentType::Json).unwrap(),
            r#"{"a":[1,2]}"#
        );
        assert!(raw_json_string(&[0x02, 0x41], ContentType::Binary).is_err());
    }
}
