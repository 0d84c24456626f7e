use std::collections::HashMap;

use apache_avro::Schema as AvroSchema;
use apache_avro::types::Value;
use serde_json::Value as Json;

use xfabric_api::FabricError;

use super::conform;
use super::names::{NamedTypes, short_name, type_name, value_kind};

/// How a JSON tree is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonForm {
    /// Message payload: non-null union values are wrapped as `{"branch": value}`.
    Wire,
    /// Field default from a schema: a union default belongs to its first branch, unwrapped.
    Default,
}

pub(crate) fn encode(schema: &AvroSchema, value: &Value) -> Result<Vec<u8>, FabricError> {
    let names = NamedTypes::collect(schema);
    conform::check(value, schema, &names).map_err(FabricError::Encode)?;
    let json = to_json(value, schema, &names).map_err(FabricError::Encode)?;
    serde_json::to_vec(&json).map_err(|e| FabricError::Encode(e.to_string()))
}

pub(crate) fn decode(schema: &AvroSchema, bytes: &[u8]) -> Result<Value, FabricError> {
    let json: Json = serde_json::from_slice(bytes)
        .map_err(|e| FabricError::Decode(format!("malformed document: {e}")))?;
    let names = NamedTypes::collect(schema);
    from_json(&json, schema, &names, JsonForm::Wire).map_err(FabricError::Decode)
}

/// Render `value` as its JSON tree (for display and for the textual wire form).
pub(crate) fn render(schema: &AvroSchema, value: &Value) -> Result<Json, FabricError> {
    let names = NamedTypes::collect(schema);
    to_json(value, schema, &names).map_err(FabricError::Encode)
}

// ═══════════════════════════════════════════════════════════════
//  Avro → JSON
// ═══════════════════════════════════════════════════════════════

fn to_json<'s>(
    value: &Value,
    schema: &'s AvroSchema,
    names: &NamedTypes<'s>,
) -> Result<Json, String> {
    let schema = names.deref(schema).map_err(|e| e.to_string())?;
    let json = match (schema, value) {
        (AvroSchema::Null, Value::Null) => Json::Null,
        (AvroSchema::Boolean, Value::Boolean(b)) => Json::Bool(*b),
        (AvroSchema::Int, Value::Int(n))
        | (AvroSchema::Date, Value::Date(n))
        | (AvroSchema::TimeMillis, Value::TimeMillis(n)) => Json::from(*n),
        (AvroSchema::Long, Value::Long(n))
        | (AvroSchema::TimeMicros, Value::TimeMicros(n))
        | (AvroSchema::TimestampMillis, Value::TimestampMillis(n))
        | (AvroSchema::TimestampMicros, Value::TimestampMicros(n))
        | (AvroSchema::TimestampNanos, Value::TimestampNanos(n))
        | (AvroSchema::LocalTimestampMillis, Value::LocalTimestampMillis(n))
        | (AvroSchema::LocalTimestampMicros, Value::LocalTimestampMicros(n))
        | (AvroSchema::LocalTimestampNanos, Value::LocalTimestampNanos(n)) => Json::from(*n),
        (AvroSchema::Float, Value::Float(f)) => number(f64::from(*f))?,
        (AvroSchema::Double, Value::Double(f)) => number(*f)?,
        (AvroSchema::Bytes, Value::Bytes(b)) => Json::String(bytes_to_text(b)),
        (AvroSchema::String, Value::String(s)) => Json::String(s.clone()),
        (AvroSchema::Uuid, Value::Uuid(u)) => Json::String(u.to_string()),
        (AvroSchema::Decimal(_), Value::Decimal(d)) => {
            let bytes = Vec::<u8>::try_from(d).map_err(|e| e.to_string())?;
            Json::String(bytes_to_text(&bytes))
        }
        (AvroSchema::Fixed(f), Value::Fixed(size, bytes)) => {
            if *size != f.size || bytes.len() != f.size {
                return Err(format!(
                    "fixed {} expects {} bytes, got {}",
                    f.name.fullname(None),
                    f.size,
                    bytes.len()
                ));
            }
            Json::String(bytes_to_text(bytes))
        }
        (AvroSchema::Enum(e), Value::Enum(_, symbol)) => {
            if !e.symbols.contains(symbol) {
                return Err(format!(
                    "'{symbol}' is not a symbol of enum {}",
                    e.name.fullname(None)
                ));
            }
            Json::String(symbol.clone())
        }
        (AvroSchema::Array(array), Value::Array(items)) => Json::Array(
            items
                .iter()
                .map(|item| to_json(item, &array.items, names))
                .collect::<Result<_, _>>()?,
        ),
        (AvroSchema::Map(map), Value::Map(entries)) => {
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (key, item) in entries {
                let json = to_json(item, &map.types, names)
                    .map_err(|e| format!("map key '{key}': {e}"))?;
                out.insert(key.clone(), json);
            }
            Json::Object(out)
        }
        (AvroSchema::Record(record), Value::Record(fields)) => {
            let mut out = serde_json::Map::with_capacity(record.fields.len());
            for field in &record.fields {
                let item = fields
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| format!("missing value for field '{}'", field.name))?;
                let json = to_json(item, &field.schema, names)
                    .map_err(|e| format!("field '{}': {e}", field.name))?;
                out.insert(field.name.clone(), json);
            }
            Json::Object(out)
        }
        (AvroSchema::Union(union), Value::Union(index, inner)) => {
            let branch = union
                .variants()
                .get(*index as usize)
                .ok_or_else(|| format!("union branch {index} out of range"))?;
            let branch = names.deref(branch).map_err(|e| e.to_string())?;
            if matches!(branch, AvroSchema::Null) {
                Json::Null
            } else {
                let mut wrapped = serde_json::Map::with_capacity(1);
                wrapped.insert(type_name(branch), to_json(inner, branch, names)?);
                Json::Object(wrapped)
            }
        }
        (schema, value) => {
            return Err(format!(
                "{} value does not conform to {}",
                value_kind(value),
                type_name(schema)
            ));
        }
    };
    Ok(json)
}

fn number(f: f64) -> Result<Json, String> {
    serde_json::Number::from_f64(f)
        .map(Json::Number)
        .ok_or_else(|| format!("{f} has no textual representation"))
}

/// Bytes travel as a string of code points 0–255, one per byte.
fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn text_to_bytes(text: &str) -> Result<Vec<u8>, String> {
    text.chars()
        .map(|c| u8::try_from(c).map_err(|_| format!("character {c:?} is outside the byte range")))
        .collect()
}

// ═══════════════════════════════════════════════════════════════
//  JSON → Avro
// ═══════════════════════════════════════════════════════════════

pub(crate) fn from_json<'s>(
    json: &Json,
    schema: &'s AvroSchema,
    names: &NamedTypes<'s>,
    form: JsonForm,
) -> Result<Value, String> {
    let schema = names.deref(schema).map_err(|e| e.to_string())?;
    let value = match (schema, json) {
        (AvroSchema::Union(union), _) => return from_json_union(json, union.variants(), names, form),
        (AvroSchema::Null, Json::Null) => Value::Null,
        (AvroSchema::Boolean, Json::Bool(b)) => Value::Boolean(*b),
        (AvroSchema::Int, Json::Number(_)) => Value::Int(int(json)?),
        (AvroSchema::Date, Json::Number(_)) => Value::Date(int(json)?),
        (AvroSchema::TimeMillis, Json::Number(_)) => Value::TimeMillis(int(json)?),
        (AvroSchema::Long, Json::Number(_)) => Value::Long(long(json)?),
        (AvroSchema::TimeMicros, Json::Number(_)) => Value::TimeMicros(long(json)?),
        (AvroSchema::TimestampMillis, Json::Number(_)) => Value::TimestampMillis(long(json)?),
        (AvroSchema::TimestampMicros, Json::Number(_)) => Value::TimestampMicros(long(json)?),
        (AvroSchema::TimestampNanos, Json::Number(_)) => Value::TimestampNanos(long(json)?),
        (AvroSchema::LocalTimestampMillis, Json::Number(_)) => {
            Value::LocalTimestampMillis(long(json)?)
        }
        (AvroSchema::LocalTimestampMicros, Json::Number(_)) => {
            Value::LocalTimestampMicros(long(json)?)
        }
        (AvroSchema::LocalTimestampNanos, Json::Number(_)) => {
            Value::LocalTimestampNanos(long(json)?)
        }
        (AvroSchema::Float, Json::Number(n)) => Value::Float(n.as_f64().unwrap_or_default() as f32),
        (AvroSchema::Double, Json::Number(n)) => Value::Double(n.as_f64().unwrap_or_default()),
        (AvroSchema::Bytes, Json::String(s)) => Value::Bytes(text_to_bytes(s)?),
        (AvroSchema::String, Json::String(s)) => Value::String(s.clone()),
        (AvroSchema::Uuid, Json::String(s)) => {
            Value::Uuid(uuid::Uuid::parse_str(s).map_err(|e| format!("'{s}': {e}"))?)
        }
        (AvroSchema::Decimal(_), Json::String(s)) => {
            Value::Decimal(apache_avro::Decimal::from(text_to_bytes(s)?))
        }
        (AvroSchema::Fixed(f), Json::String(s)) => {
            let bytes = text_to_bytes(s)?;
            if bytes.len() != f.size {
                return Err(format!(
                    "fixed {} expects {} bytes, got {}",
                    f.name.fullname(None),
                    f.size,
                    bytes.len()
                ));
            }
            Value::Fixed(f.size, bytes)
        }
        (AvroSchema::Enum(e), Json::String(s)) => {
            let index = e.symbols.iter().position(|sym| sym == s).ok_or_else(|| {
                format!("'{s}' is not a symbol of enum {}", e.name.fullname(None))
            })?;
            Value::Enum(index as u32, s.clone())
        }
        (AvroSchema::Array(array), Json::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    from_json(item, &array.items, names, form).map_err(|e| format!("[{i}]: {e}"))
                })
                .collect::<Result<_, _>>()?,
        ),
        (AvroSchema::Map(map), Json::Object(entries)) => {
            let mut out = HashMap::with_capacity(entries.len());
            for (key, item) in entries {
                let value = from_json(item, &map.types, names, form)
                    .map_err(|e| format!("map key '{key}': {e}"))?;
                out.insert(key.clone(), value);
            }
            Value::Map(out)
        }
        (AvroSchema::Record(record), Json::Object(entries)) => {
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                // A written document carries every field; only defaults may be partial.
                let value = match (entries.get(&field.name), &field.default, form) {
                    (Some(item), _, _) => from_json(item, &field.schema, names, form),
                    (None, Some(default), JsonForm::Default) => {
                        from_json(default, &field.schema, names, JsonForm::Default)
                    }
                    _ => Err("missing".to_string()),
                }
                .map_err(|e| format!("field '{}': {e}", field.name))?;
                fields.push((field.name.clone(), value));
            }
            Value::Record(fields)
        }
        (schema, json) => {
            return Err(format!(
                "expected {}, found {}",
                type_name(schema),
                json_kind(json)
            ));
        }
    };
    Ok(value)
}

fn from_json_union<'s>(
    json: &Json,
    variants: &'s [AvroSchema],
    names: &NamedTypes<'s>,
    form: JsonForm,
) -> Result<Value, String> {
    if form == JsonForm::Default {
        let first = variants.first().ok_or("empty union")?;
        let value = from_json(json, first, names, form)?;
        return Ok(Value::Union(0, Box::new(value)));
    }

    if json.is_null() {
        let index = variants
            .iter()
            .position(|v| matches!(v, AvroSchema::Null))
            .ok_or("null is not a branch of this union")?;
        return Ok(Value::Union(index as u32, Box::new(Value::Null)));
    }

    let Json::Object(wrapper) = json else {
        return Err(format!(
            "union value must be null or a single-key object, found {}",
            json_kind(json)
        ));
    };
    let mut entries = wrapper.iter();
    let (Some((tag, inner)), None) = (entries.next(), entries.next()) else {
        return Err("union value must be a single-key object".into());
    };

    for (index, variant) in variants.iter().enumerate() {
        let resolved = names.deref(variant).map_err(|e| e.to_string())?;
        let name = type_name(resolved);
        if name == *tag || short_name(&name) == tag.as_str() {
            let value = from_json(inner, variant, names, form)
                .map_err(|e| format!("branch '{tag}': {e}"))?;
            return Ok(Value::Union(index as u32, Box::new(value)));
        }
    }
    Err(format!("'{tag}' is not a branch of this union"))
}

fn int(json: &Json) -> Result<i32, String> {
    json.as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| format!("{json} is not a 32-bit integer"))
}

fn long(json: &Json) -> Result<i64, String> {
    json.as_i64()
        .ok_or_else(|| format!("{json} is not a 64-bit integer"))
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AvroSchema {
        AvroSchema::parse_str(
            r#"{"type": "record", "name": "Reading", "namespace": "iot", "fields": [
                {"name": "sensor", "type": "string"},
                {"name": "celsius", "type": "double"},
                {"name": "raw", "type": "bytes"},
                {"name": "unit", "type": {"type": "enum", "name": "Unit", "symbols": ["C", "F"]}},
                {"name": "note", "type": ["null", "string"]},
                {"name": "tags", "type": {"type": "map", "values": "long"}}
            ]}"#,
        )
        .unwrap()
    }

    fn reading(note: Value) -> Value {
        Value::Record(vec![
            ("sensor".into(), Value::String("s-1".into())),
            ("celsius".into(), Value::Double(21.5)),
            ("raw".into(), Value::Bytes(vec![0x00, 0xff])),
            ("unit".into(), Value::Enum(0, "C".into())),
            ("note".into(), note),
            ("tags".into(), Value::Map(HashMap::from([("floor".into(), Value::Long(3))]))),
        ])
    }

    #[test]
    fn union_branches_are_tagged() {
        let json = render(&schema(), &reading(Value::Union(1, Box::new(Value::String("ok".into()))))).unwrap();
        assert_eq!(json["note"], serde_json::json!({"string": "ok"}));
        assert_eq!(json["raw"], Json::String("\u{0}\u{ff}".into()));

        let json = render(&schema(), &reading(Value::Union(0, Box::new(Value::Null)))).unwrap();
        assert_eq!(json["note"], Json::Null);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let value = reading(Value::Union(1, Box::new(Value::String("ok".into()))));
        let bytes = encode(&schema(), &value).unwrap();
        assert_eq!(decode(&schema(), &bytes).unwrap(), value);
    }

    #[test]
    fn untagged_union_value_is_rejected() {
        let doc = br#"{"sensor": "s", "celsius": 1.0, "raw": "", "unit": "C", "note": "bare", "tags": {}}"#;
        let err = decode(&schema(), doc).unwrap_err();
        assert!(matches!(err, FabricError::Decode(ref m) if m.contains("field 'note'")));
    }

    #[test]
    fn unknown_symbol_and_wrong_type_fail() {
        let doc = br#"{"sensor": "s", "celsius": 1.0, "raw": "", "unit": "K", "note": null, "tags": {}}"#;
        assert!(decode(&schema(), doc).is_err());

        let doc = br#"{"sensor": 7, "celsius": 1.0, "raw": "", "unit": "C", "note": null, "tags": {}}"#;
        let err = decode(&schema(), doc).unwrap_err();
        assert!(err.to_string().contains("expected string, found number"));
    }

    #[test]
    fn union_default_uses_first_branch() {
        let schema = AvroSchema::parse_str(r#"["null", "string"]"#).unwrap();
        let names = NamedTypes::collect(&schema);
        let value = from_json(&Json::Null, &schema, &names, JsonForm::Default).unwrap();
        assert_eq!(value, Value::Union(0, Box::new(Value::Null)));
    }

    #[test]
    fn omitted_field_is_not_filled_from_its_default() {
        let schema = AvroSchema::parse_str(
            r#"{"type": "record", "name": "Pair", "fields": [
                {"name": "a", "type": "string"},
                {"name": "b", "type": "string", "default": "zz"}
            ]}"#,
        )
        .unwrap();
        let err = decode(&schema, br#"{"a": "x"}"#).unwrap_err();
        assert!(matches!(err, FabricError::Decode(ref m) if m.contains("field 'b': missing")));
    }

    #[test]
    fn malformed_document_is_a_decode_error() {
        assert!(matches!(decode(&schema(), b"{\"sensor\""), Err(FabricError::Decode(_))));
    }
}
