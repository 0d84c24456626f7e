use apache_avro::Schema as AvroSchema;
use apache_avro::types::Value;

use super::names::{NamedTypes, type_name, value_kind};

/// Check that `value` is exactly the variant `schema` declares, all the way
/// down. `Value::validate` accepts an `Int` under a `long`; this does not, so
/// both wire forms refuse the same values.
pub(crate) fn check<'s>(
    value: &Value,
    schema: &'s AvroSchema,
    names: &NamedTypes<'s>,
) -> Result<(), String> {
    let schema = names.deref(schema).map_err(|e| e.to_string())?;
    match (schema, value) {
        (AvroSchema::Null, Value::Null)
        | (AvroSchema::Boolean, Value::Boolean(_))
        | (AvroSchema::Int, Value::Int(_))
        | (AvroSchema::Long, Value::Long(_))
        | (AvroSchema::Float, Value::Float(_))
        | (AvroSchema::Double, Value::Double(_))
        | (AvroSchema::Bytes, Value::Bytes(_))
        | (AvroSchema::String, Value::String(_))
        | (AvroSchema::Date, Value::Date(_))
        | (AvroSchema::TimeMillis, Value::TimeMillis(_))
        | (AvroSchema::TimeMicros, Value::TimeMicros(_))
        | (AvroSchema::TimestampMillis, Value::TimestampMillis(_))
        | (AvroSchema::TimestampMicros, Value::TimestampMicros(_))
        | (AvroSchema::TimestampNanos, Value::TimestampNanos(_))
        | (AvroSchema::LocalTimestampMillis, Value::LocalTimestampMillis(_))
        | (AvroSchema::LocalTimestampMicros, Value::LocalTimestampMicros(_))
        | (AvroSchema::LocalTimestampNanos, Value::LocalTimestampNanos(_))
        | (AvroSchema::Decimal(_), Value::Decimal(_))
        | (AvroSchema::BigDecimal, Value::BigDecimal(_))
        | (AvroSchema::Uuid, Value::Uuid(_))
        | (AvroSchema::Duration, Value::Duration(_)) => Ok(()),
        (AvroSchema::Fixed(f), Value::Fixed(size, bytes)) => {
            if *size == f.size && bytes.len() == f.size {
                Ok(())
            } else {
                Err(format!(
                    "fixed {} expects {} bytes, got {}",
                    f.name.fullname(None),
                    f.size,
                    bytes.len()
                ))
            }
        }
        (AvroSchema::Enum(e), Value::Enum(index, symbol)) => {
            if e.symbols.get(*index as usize) == Some(symbol) {
                Ok(())
            } else {
                Err(format!(
                    "'{symbol}' is not symbol {index} of enum {}",
                    e.name.fullname(None)
                ))
            }
        }
        (AvroSchema::Array(array), Value::Array(items)) => {
            items.iter().enumerate().try_for_each(|(i, item)| {
                check(item, &array.items, names).map_err(|e| format!("[{i}]: {e}"))
            })
        }
        (AvroSchema::Map(map), Value::Map(entries)) => entries.iter().try_for_each(|(key, item)| {
            check(item, &map.types, names).map_err(|e| format!("map key '{key}': {e}"))
        }),
        (AvroSchema::Record(record), Value::Record(fields)) => {
            if let Some((extra, _)) = fields.iter().find(|(n, _)| !record.lookup.contains_key(n)) {
                return Err(format!("field '{extra}' is not declared by the schema"));
            }
            for field in &record.fields {
                let item = fields
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| format!("missing value for field '{}'", field.name))?;
                check(item, &field.schema, names)
                    .map_err(|e| format!("field '{}': {e}", field.name))?;
            }
            Ok(())
        }
        (AvroSchema::Union(union), Value::Union(index, inner)) => {
            let branch = union
                .variants()
                .get(*index as usize)
                .ok_or_else(|| format!("union branch {index} out of range"))?;
            check(inner, branch, names)
        }
        (schema, value) => Err(format!(
            "{} value does not conform to {}",
            value_kind(value),
            type_name(schema)
        )),
    }
}
