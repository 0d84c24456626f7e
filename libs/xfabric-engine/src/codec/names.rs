use std::collections::HashMap;

use apache_avro::Schema as AvroSchema;
use apache_avro::types::Value;

use xfabric_api::FabricError;

/// Named types declared inside one schema tree, keyed by full name.
///
/// A parsed schema defines each named type once and refers to it afterwards
/// through `Schema::Ref`; walking a value alongside the schema needs to follow
/// those references back to the definition.
pub(crate) struct NamedTypes<'s> {
    by_name: HashMap<String, &'s AvroSchema>,
}

impl<'s> NamedTypes<'s> {
    pub(crate) fn collect(schema: &'s AvroSchema) -> Self {
        let mut names = Self {
            by_name: HashMap::new(),
        };
        names.walk(schema);
        names
    }

    fn walk(&mut self, schema: &'s AvroSchema) {
        match schema {
            AvroSchema::Record(record) => {
                if self
                    .by_name
                    .insert(record.name.fullname(None), schema)
                    .is_none()
                {
                    for field in &record.fields {
                        self.walk(&field.schema);
                    }
                }
            }
            AvroSchema::Enum(e) => {
                self.by_name.insert(e.name.fullname(None), schema);
            }
            AvroSchema::Fixed(f) => {
                self.by_name.insert(f.name.fullname(None), schema);
            }
            AvroSchema::Array(array) => self.walk(&array.items),
            AvroSchema::Map(map) => self.walk(&map.types),
            AvroSchema::Union(union) => {
                for variant in union.variants() {
                    self.walk(variant);
                }
            }
            _ => {}
        }
    }

    /// Follow a reference to its definition; other schemas are returned as-is.
    pub(crate) fn deref(&self, schema: &'s AvroSchema) -> Result<&'s AvroSchema, FabricError> {
        match schema {
            AvroSchema::Ref { name } => {
                let full = name.fullname(None);
                self.by_name.get(&full).copied().ok_or_else(|| {
                    FabricError::InvalidSchema(format!("reference to undefined type '{full}'"))
                })
            }
            other => Ok(other),
        }
    }
}

/// Short human-readable type name for error messages and union tags.
pub(crate) fn type_name(schema: &AvroSchema) -> String {
    match schema {
        AvroSchema::Null => "null".into(),
        AvroSchema::Boolean => "boolean".into(),
        AvroSchema::Int | AvroSchema::Date | AvroSchema::TimeMillis => "int".into(),
        AvroSchema::Long
        | AvroSchema::TimeMicros
        | AvroSchema::TimestampMillis
        | AvroSchema::TimestampMicros
        | AvroSchema::TimestampNanos
        | AvroSchema::LocalTimestampMillis
        | AvroSchema::LocalTimestampMicros
        | AvroSchema::LocalTimestampNanos => "long".into(),
        AvroSchema::Float => "float".into(),
        AvroSchema::Double => "double".into(),
        AvroSchema::Bytes | AvroSchema::BigDecimal | AvroSchema::Decimal(_) => "bytes".into(),
        AvroSchema::String | AvroSchema::Uuid => "string".into(),
        AvroSchema::Array(_) => "array".into(),
        AvroSchema::Map(_) => "map".into(),
        AvroSchema::Union(_) => "union".into(),
        AvroSchema::Record(r) => r.name.fullname(None),
        AvroSchema::Enum(e) => e.name.fullname(None),
        AvroSchema::Fixed(f) => f.name.fullname(None),
        AvroSchema::Ref { name } => name.fullname(None),
        _ => "fixed".into(),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Fixed(..) => "fixed",
        Value::Enum(..) => "enum",
        Value::Union(..) => "union",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        _ => "logical",
    }
}

/// Unqualified part of a full name (`com.example.Order` → `Order`).
pub(crate) fn short_name(full: &str) -> &str {
    full.rsplit('.').next().unwrap_or(full)
}
