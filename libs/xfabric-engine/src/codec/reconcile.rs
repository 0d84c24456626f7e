use std::collections::HashMap;

use apache_avro::Schema as AvroSchema;
use apache_avro::schema::RecordField;
use apache_avro::types::Value;

use xfabric_api::FabricError;

use super::json::{JsonForm, from_json};
use super::names::{NamedTypes, short_name, type_name};

/// Rewrites a value decoded with the writer's schema into the shape of the
/// reader's schema.
///
/// * fields are matched by name (or reader alias); reader-only fields take
///   their default, writer-only fields are dropped
/// * numeric promotions int → long → float → double and string ↔ bytes
/// * enum symbols are matched by name, falling back to the reader's default
/// * records, enums and fixed types must agree on name (or reader alias)
/// * logical types are read through the primitive they annotate
/// * unions may appear on either side
pub(crate) struct Reconciler<'w, 'r> {
    writer_names: NamedTypes<'w>,
    reader_names: NamedTypes<'r>,
}

impl<'w, 'r> Reconciler<'w, 'r> {
    pub(crate) fn new(writer: &'w AvroSchema, reader: &'r AvroSchema) -> Self {
        Self {
            writer_names: NamedTypes::collect(writer),
            reader_names: NamedTypes::collect(reader),
        }
    }

    pub(crate) fn reconcile(
        &self,
        value: Value,
        writer: &'w AvroSchema,
        reader: &'r AvroSchema,
        path: &str,
    ) -> Result<Value, FabricError> {
        let writer = self.writer_names.deref(writer)?;
        let reader = self.reader_names.deref(reader)?;

        if let AvroSchema::Union(union) = writer {
            let Value::Union(index, inner) = value else {
                return Err(FabricError::Decode(format!(
                    "{}: expected a union value",
                    display_path(path)
                )));
            };
            let branch = union.variants().get(index as usize).ok_or_else(|| {
                FabricError::Decode(format!(
                    "{}: union branch {index} out of range",
                    display_path(path)
                ))
            })?;
            return self.reconcile(*inner, branch, reader, path);
        }

        if let AvroSchema::Union(union) = reader {
            let index = self.pick_branch(writer, union.variants())?.ok_or_else(|| {
                FabricError::SchemaMismatch(format!(
                    "{}: no branch of the reader union accepts writer type {}",
                    display_path(path),
                    type_name(writer)
                ))
            })?;
            let inner = self.reconcile(value, writer, &union.variants()[index], path)?;
            return Ok(Value::Union(index as u32, Box::new(inner)));
        }

        let reconciled = match (writer, reader, value) {
            (AvroSchema::Record(w), AvroSchema::Record(r), Value::Record(fields)) => {
                self.ensure_same_name(writer, reader, path)?;
                let mut written: HashMap<String, Value> = fields.into_iter().collect();
                let mut out = Vec::with_capacity(r.fields.len());
                for reader_field in &r.fields {
                    let field_path = join(path, &reader_field.name);
                    let writer_field = w.fields.iter().find(|wf| matches_field(wf, reader_field));
                    let value = match writer_field {
                        Some(wf) => {
                            let value = written.remove(&wf.name).ok_or_else(|| {
                                FabricError::Decode(format!("field '{field_path}' missing from datum"))
                            })?;
                            self.reconcile(value, &wf.schema, &reader_field.schema, &field_path)?
                        }
                        None => self.default_for(reader_field, &field_path)?,
                    };
                    out.push((reader_field.name.clone(), value));
                }
                Value::Record(out)
            }
            (AvroSchema::Enum(_), AvroSchema::Enum(r), Value::Enum(_, symbol)) => {
                self.ensure_same_name(writer, reader, path)?;
                match r.symbols.iter().position(|s| *s == symbol) {
                    Some(index) => Value::Enum(index as u32, symbol),
                    None => {
                        let fallback = r.default.as_ref().and_then(|d| {
                            r.symbols.iter().position(|s| s == d).map(|i| (i, d.clone()))
                        });
                        let Some((index, default)) = fallback else {
                            return Err(FabricError::SchemaMismatch(format!(
                                "{}: symbol '{symbol}' is unknown to the reader",
                                display_path(path)
                            )));
                        };
                        Value::Enum(index as u32, default)
                    }
                }
            }
            (AvroSchema::Fixed(w), AvroSchema::Fixed(r), value) => {
                self.ensure_same_name(writer, reader, path)?;
                if w.size != r.size {
                    return Err(FabricError::SchemaMismatch(format!(
                        "{}: fixed size {} cannot be read as size {}",
                        display_path(path),
                        w.size,
                        r.size
                    )));
                }
                value
            }
            (AvroSchema::Array(w), AvroSchema::Array(r), Value::Array(items)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.reconcile(item, &w.items, &r.items, &format!("{path}[]")))
                    .collect::<Result<_, _>>()?,
            ),
            (AvroSchema::Map(w), AvroSchema::Map(r), Value::Map(entries)) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, item)| {
                        let item = self.reconcile(item, &w.types, &r.types, &format!("{path}{{}}"))?;
                        Ok::<_, FabricError>((key, item))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (AvroSchema::Int, AvroSchema::Long, Value::Int(n)) => Value::Long(i64::from(n)),
            (AvroSchema::Int, AvroSchema::Float, Value::Int(n)) => Value::Float(n as f32),
            (AvroSchema::Int, AvroSchema::Double, Value::Int(n)) => Value::Double(f64::from(n)),
            (AvroSchema::Long, AvroSchema::Float, Value::Long(n)) => Value::Float(n as f32),
            (AvroSchema::Long, AvroSchema::Double, Value::Long(n)) => Value::Double(n as f64),
            (AvroSchema::Float, AvroSchema::Double, Value::Float(f)) => Value::Double(f64::from(f)),
            (AvroSchema::String, AvroSchema::Bytes, Value::String(s)) => Value::Bytes(s.into_bytes()),
            (AvroSchema::Bytes, AvroSchema::String, Value::Bytes(b)) => {
                Value::String(String::from_utf8(b).map_err(|e| {
                    FabricError::Decode(format!("{}: {e}", display_path(path)))
                })?)
            }
            (writer, reader, value) if same_kind(writer, reader) => value,
            (writer, reader, value) if logical_compatible(writer, reader) => retype(value, reader)
                .map_err(|e| FabricError::Decode(format!("{}: {e}", display_path(path))))?,
            (writer, reader, _) => {
                return Err(FabricError::SchemaMismatch(format!(
                    "{}: writer type {} cannot be read as {}",
                    display_path(path),
                    type_name(writer),
                    type_name(reader)
                )));
            }
        };
        Ok(reconciled)
    }

    /// First reader branch of the writer's exact type, else the first branch
    /// it promotes to.
    fn pick_branch(
        &self,
        writer: &AvroSchema,
        variants: &'r [AvroSchema],
    ) -> Result<Option<usize>, FabricError> {
        let mut resolved = Vec::with_capacity(variants.len());
        for variant in variants {
            resolved.push(self.reader_names.deref(variant)?);
        }
        if let Some(index) = resolved.iter().position(|r| exact_match(writer, r)) {
            return Ok(Some(index));
        }
        Ok(resolved.iter().position(|r| promotes(writer, r)))
    }

    fn ensure_same_name(
        &self,
        writer: &AvroSchema,
        reader: &AvroSchema,
        path: &str,
    ) -> Result<(), FabricError> {
        if names_match(writer, reader) {
            return Ok(());
        }
        Err(FabricError::SchemaMismatch(format!(
            "{}: writer type {} cannot be read as {}",
            display_path(path),
            type_name(writer),
            type_name(reader)
        )))
    }

    fn default_for(&self, field: &'r RecordField, path: &str) -> Result<Value, FabricError> {
        let Some(default) = &field.default else {
            return Err(FabricError::SchemaMismatch(format!(
                "field '{path}' is missing from the writer schema and has no default"
            )));
        };
        from_json(default, &field.schema, &self.reader_names, JsonForm::Default).map_err(|e| {
            FabricError::SchemaMismatch(format!("field '{path}': invalid default: {e}"))
        })
    }
}

fn matches_field(writer_field: &RecordField, reader_field: &RecordField) -> bool {
    writer_field.name == reader_field.name
        || reader_field
            .aliases
            .as_ref()
            .is_some_and(|aliases| aliases.contains(&writer_field.name))
}

fn same_kind(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    std::mem::discriminant(writer) == std::mem::discriminant(reader)
}

fn exact_match(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    if !same_kind(writer, reader) {
        return false;
    }
    match writer {
        AvroSchema::Record(_) | AvroSchema::Enum(_) | AvroSchema::Fixed(_) => {
            names_match(writer, reader)
        }
        _ => true,
    }
}

/// Unqualified names agree, or the writer's name is a reader alias.
fn names_match(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    let written = type_name(writer);
    let written = short_name(&written);
    if short_name(&type_name(reader)) == written {
        return true;
    }
    let aliases = match reader {
        AvroSchema::Record(r) => &r.aliases,
        AvroSchema::Enum(e) => &e.aliases,
        AvroSchema::Fixed(f) => &f.aliases,
        _ => return false,
    };
    aliases
        .as_ref()
        .is_some_and(|aliases| aliases.iter().any(|alias| alias.name() == written))
}

fn is_logical(schema: &AvroSchema) -> bool {
    matches!(
        schema,
        AvroSchema::Date
            | AvroSchema::TimeMillis
            | AvroSchema::TimeMicros
            | AvroSchema::TimestampMillis
            | AvroSchema::TimestampMicros
            | AvroSchema::TimestampNanos
            | AvroSchema::LocalTimestampMillis
            | AvroSchema::LocalTimestampMicros
            | AvroSchema::LocalTimestampNanos
            | AvroSchema::Uuid
            | AvroSchema::Decimal(_)
    )
}

/// A logical type on either side, over primitives that are equal or promote.
fn logical_compatible(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    if !is_logical(writer) && !is_logical(reader) {
        return false;
    }
    let (w, r) = (type_name(writer), type_name(reader));
    w == r || promotes_primitive(&w, &r)
}

fn promotes_primitive(writer: &str, reader: &str) -> bool {
    matches!(
        (writer, reader),
        ("int", "long" | "float" | "double")
            | ("long", "float" | "double")
            | ("float", "double")
            | ("string", "bytes")
            | ("bytes", "string")
    )
}

/// Strip the writer's logical annotation, widen the primitive, then apply the
/// reader's annotation.
fn retype(value: Value, reader: &AvroSchema) -> Result<Value, String> {
    let base = match value {
        Value::Date(n) | Value::TimeMillis(n) => Value::Int(n),
        Value::TimeMicros(n)
        | Value::TimestampMillis(n)
        | Value::TimestampMicros(n)
        | Value::TimestampNanos(n)
        | Value::LocalTimestampMillis(n)
        | Value::LocalTimestampMicros(n)
        | Value::LocalTimestampNanos(n) => Value::Long(n),
        Value::Uuid(u) => Value::String(u.to_string()),
        Value::Decimal(d) => Value::Bytes(Vec::<u8>::try_from(&d).map_err(|e| e.to_string())?),
        other => other,
    };

    let widened = match (base, type_name(reader).as_str()) {
        (Value::Int(n), "long") => Value::Long(i64::from(n)),
        (Value::Int(n), "float") => Value::Float(n as f32),
        (Value::Int(n), "double") => Value::Double(f64::from(n)),
        (Value::Long(n), "float") => Value::Float(n as f32),
        (Value::Long(n), "double") => Value::Double(n as f64),
        (Value::Float(f), "double") => Value::Double(f64::from(f)),
        (Value::String(s), "bytes") => Value::Bytes(s.into_bytes()),
        (Value::Bytes(b), "string") => {
            Value::String(String::from_utf8(b).map_err(|e| e.to_string())?)
        }
        (other, _) => other,
    };

    let annotated = match (reader, widened) {
        (AvroSchema::Date, Value::Int(n)) => Value::Date(n),
        (AvroSchema::TimeMillis, Value::Int(n)) => Value::TimeMillis(n),
        (AvroSchema::TimeMicros, Value::Long(n)) => Value::TimeMicros(n),
        (AvroSchema::TimestampMillis, Value::Long(n)) => Value::TimestampMillis(n),
        (AvroSchema::TimestampMicros, Value::Long(n)) => Value::TimestampMicros(n),
        (AvroSchema::TimestampNanos, Value::Long(n)) => Value::TimestampNanos(n),
        (AvroSchema::LocalTimestampMillis, Value::Long(n)) => Value::LocalTimestampMillis(n),
        (AvroSchema::LocalTimestampMicros, Value::Long(n)) => Value::LocalTimestampMicros(n),
        (AvroSchema::LocalTimestampNanos, Value::Long(n)) => Value::LocalTimestampNanos(n),
        (AvroSchema::Uuid, Value::String(s)) => {
            Value::Uuid(uuid::Uuid::parse_str(&s).map_err(|e| format!("'{s}': {e}"))?)
        }
        (AvroSchema::Decimal(_), Value::Bytes(b)) => Value::Decimal(apache_avro::Decimal::from(b)),
        (_, other) => other,
    };
    Ok(annotated)
}

fn promotes(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    matches!(
        (writer, reader),
        (AvroSchema::Int, AvroSchema::Long | AvroSchema::Float | AvroSchema::Double)
            | (AvroSchema::Long, AvroSchema::Float | AvroSchema::Double)
            | (AvroSchema::Float, AvroSchema::Double)
            | (AvroSchema::String, AvroSchema::Bytes)
            | (AvroSchema::Bytes, AvroSchema::String)
    ) || logical_compatible(writer, reader)
        || (matches!(writer, AvroSchema::Record(_) | AvroSchema::Enum(_) | AvroSchema::Fixed(_))
            && same_kind(writer, reader)
            && names_match(writer, reader))
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}.{field}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "value".to_string()
    } else {
        format!("field '{path}'")
    }
}
