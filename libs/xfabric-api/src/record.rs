use std::collections::HashMap;
use std::sync::Arc;

use apache_avro::types::Value;

use crate::error::FabricError;
use crate::schema::Schema;

/// Application payload together with the schema it conforms to.
///
/// For encoding, `schema` is the writer's own schema. After decoding it is the
/// reader schema the value was reconciled against.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    value: Value,
}

impl Record {
    pub fn new(schema: Arc<Schema>, value: Value) -> Self {
        Self { schema, value }
    }

    /// Build a record value from named fields, laid out in schema order.
    ///
    /// Every schema field must be supplied; unknown names are rejected.
    pub fn from_fields<N: Into<String>>(
        schema: Arc<Schema>,
        fields: impl IntoIterator<Item = (N, Value)>,
    ) -> Result<Self, FabricError> {
        let apache_avro::Schema::Record(record_schema) = schema.avro() else {
            return Err(FabricError::Encode(
                "named fields require a record schema".into(),
            ));
        };

        let mut supplied: HashMap<String, Value> =
            fields.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let mut ordered = Vec::with_capacity(record_schema.fields.len());
        for field in &record_schema.fields {
            let value = supplied.remove(&field.name).ok_or_else(|| {
                FabricError::Encode(format!("missing value for field '{}'", field.name))
            })?;
            ordered.push((field.name.clone(), value));
        }
        if let Some(extra) = supplied.keys().next() {
            return Err(FabricError::Encode(format!(
                "field '{extra}' is not declared by the schema"
            )));
        }

        Ok(Self::new(schema, Value::Record(ordered)))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Top-level field value of a record payload.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.value {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_schema() -> Arc<Schema> {
        Arc::new(
            Schema::parse_str(
                r#"{"type": "record", "name": "Order", "fields": [
                    {"name": "id", "type": "string"},
                    {"name": "amount", "type": "int"}
                ]}"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn fields_are_laid_out_in_schema_order() {
        let record = Record::from_fields(
            order_schema(),
            [("amount", Value::Int(12)), ("id", Value::String("o-1".into()))],
        )
        .unwrap();
        assert_eq!(
            record.value(),
            &Value::Record(vec![
                ("id".into(), Value::String("o-1".into())),
                ("amount".into(), Value::Int(12)),
            ])
        );
        assert_eq!(record.field("amount"), Some(&Value::Int(12)));
    }

    #[test]
    fn missing_and_unknown_fields_are_rejected() {
        let missing = Record::from_fields(order_schema(), [("id", Value::String("o-1".into()))]);
        assert!(matches!(missing, Err(FabricError::Encode(_))));

        let unknown = Record::from_fields(
            order_schema(),
            [
                ("id", Value::String("o-1".into())),
                ("amount", Value::Int(1)),
                ("note", Value::Null),
            ],
        );
        assert!(matches!(unknown, Err(FabricError::Encode(_))));
    }
}
