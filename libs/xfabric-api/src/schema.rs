use std::collections::BTreeMap;
use std::fmt;

use crate::error::FabricError;

/// Schema property naming the topic a definition belongs to.
pub const TOPIC_PROP: &str = "topic";
/// Schema property naming the definition's version within its topic.
pub const VERSION_PROP: &str = "version";

/// Attributes the schema language itself interprets. Everything else on the
/// top-level definition is a free-form property.
const RESERVED_ATTRS: &[&str] = &[
    "type",
    "name",
    "namespace",
    "fields",
    "doc",
    "aliases",
    "symbols",
    "items",
    "values",
    "size",
    "default",
    "order",
    "logicalType",
    "precision",
    "scale",
];

/// Cache key: `(topic, version)`, compared exactly and case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaKey {
    topic: String,
    version: String,
}

impl SchemaKey {
    pub fn new(topic: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            version: version.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.version)
    }
}

/// Immutable parsed schema definition.
///
/// Wraps the Avro schema together with the string properties declared on the
/// top-level definition. Topic-scoped definitions carry `topic` and `version`;
/// definitions fetched ad hoc by URL may carry neither.
///
/// Shared read-only (`Arc<Schema>`) once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    avro: apache_avro::Schema,
    name: Option<String>,
    properties: BTreeMap<String, String>,
}

impl Schema {
    /// Parse a schema document from text.
    pub fn parse_str(text: &str) -> Result<Self, FabricError> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| FabricError::InvalidSchema(format!("not a JSON document: {e}")))?;
        Self::from_json(&json)
    }

    /// Parse a schema from an already-decoded JSON tree.
    ///
    /// The tree must be self-contained: every named type it references is
    /// defined inside it.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FabricError> {
        let avro = apache_avro::Schema::parse(json)
            .map_err(|e| FabricError::InvalidSchema(e.to_string()))?;

        let mut properties = BTreeMap::new();
        let mut name = None;
        if let serde_json::Value::Object(map) = json {
            for (attr, value) in map {
                if RESERVED_ATTRS.contains(&attr.as_str()) {
                    continue;
                }
                if let serde_json::Value::String(s) = value {
                    properties.insert(attr.clone(), s.clone());
                }
            }
            name = full_name(map);
        }

        Ok(Self {
            avro,
            name,
            properties,
        })
    }

    /// Wrap an Avro schema that carries no properties.
    pub fn from_avro(avro: apache_avro::Schema) -> Self {
        Self {
            avro,
            name: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn avro(&self) -> &apache_avro::Schema {
        &self.avro
    }

    /// Full name of the top-level named type, if it is one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn topic(&self) -> Option<&str> {
        self.property(TOPIC_PROP)
    }

    pub fn version(&self) -> Option<&str> {
        self.property(VERSION_PROP)
    }

    /// `(topic, version)` when both properties are present.
    pub fn key(&self) -> Option<SchemaKey> {
        Some(SchemaKey::new(self.topic()?, self.version()?))
    }

    /// Parsing Canonical Form, used to compare definitions structurally.
    pub fn canonical_form(&self) -> String {
        self.avro.canonical_form()
    }
}

fn full_name(map: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    let name = map.get("name")?.as_str()?;
    if name.contains('.') {
        return Some(name.to_string());
    }
    match map.get("namespace").and_then(|ns| ns.as_str()) {
        Some(ns) if !ns.is_empty() => Some(format!("{ns}.{name}")),
        _ => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_V1: &str = r#"{
        "type": "record",
        "name": "Order",
        "namespace": "com.example.orders",
        "topic": "/orders/created",
        "version": "1.0",
        "owner": "fulfilment",
        "fields": [
            {"name": "id", "type": "string"},
            {"name": "amount", "type": "int"}
        ]
    }"#;

    #[test]
    fn parses_properties_from_top_level() {
        let schema = Schema::parse_str(ORDER_V1).unwrap();
        assert_eq!(schema.topic(), Some("/orders/created"));
        assert_eq!(schema.version(), Some("1.0"));
        assert_eq!(schema.property("owner"), Some("fulfilment"));
        assert_eq!(schema.property("fields"), None);
        assert_eq!(schema.name(), Some("com.example.orders.Order"));
        assert_eq!(schema.key(), Some(SchemaKey::new("/orders/created", "1.0")));
    }

    #[test]
    fn adhoc_schema_has_no_key() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "Ping", "fields": [{"name": "at", "type": "long"}]}"#,
        )
        .unwrap();
        assert_eq!(schema.key(), None);
        assert_eq!(schema.name(), Some("Ping"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            Schema::parse_str("{not json"),
            Err(FabricError::InvalidSchema(_))
        ));
        assert!(matches!(
            Schema::parse_str(r#"{"type": "record", "name": "X"}"#),
            Err(FabricError::InvalidSchema(_))
        ));
    }

    #[test]
    fn keys_are_case_sensitive() {
        assert_ne!(SchemaKey::new("orders", "v1"), SchemaKey::new("Orders", "v1"));
        assert_eq!(SchemaKey::new("orders", "v1").to_string(), "orders/v1");
    }
}
