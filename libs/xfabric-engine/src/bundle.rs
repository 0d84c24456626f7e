//! Schema bundle parsing.
//!
//! A bundle is a file holding several schema definitions. Three layouts are
//! accepted:
//!
//! * a protocol document: `{"protocol": ..., "namespace": ..., "types": [...]}`
//! * a JSON array of schema definitions
//! * a single schema definition
//!
//! Definitions may refer by name to named types declared earlier in the same
//! bundle. Each definition is made self-contained before parsing by inlining
//! the first use of every such type and leaving later uses as full-name
//! references.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use xfabric_api::{FabricError, Schema};

const PRIMITIVES: &[&str] = &[
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

const NAMED_KINDS: &[&str] = &["record", "error", "enum", "fixed"];

/// Parse every definition in a bundle, in declaration order.
///
/// Fails on the first definition that does not parse; nothing is returned
/// for a partially valid bundle.
pub fn parse_bundle(text: &str) -> Result<Vec<Schema>, FabricError> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| FabricError::InvalidSchema(format!("not a JSON document: {e}")))?;

    let (namespace, types) = match doc {
        Value::Object(mut map) if map.contains_key("protocol") || map.contains_key("types") => {
            let namespace = map
                .get("namespace")
                .and_then(Value::as_str)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string);
            let types = match map.remove("types") {
                Some(Value::Array(types)) => types,
                None => Vec::new(),
                Some(_) => {
                    return Err(FabricError::InvalidSchema(
                        "protocol 'types' must be an array".into(),
                    ));
                }
            };
            (namespace, types)
        }
        Value::Array(items) => (None, items),
        single @ Value::Object(_) => (None, vec![single]),
        _ => {
            return Err(FabricError::InvalidSchema(
                "bundle must be a protocol, a schema, or an array of schemas".into(),
            ));
        }
    };

    let mut known: HashMap<String, Value> = HashMap::new();
    let mut schemas = Vec::with_capacity(types.len());
    for (index, definition) in types.iter().enumerate() {
        let mut seen = HashSet::new();
        let expanded = expand(definition, namespace.as_deref(), &known, &mut seen);
        let schema = Schema::from_json(&expanded).map_err(|e| {
            let label = definition
                .get("name")
                .and_then(Value::as_str)
                .map(|n| format!("type '{n}'"))
                .unwrap_or_else(|| format!("type #{index}"));
            e.with_context(label)
        })?;
        collect_named(&expanded, &mut known);
        schemas.push(schema);
    }
    Ok(schemas)
}

fn expand(
    node: &Value,
    namespace: Option<&str>,
    known: &HashMap<String, Value>,
    seen: &mut HashSet<String>,
) -> Value {
    match node {
        Value::String(name) => expand_reference(name, namespace, known, seen),
        Value::Array(branches) => Value::Array(
            branches
                .iter()
                .map(|b| expand(b, namespace, known, seen))
                .collect(),
        ),
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some(kind) if NAMED_KINDS.contains(&kind) => {
                expand_named(map, kind, namespace, known, seen)
            }
            Some("array") => expand_attr(map, "items", namespace, known, seen),
            Some("map") => expand_attr(map, "values", namespace, known, seen),
            _ => expand_attr(map, "type", namespace, known, seen),
        },
        other => other.clone(),
    }
}

fn expand_named(
    map: &Map<String, Value>,
    kind: &str,
    namespace: Option<&str>,
    known: &HashMap<String, Value>,
    seen: &mut HashSet<String>,
) -> Value {
    let name = map.get("name").and_then(Value::as_str).unwrap_or_default();
    let declared_ns = map.get("namespace").and_then(Value::as_str);
    let (full, own_ns) = qualify_definition(name, declared_ns, namespace);

    if !full.is_empty() && !seen.insert(full.clone()) {
        return Value::String(full);
    }

    let mut out = map.clone();
    if kind == "error" {
        out.insert("type".into(), Value::String("record".into()));
    }
    if !name.contains('.') {
        if let Some(ns) = &own_ns {
            out.insert("namespace".into(), Value::String(ns.clone()));
        }
    }

    if let Some(Value::Array(fields)) = map.get("fields") {
        let fields = fields
            .iter()
            .map(|field| match field {
                Value::Object(f) => expand_attr(f, "type", own_ns.as_deref(), known, seen),
                other => other.clone(),
            })
            .collect();
        out.insert("fields".into(), Value::Array(fields));
    }
    Value::Object(out)
}

fn expand_attr(
    map: &Map<String, Value>,
    attr: &str,
    namespace: Option<&str>,
    known: &HashMap<String, Value>,
    seen: &mut HashSet<String>,
) -> Value {
    let mut out = map.clone();
    if let Some(inner) = map.get(attr) {
        out.insert(attr.into(), expand(inner, namespace, known, seen));
    }
    Value::Object(out)
}

fn expand_reference(
    name: &str,
    namespace: Option<&str>,
    known: &HashMap<String, Value>,
    seen: &mut HashSet<String>,
) -> Value {
    if PRIMITIVES.contains(&name) {
        return Value::String(name.to_string());
    }

    let mut candidates = Vec::with_capacity(2);
    if !name.contains('.') {
        if let Some(ns) = namespace {
            candidates.push(format!("{ns}.{name}"));
        }
    }
    candidates.push(name.to_string());

    for full in candidates {
        if seen.contains(&full) {
            return Value::String(full);
        }
        if let Some(definition) = known.get(&full) {
            return expand(definition, namespace_of(&full), known, seen);
        }
    }
    // Unknown names are left for the schema parser to report.
    Value::String(name.to_string())
}

/// Full name and effective namespace of a named definition.
fn qualify_definition(
    name: &str,
    declared_ns: Option<&str>,
    enclosing_ns: Option<&str>,
) -> (String, Option<String>) {
    if name.contains('.') {
        return (name.to_string(), namespace_of(name).map(str::to_string));
    }
    let ns = declared_ns.or(enclosing_ns).filter(|ns| !ns.is_empty());
    match ns {
        Some(ns) => (format!("{ns}.{name}"), Some(ns.to_string())),
        None => (name.to_string(), None),
    }
}

fn namespace_of(full: &str) -> Option<&str> {
    full.rsplit_once('.').map(|(ns, _)| ns)
}

/// Record every named definition in an expanded tree. Expanded definitions
/// carry explicit namespaces, so no enclosing context is needed.
fn collect_named(node: &Value, known: &mut HashMap<String, Value>) {
    match node {
        Value::Array(branches) => {
            for branch in branches {
                collect_named(branch, known);
            }
        }
        Value::Object(map) => {
            let kind = map.get("type");
            if let Some(Value::String(kind)) = kind {
                if NAMED_KINDS.contains(&kind.as_str()) {
                    if let Some(name) = map.get("name").and_then(Value::as_str) {
                        let declared_ns = map.get("namespace").and_then(Value::as_str);
                        let (full, _) = qualify_definition(name, declared_ns, None);
                        known.insert(full, node.clone());
                    }
                }
            } else if let Some(inner) = kind {
                collect_named(inner, known);
            }
            for attr in ["items", "values"] {
                if let Some(inner) = map.get(attr) {
                    collect_named(inner, known);
                }
            }
            if let Some(Value::Array(fields)) = map.get("fields") {
                for field in fields {
                    if let Some(inner) = field.get("type") {
                        collect_named(inner, known);
                    }
                }
            }
        }
        _ => {}
    }
}
