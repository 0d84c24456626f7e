use std::collections::HashMap;
use std::sync::Arc;

use proptest::collection::{hash_map, vec};
use proptest::prelude::*;

use xfabric_api::{ContentType, Record, Schema, Value};
use xfabric_engine::codec;

const SHIPMENT: &str = r#"{
    "type": "record", "name": "Shipment", "namespace": "logistics",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "qty", "type": "int"},
        {"name": "count", "type": "long"},
        {"name": "weight", "type": "float"},
        {"name": "score", "type": "double"},
        {"name": "fragile", "type": "boolean"},
        {"name": "raw", "type": "bytes"},
        {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "SHIPPED", "LOST"]}},
        {"name": "digest", "type": {"type": "fixed", "name": "Digest", "size": 4}},
        {"name": "origin", "type": {"type": "record", "name": "Address", "fields": [
            {"name": "city", "type": "string"},
            {"name": "zip", "type": ["null", "string"]}
        ]}},
        {"name": "destination", "type": "Address"},
        {"name": "tags", "type": {"type": "map", "values": "long"}},
        {"name": "checkpoints", "type": {"type": "array", "items": "Address"}},
        {"name": "note", "type": ["null", "string", "Status"]},
        {"name": "route", "type": ["null", {"type": "record", "name": "Hop", "fields": [
            {"name": "stop", "type": "string"},
            {"name": "next", "type": ["null", "Hop"]}
        ]}]},
        {"name": "sent_at", "type": {"type": "long", "logicalType": "timestamp-millis"}}
    ]
}"#;

const SYMBOLS: [&str; 3] = ["NEW", "SHIPPED", "LOST"];

fn schema() -> Arc<Schema> {
    Arc::new(Schema::parse_str(SHIPMENT).unwrap())
}

fn null() -> Value {
    Value::Union(0, Box::new(Value::Null))
}

fn address(city: &str, zip: Option<&str>) -> Value {
    Value::Record(vec![
        ("city".into(), Value::String(city.into())),
        (
            "zip".into(),
            zip.map_or_else(null, |z| Value::Union(1, Box::new(Value::String(z.into())))),
        ),
    ])
}

fn status(index: u32) -> Value {
    Value::Enum(index, SYMBOLS[index as usize].into())
}

/// Linked hops, innermost last.
fn route(stops: &[String]) -> Value {
    stops.iter().rev().fold(null(), |next, stop| {
        Value::Union(
            1,
            Box::new(Value::Record(vec![
                ("stop".into(), Value::String(stop.clone())),
                ("next".into(), next),
            ])),
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn shipment(
    id: String,
    qty: i32,
    count: i64,
    weight: f32,
    score: f64,
    fragile: bool,
    raw: Vec<u8>,
    state: u32,
    digest: [u8; 4],
    origin: Value,
    destination: Value,
    tags: HashMap<String, i64>,
    checkpoints: Vec<Value>,
    note: Value,
    stops: &[String],
    sent_at: i64,
) -> Value {
    Value::Record(vec![
        ("id".into(), Value::String(id)),
        ("qty".into(), Value::Int(qty)),
        ("count".into(), Value::Long(count)),
        ("weight".into(), Value::Float(weight)),
        ("score".into(), Value::Double(score)),
        ("fragile".into(), Value::Boolean(fragile)),
        ("raw".into(), Value::Bytes(raw)),
        ("status".into(), status(state)),
        ("digest".into(), Value::Fixed(4, digest.to_vec())),
        ("origin".into(), origin),
        ("destination".into(), destination),
        (
            "tags".into(),
            Value::Map(tags.into_iter().map(|(k, v)| (k, Value::Long(v))).collect()),
        ),
        ("checkpoints".into(), Value::Array(checkpoints)),
        ("note".into(), note),
        ("route".into(), route(stops)),
        ("sent_at".into(), Value::TimestampMillis(sent_at)),
    ])
}

fn assert_round_trip(record: &Record) {
    for format in [ContentType::Binary, ContentType::Json] {
        let bytes = codec::encode(record, format).unwrap();
        let decoded = codec::decode(&bytes, record.schema(), record.schema(), format).unwrap();
        assert_eq!(decoded.value(), record.value(), "{format}");
    }
}

#[test]
fn sample_shipments_survive_both_forms() {
    let sparse = shipment(
        String::new(),
        0,
        0,
        0.0,
        0.0,
        false,
        Vec::new(),
        0,
        [0; 4],
        address("", None),
        address("", None),
        HashMap::new(),
        Vec::new(),
        null(),
        &[],
        0,
    );
    let full = shipment(
        "sh-1".into(),
        -7,
        i64::MAX,
        2.5,
        -1.0e-9,
        true,
        vec![0x00, 0x7f, 0x80, 0xff],
        2,
        [0xde, 0xad, 0xbe, 0xef],
        address("Lyon", Some("69001")),
        address("Zürich", None),
        HashMap::from([("pallets".into(), 3), ("crates".into(), i64::MIN)]),
        vec![address("Basel", Some("4001")), address("Bern", None)],
        Value::Union(2, Box::new(status(1))),
        &["Lyon".into(), "Geneva".into(), "Zürich".into()],
        1_700_000_000_000,
    );
    let text_note = shipment(
        "sh-2".into(),
        1,
        1,
        1.0,
        1.0,
        false,
        vec![1],
        1,
        [1, 2, 3, 4],
        address("a", None),
        address("b", None),
        HashMap::new(),
        Vec::new(),
        Value::Union(1, Box::new(Value::String("handle with care".into()))),
        &["x".into()],
        -1,
    );

    for value in [sparse, full, text_note] {
        assert_round_trip(&Record::new(schema(), value));
    }
}

fn arb_address() -> impl Strategy<Value = Value> {
    ("[a-zA-Z ]{0,12}", proptest::option::of("[0-9]{5}"))
        .prop_map(|(city, zip)| address(&city, zip.as_deref()))
}

fn arb_note() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(null()),
        any::<String>().prop_map(|s| Value::Union(1, Box::new(Value::String(s)))),
        (0u32..3).prop_map(|i| Value::Union(2, Box::new(status(i)))),
    ]
}

fn arb_shipment() -> impl Strategy<Value = Value> {
    let scalars = (
        any::<String>(),
        any::<i32>(),
        any::<i64>(),
        -1.0e6f32..1.0e6f32,
        -1.0e12f64..1.0e12f64,
        any::<bool>(),
        vec(any::<u8>(), 0..16),
        0u32..3,
        proptest::array::uniform4(any::<u8>()),
    );
    let nested = (
        arb_address(),
        arb_address(),
        hash_map("[a-z]{1,8}", any::<i64>(), 0..4),
        vec(arb_address(), 0..3),
        arb_note(),
        vec("[a-z]{1,6}", 0..4),
        any::<i64>(),
    );
    (scalars, nested).prop_map(
        |(
            (id, qty, count, weight, score, fragile, raw, state, digest),
            (origin, destination, tags, checkpoints, note, stops, sent_at),
        )| {
            shipment(
                id, qty, count, weight, score, fragile, raw, state, digest, origin, destination,
                tags, checkpoints, note, &stops, sent_at,
            )
        },
    )
}

proptest! {
    #[test]
    fn any_shipment_survives_both_forms(value in arb_shipment()) {
        let record = Record::new(schema(), value);
        for format in [ContentType::Binary, ContentType::Json] {
            let bytes = codec::encode(&record, format).unwrap();
            let decoded = codec::decode(&bytes, record.schema(), record.schema(), format).unwrap();
            prop_assert_eq!(decoded.value(), record.value());
        }
    }
}
