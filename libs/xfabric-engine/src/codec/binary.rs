use apache_avro::Schema as AvroSchema;
use apache_avro::types::Value;

use xfabric_api::FabricError;

use super::conform;
use super::names::NamedTypes;

/// Schema-less binary datum for `value`.
pub(crate) fn encode(schema: &AvroSchema, value: &Value) -> Result<Vec<u8>, FabricError> {
    let names = NamedTypes::collect(schema);
    conform::check(value, schema, &names).map_err(FabricError::Encode)?;
    apache_avro::to_avro_datum(schema, value.clone()).map_err(|e| FabricError::Encode(e.to_string()))
}

/// Read exactly one datum; leftover bytes mean the payload was not written
/// with `schema`.
pub(crate) fn decode(schema: &AvroSchema, bytes: &[u8]) -> Result<Value, FabricError> {
    let mut reader = bytes;
    let value = apache_avro::from_avro_datum(schema, &mut reader, None)
        .map_err(|e| FabricError::Decode(e.to_string()))?;
    if !reader.is_empty() {
        return Err(FabricError::Decode(format!(
            "{} trailing bytes after datum",
            reader.len()
        )));
    }
    Ok(value)
}
