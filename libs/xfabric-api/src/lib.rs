pub mod content_type;
pub mod error;
pub mod record;
pub mod schema;

pub use apache_avro::types::Value;
pub use content_type::ContentType;
pub use error::{ErrorKind, FabricError};
pub use record::Record;
pub use schema::{Schema, SchemaKey, TOPIC_PROP, VERSION_PROP};
