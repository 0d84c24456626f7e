pub mod bundle;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod global;
pub mod resolver;

pub use cache::SchemaCache;
pub use config::{EngineConfig, HttpClientConfig};
pub use error::EngineError;
pub use fetcher::{HttpSchemaFetcher, SchemaFetcher};
pub use resolver::{MessageDecoder, WireEnvelope, WriterSource};
