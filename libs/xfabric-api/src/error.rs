use std::fmt;

use crate::schema::SchemaKey;

/// Coarse category of a [`FabricError`].
///
/// Lets a host decide what to do with a failed message without matching on
/// every variant: drop it, retry later, or refuse to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad schema definition or no schema for a key.
    Schema,
    /// Network failure while resolving a remote schema.
    Io,
    /// Payload does not match its schema or content type.
    Format,
    /// Local configuration or bundle problem, fail at startup.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Schema => f.write_str("schema"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Format => f.write_str("format"),
            ErrorKind::Config => f.write_str("config"),
        }
    }
}

/// Failure surfaced by the schema cache, fetcher, codec and resolver.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// A local schema bundle could not be read or parsed.
    #[error("schema bundle '{bundle}': {detail}")]
    SchemaLoad { bundle: String, detail: String },

    /// A remote schema could not be fetched or parsed.
    #[error("schema fetch '{url}': {detail}")]
    SchemaFetch { url: String, detail: String },

    /// No writer schema for the key: cache miss with no URL, or the fetch failed.
    #[error("schema {key} unavailable: {reason}")]
    SchemaUnavailable { key: SchemaKey, reason: String },

    /// Schema text is not a valid schema document.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Record value does not conform to its own schema.
    #[error("encode: {0}")]
    Encode(String),

    /// Payload bytes are malformed for the declared content type.
    #[error("decode: {0}")]
    Decode(String),

    /// Writer and reader schemas disagree on an overlapping field.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Content type is neither the binary nor the textual form.
    #[error("unknown content type '{0}'")]
    UnknownContentType(String),
}

impl FabricError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FabricError::SchemaLoad { .. } => ErrorKind::Config,
            FabricError::SchemaFetch { .. } => ErrorKind::Io,
            FabricError::SchemaUnavailable { .. }
            | FabricError::InvalidSchema(_)
            | FabricError::SchemaMismatch(_) => ErrorKind::Schema,
            FabricError::Encode(_)
            | FabricError::Decode(_)
            | FabricError::UnknownContentType(_) => ErrorKind::Format,
        }
    }

    /// Only network-side fetch failures are worth retrying; nothing is retried internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FabricError::SchemaFetch { .. })
    }

    /// Add context to the error, preserving the variant.
    ///
    /// Produces: `"context: original detail"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            FabricError::SchemaLoad { bundle, detail } => FabricError::SchemaLoad {
                bundle,
                detail: format!("{ctx}: {detail}"),
            },
            FabricError::SchemaFetch { url, detail } => FabricError::SchemaFetch {
                url,
                detail: format!("{ctx}: {detail}"),
            },
            FabricError::SchemaUnavailable { key, reason } => FabricError::SchemaUnavailable {
                key,
                reason: format!("{ctx}: {reason}"),
            },
            FabricError::InvalidSchema(m) => FabricError::InvalidSchema(format!("{ctx}: {m}")),
            FabricError::Encode(m) => FabricError::Encode(format!("{ctx}: {m}")),
            FabricError::Decode(m) => FabricError::Decode(format!("{ctx}: {m}")),
            FabricError::SchemaMismatch(m) => FabricError::SchemaMismatch(format!("{ctx}: {m}")),
            other @ FabricError::UnknownContentType(_) => other,
        }
    }
}
