use std::fmt;
use std::str::FromStr;

use crate::error::FabricError;

/// Wire representation of a payload. Both forms are schema-less on the wire;
/// the schema always travels out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Compact binary datum.
    #[default]
    Binary,
    /// Structured text document mirroring the schema.
    Json,
}

impl ContentType {
    pub const BINARY_MIME: &'static str = "avro/binary";
    pub const JSON_MIME: &'static str = "avro/json";

    /// MIME type sent in the `Content-Type` header.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Binary => Self::BINARY_MIME,
            ContentType::Json => Self::JSON_MIME,
        }
    }

    /// Parse a `Content-Type` header value. Parameters (`; charset=...`) are
    /// ignored, the media type is compared case-insensitively, and anything
    /// other than the two known forms is an error.
    pub fn from_header(value: &str) -> Result<Self, FabricError> {
        let media = value.split(';').next().unwrap_or_default().trim();
        if media.eq_ignore_ascii_case(Self::BINARY_MIME) {
            Ok(ContentType::Binary)
        } else if media.eq_ignore_ascii_case(Self::JSON_MIME) {
            Ok(ContentType::Json)
        } else {
            Err(FabricError::UnknownContentType(value.to_string()))
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for ContentType {
    type Err = FabricError;

    /// Accepts the MIME form or the short names `binary` / `json`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "binary" => Ok(ContentType::Binary),
            "json" => Ok(ContentType::Json),
            other => Self::from_header(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_values() {
        assert_eq!(ContentType::from_header("avro/binary").unwrap(), ContentType::Binary);
        assert_eq!(
            ContentType::from_header("AVRO/JSON; charset=utf-8").unwrap(),
            ContentType::Json
        );
    }

    #[test]
    fn unknown_type_fails_loudly() {
        let err = ContentType::from_header("application/octet-stream").unwrap_err();
        assert!(matches!(err, FabricError::UnknownContentType(ref v) if v == "application/octet-stream"));
    }

    #[test]
    fn short_names() {
        assert_eq!("json".parse::<ContentType>().unwrap(), ContentType::Json);
        assert_eq!("binary".parse::<ContentType>().unwrap(), ContentType::Binary);
        assert!("xml".parse::<ContentType>().is_err());
    }
}
