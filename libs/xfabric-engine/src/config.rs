use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::EngineError;

/// Engine configuration: which bundles to preload and how to reach remote schemas.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Local schema bundle files, loaded in order at startup.
    #[serde(default)]
    pub bundles: Vec<PathBuf>,

    /// HTTP settings for fetching schemas by URL.
    #[serde(default)]
    pub fetcher: HttpClientConfig,
}

/// Timeouts and TLS settings shared by every outgoing HTTP client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Refuse plain `http://` URLs.
    #[serde(default = "default_https_only")]
    pub https_only: bool,

    /// Extra PEM root certificate trusted in addition to the built-in roots.
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_read_timeout_ms() -> u64 {
    7_000
}

fn default_https_only() -> bool {
    true
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            https_only: default_https_only(),
            ca_bundle: None,
        }
    }
}

impl HttpClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Build a `reqwest` client with certificate verification always on.
    pub fn build_client(&self) -> Result<reqwest::Client, EngineError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout())
            .read_timeout(self.read_timeout())
            .https_only(self.https_only);

        if let Some(path) = &self.ca_bundle {
            let pem = std::fs::read(path)
                .map_err(|e| EngineError::Config(format!("ca bundle {}: {e}", path.display())))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| EngineError::Config(format!("ca bundle {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| EngineError::Config(format!("http client: {e}")))
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        load(path, &[&TomlParser])
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Config file formats
// ═══════════════════════════════════════════════════════════════

/// A configuration file syntax, selected by file extension.
///
/// Parsers produce a generic document tree; [`load`] maps it onto the
/// target config type so one parser serves every config struct.
pub trait ConfigParser: Send + Sync {
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<serde_json::Value, EngineError>;
}

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<serde_json::Value, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Read `path` with the first parser that claims its extension.
pub fn load<T: DeserializeOwned>(
    path: &Path,
    parsers: &[&dyn ConfigParser],
) -> Result<T, EngineError> {
    let ctx = path.display().to_string();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let parser = parsers
        .iter()
        .find(|p| p.extensions().iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .ok_or_else(|| EngineError::Config(format!("{ctx}: unsupported config format '{ext}'")))?;

    let content =
        std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{ctx}: {e}")))?;
    let doc = parser.parse(&content).map_err(|e| e.with_context(&ctx))?;
    serde_json::from_value(doc).map_err(|e| EngineError::Config(format!("{ctx}: {e}")))
}
