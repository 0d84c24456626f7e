use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use xfabric_api::ContentType;
use xfabric_config_hcl::HclParser;
use xfabric_engine::EngineConfig;
use xfabric_engine::config::{self, ConfigParser, TomlParser};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "xfabric", about = "Event fabric codec and schema resolution tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a payload into a reader schema and print it as JSON
    Decode(DecodeArgs),
    /// Encode a JSON document with a schema
    Encode(EncodeArgs),
    /// Publish a payload to a fabric topic
    Post(PostArgs),
    /// Receive fabric messages over HTTP and log them
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct DecodeArgs {
    /// Payload file, `-` for stdin
    #[arg(long)]
    pub payload: PathBuf,

    /// Wire form of the payload: binary, json, or a MIME type
    #[arg(long, default_value = "binary")]
    pub format: ContentType,

    /// Reader schema file
    #[arg(long, required_unless_present = "raw")]
    pub reader: Option<PathBuf>,

    /// Writer schema file; otherwise resolved through the schema cache
    #[arg(long)]
    pub writer: Option<PathBuf>,

    /// Topic the payload was published on (defaults to the reader's)
    #[arg(long)]
    pub topic: Option<String>,

    /// Version the payload was written with (defaults to the reader's)
    #[arg(long)]
    pub schema_version: Option<String>,

    /// Where to fetch the writer schema if it is not in a bundle
    #[arg(long)]
    pub schema_uri: Option<String>,

    /// Engine config listing schema bundles
    #[arg(long, env = "XFABRIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print a textual payload as-is, without any schema
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Clone, Debug)]
pub struct EncodeArgs {
    /// Schema file
    #[arg(long)]
    pub schema: PathBuf,

    /// JSON document, `-` for stdin
    #[arg(long, default_value = "-")]
    pub input: PathBuf,

    #[arg(long, default_value = "binary")]
    pub format: ContentType,

    /// Output file; stdout when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct PostArgs {
    /// Fabric base URL
    #[arg(long, env = "XFABRIC_URL")]
    pub url: String,

    #[arg(long)]
    pub topic: String,

    #[arg(long, env = "XFABRIC_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Payload file, `-` for stdin
    #[arg(long)]
    pub payload: PathBuf,

    #[arg(long, default_value = "binary")]
    pub format: ContentType,

    #[arg(long)]
    pub schema_version: Option<String>,

    #[arg(long)]
    pub schema_uri: Option<String>,

    #[arg(long)]
    pub destination_id: Option<String>,

    #[arg(long)]
    pub continuation_guid: Option<String>,

    #[arg(long)]
    pub idempotency_id: Option<String>,

    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Extra PEM root certificate to trust
    #[arg(long)]
    pub ca_bundle: Option<PathBuf>,

    /// Permit plain http:// base URLs
    #[arg(long)]
    pub allow_http: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to TOML or HCL configuration file
    #[arg(long, default_value = "xfabric.toml", env = "XFABRIC_CONFIG")]
    pub config: PathBuf,

    /// Bearer token expected on inbound requests (overrides the config)
    #[arg(long, env = "XFABRIC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

// ---- Serve config ----

#[derive(Debug, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Topics to accept, each with the schema version it is read as.
    #[serde(default)]
    pub topics: Vec<TopicBinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicBinding {
    pub name: String,
    pub reader_version: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

const PARSERS: &[&dyn ConfigParser] = &[&TomlParser, &HclParser];

impl ServeConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        config::load(path, PARSERS).map_err(|e| CliError::Config {
            context: "serve",
            detail: e.to_string(),
        })
    }
}

/// Engine settings for one-shot commands; defaults when no file is given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => config::load(path, PARSERS).map_err(|e| CliError::Config {
            context: "engine",
            detail: e.to_string(),
        }),
        None => Ok(EngineConfig::default()),
    }
}
