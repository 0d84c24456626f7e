use xfabric_api::FabricError;
use xfabric_engine::EngineError;
use xfabric_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Usage(&'static str),

    #[error("'{path}': {detail}")]
    File { path: String, detail: String },

    #[error("fabric rejected the message with status {0}")]
    Rejected(u16),

    #[error(transparent)]
    Fabric(#[from] FabricError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
