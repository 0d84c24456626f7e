use xfabric_api::FabricError;
use xfabric_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    #[error("invalid header {name}: {detail}")]
    InvalidHeader { name: &'static str, detail: String },

    #[error(transparent)]
    Fabric(#[from] FabricError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}
