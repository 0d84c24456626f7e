pub mod client;
pub mod error;
pub mod headers;
pub mod inbound;
pub mod outbound;

pub use client::{FabricClient, TransportConfig};
pub use error::TransportError;
pub use inbound::InboundMessage;
pub use outbound::OutboundMessage;
