use xfabric_api::{ContentType, FabricError};
use xfabric_transport::{FabricClient, OutboundMessage, TransportConfig};

use crate::cmd::read_input;
use crate::config::PostArgs;
use crate::error::CliError;

pub async fn run(args: PostArgs) -> Result<(), CliError> {
    let payload = read_input(&args.payload)?;
    let mut message = match args.format {
        ContentType::Json => {
            let text = String::from_utf8(payload)
                .map_err(|e| FabricError::Encode(format!("payload is not UTF-8: {e}")))?;
            OutboundMessage::from_json_string(text)?
        }
        ContentType::Binary => OutboundMessage::new(ContentType::Binary, payload),
    };
    message.schema_version = args.schema_version;
    message.schema_uri = args.schema_uri;
    message.destination_id = args.destination_id;
    message.continuation_guid = args.continuation_guid;
    message.idempotency_id = args.idempotency_id;
    message.correlation_id = args.correlation_id;

    let mut config = TransportConfig::new(args.url);
    config.http.ca_bundle = args.ca_bundle;
    config.http.https_only = !args.allow_http;
    let client = FabricClient::new(&config)?;

    let status = client.post(&args.topic, &args.token, &message).await?;
    tracing::info!(topic = %args.topic, %status, "posted message");
    if !status.is_success() {
        return Err(CliError::Rejected(status.as_u16()));
    }
    println!("{}", status.as_u16());
    Ok(())
}
