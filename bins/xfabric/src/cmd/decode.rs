use std::sync::Arc;

use xfabric_engine::codec;
use xfabric_engine::{MessageDecoder, SchemaCache, WireEnvelope};

use crate::cmd::{load_schema, read_input};
use crate::config::{DecodeArgs, load_engine_config};
use crate::error::CliError;

pub async fn run(args: DecodeArgs) -> Result<(), CliError> {
    let payload = read_input(&args.payload)?;

    if args.raw {
        println!("{}", codec::raw_json_string(&payload, args.format)?);
        return Ok(());
    }

    let reader_path = args
        .reader
        .as_deref()
        .ok_or(CliError::Usage("--reader is required unless --raw is given"))?;
    let reader = load_schema(reader_path)?;

    let record = match args.writer.as_deref() {
        Some(path) => {
            let writer = load_schema(path)?;
            codec::decode(&payload, &writer, &reader, args.format)?
        }
        None => {
            let engine = load_engine_config(args.config.as_deref())?;
            let cache = Arc::new(SchemaCache::from_config(&engine)?);
            let decoder = MessageDecoder::new(cache);

            let topic = args
                .topic
                .as_deref()
                .or(reader.topic())
                .ok_or(CliError::Usage("--topic is required when the reader schema names none"))?;
            let schema_version = args
                .schema_version
                .as_deref()
                .or(reader.version())
                .ok_or(CliError::Usage("--schema-version is required when the reader schema has none"))?;

            let envelope = WireEnvelope {
                topic,
                schema_version,
                schema_uri: args.schema_uri.as_deref(),
                content_type: args.format,
                payload: &payload,
            };
            decoder.decode(&envelope, &reader).await?
        }
    };

    println!("{}", codec::to_json_string(&record)?);
    Ok(())
}
