use std::io::Write;

use xfabric_api::ContentType;
use xfabric_engine::codec;

use crate::cmd::{load_schema, read_input};
use crate::config::EncodeArgs;
use crate::error::CliError;

pub fn run(args: EncodeArgs) -> Result<(), CliError> {
    let schema = load_schema(&args.schema)?;
    let input = read_input(&args.input)?;

    // Parsing the textual form with its own schema validates the document.
    let record = codec::decode(&input, &schema, &schema, ContentType::Json)?;
    let bytes = codec::encode(&record, args.format)?;

    match &args.output {
        Some(path) => std::fs::write(path, &bytes).map_err(|e| CliError::File {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    tracing::info!(bytes = bytes.len(), format = %args.format, "encoded record");
    Ok(())
}
