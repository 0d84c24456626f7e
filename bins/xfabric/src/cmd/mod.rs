pub mod decode;
pub mod encode;
pub mod post;
pub mod serve;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use xfabric_api::Schema;

use crate::error::CliError;

/// Contents of `path`, or all of stdin for `-`.
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|e| CliError::File {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

pub(crate) fn load_schema(path: &Path) -> Result<Arc<Schema>, CliError> {
    let text = read_input(path)?;
    let text = String::from_utf8(text).map_err(|e| CliError::File {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    Ok(Arc::new(Schema::parse_str(&text)?))
}
