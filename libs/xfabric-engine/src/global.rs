//! The process-wide schema cache.
//!
//! Hosts call [`init`] once at startup; everything else reaches the cache
//! through [`cache`]. The cache itself synchronizes all access.

use std::sync::{Arc, OnceLock};

use crate::cache::SchemaCache;
use crate::config::EngineConfig;
use crate::error::EngineError;

static GLOBAL: OnceLock<Arc<SchemaCache>> = OnceLock::new();

/// Build the cache from `config`, preload its bundles and install it.
///
/// Fails if a bundle does not load or the cache is already installed.
pub fn init(config: &EngineConfig) -> Result<Arc<SchemaCache>, EngineError> {
    if GLOBAL.get().is_some() {
        return Err(EngineError::Config("schema cache already initialized".into()));
    }
    let cache = Arc::new(SchemaCache::from_config(config)?);
    GLOBAL
        .set(Arc::clone(&cache))
        .map_err(|_| EngineError::Config("schema cache already initialized".into()))?;
    tracing::info!(schemas = cache.len(), "schema cache installed");
    Ok(cache)
}

/// The installed cache, if [`init`] has run.
pub fn cache() -> Option<Arc<SchemaCache>> {
    GLOBAL.get().cloned()
}
