use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::OnceCell;

use xfabric_api::{FabricError, Schema, SchemaKey};

use crate::bundle;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fetcher::{HttpSchemaFetcher, SchemaFetcher};

type InFlight = Arc<OnceCell<Arc<Schema>>>;

/// Process-wide store of parsed schemas keyed by `(topic, version)`.
///
/// Reads never block each other. A miss with a URL triggers a fetch; concurrent
/// misses for the same key share one fetch. Failed fetches are not remembered,
/// so the next request retries.
pub struct SchemaCache<F = HttpSchemaFetcher> {
    entries: RwLock<HashMap<SchemaKey, Arc<Schema>>>,
    in_flight: Mutex<HashMap<SchemaKey, InFlight>>,
    fetcher: F,
}

impl<F> std::fmt::Debug for SchemaCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl<F> SchemaCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            fetcher,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Insert or replace the schema for `key`.
    pub fn put(&self, key: SchemaKey, schema: Arc<Schema>) {
        tracing::debug!(%key, "caching schema");
        self.write_entries().insert(key, schema);
    }

    /// Cached schema for `key`, if any. Never fetches.
    pub fn get(&self, key: &SchemaKey) -> Option<Arc<Schema>> {
        self.read_entries().get(key).cloned()
    }

    pub fn contains(&self, key: &SchemaKey) -> bool {
        self.read_entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of cached keys, sorted.
    pub fn keys(&self) -> Vec<SchemaKey> {
        let mut keys: Vec<_> = self.read_entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Load bundle files in order. Returns the number of schemas cached.
    ///
    /// Each bundle is parsed completely before any of its schemas are cached.
    /// Stops at the first failing bundle; bundles loaded before it stay cached.
    pub fn bulk_load<P: AsRef<Path>>(
        &self,
        bundles: impl IntoIterator<Item = P>,
    ) -> Result<usize, FabricError> {
        let mut total = 0;
        for path in bundles {
            let path = path.as_ref();
            let name = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|e| FabricError::SchemaLoad {
                bundle: name.clone(),
                detail: e.to_string(),
            })?;
            total += self.load_bundle(&name, &text)?;
        }
        Ok(total)
    }

    /// Parse one bundle document and cache its topic-scoped schemas.
    ///
    /// Definitions without both `topic` and `version` are parsed (so they can
    /// be referenced) but not cached.
    pub fn load_bundle(&self, bundle: &str, text: &str) -> Result<usize, FabricError> {
        let schemas = bundle::parse_bundle(text).map_err(|e| FabricError::SchemaLoad {
            bundle: bundle.to_string(),
            detail: e.to_string(),
        })?;

        let mut entries = self.write_entries();
        let mut loaded = 0;
        for schema in schemas {
            let Some(key) = schema.key() else {
                tracing::trace!(bundle, name = ?schema.name(), "skipping definition without topic/version");
                continue;
            };
            entries.insert(key, Arc::new(schema));
            loaded += 1;
        }
        drop(entries);

        tracing::info!(bundle, loaded, "loaded schema bundle");
        Ok(loaded)
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<SchemaKey, Arc<Schema>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            tracing::warn!("schema cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<SchemaKey, Arc<Schema>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::warn!("schema cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<SchemaKey, InFlight>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("schema fetch table lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl SchemaCache<HttpSchemaFetcher> {
    /// HTTPS-backed cache with the configured bundles preloaded.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let cache = Self::new(HttpSchemaFetcher::new(&config.fetcher)?);
        cache.bulk_load(&config.bundles)?;
        Ok(cache)
    }
}

impl<F: SchemaFetcher> SchemaCache<F> {
    /// Find the schema for `(topic, version)`, fetching from `url` on a miss.
    ///
    /// * hit: returns the cached schema, no I/O
    /// * miss without URL: `Ok(None)`
    /// * miss with URL: fetches, caches under `(topic, version)`, returns it;
    ///   a fetch failure is returned and nothing is cached
    pub async fn resolve(
        &self,
        topic: &str,
        version: &str,
        url: Option<&str>,
    ) -> Result<Option<Arc<Schema>>, FabricError> {
        let key = SchemaKey::new(topic, version);
        if let Some(schema) = self.get(&key) {
            tracing::trace!(%key, "schema cache hit");
            return Ok(Some(schema));
        }
        let Some(url) = url else {
            tracing::debug!(%key, "schema cache miss without schema url");
            return Ok(None);
        };

        let cell = self.in_flight_cell(&key);
        let result = cell
            .get_or_try_init(|| async {
                // Filled by a fetch that finished between our miss and joining.
                if let Some(schema) = self.get(&key) {
                    return Ok(schema);
                }
                tracing::info!(%key, url, "fetching schema");
                let schema = Arc::new(self.fetcher.fetch(url).await?);
                self.put(key.clone(), Arc::clone(&schema));
                Ok::<_, FabricError>(schema)
            })
            .await
            .map(Arc::clone);
        self.release_in_flight(&key, &cell);

        if let Err(e) = &result {
            tracing::warn!(%key, url, error = %e, "schema fetch failed");
        }
        result.map(Some)
    }

    fn in_flight_cell(&self, key: &SchemaKey) -> InFlight {
        Arc::clone(self.lock_in_flight().entry(key.clone()).or_default())
    }

    fn release_in_flight(&self, key: &SchemaKey, cell: &InFlight) {
        let mut table = self.lock_in_flight();
        if table.get(key).is_some_and(|current| Arc::ptr_eq(current, cell)) {
            table.remove(key);
        }
    }
}
