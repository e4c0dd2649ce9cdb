//! Write-once, read-many cache of provider pricing
//!
//! Every provider key known at open time gets its own `OnceLock` slot. The
//! first reference to a key runs the backing load inside that slot; concurrent
//! callers for the same key wait on it and see the same outcome, while other
//! keys never touch it. Once filled, a slot is read without locking.
//!
//! A failed load stays failed until the process restarts.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use super::alias::AliasIndex;
use super::source::{DirectorySource, ProviderSource};
use super::types::{ProviderEntry, RegistryMeta};
use crate::consts::SUPPORTED_SCHEMA_VERSION;
use crate::error::RegistryError;

type Slot = OnceLock<Result<Arc<ProviderEntry>, Arc<RegistryError>>>;

#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("provider '{0}' is not in the registry")]
    NotFound(String),

    #[error("provider '{provider}' failed to load: {source}")]
    Unavailable {
        provider: String,
        source: Arc<RegistryError>,
    },
}

pub struct RegistryStore {
    source: Box<dyn ProviderSource>,
    meta: RegistryMeta,
    provider_aliases: AliasIndex,
    slots: HashMap<String, Slot>,
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore")
            .field("meta", &self.meta)
            .field("providers", &self.provider_keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RegistryStore {
    /// Read metadata, provider keys and provider aliases from `source`.
    /// Provider documents themselves are loaded on first reference.
    pub fn open(source: impl ProviderSource + 'static) -> Result<Self, RegistryError> {
        let meta = source.meta()?;
        if meta.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(RegistryError::invalid(
                "registry_meta",
                format!(
                    "unsupported schema_version {} (expected {SUPPORTED_SCHEMA_VERSION})",
                    meta.schema_version
                ),
            ));
        }

        let keys: BTreeSet<String> = source.provider_keys()?;
        let aliases = source.provider_aliases()?;
        let provider_aliases = AliasIndex::build(
            keys.iter().map(String::as_str),
            aliases.iter().map(|(a, t)| (a.as_str(), t.as_str())),
        )
        .map_err(|source| RegistryError::Alias {
            path: "provider_aliases".to_string(),
            source,
        })?;

        debug!(
            pricing_version = %meta.pricing_version,
            providers = keys.len(),
            "registry opened"
        );

        Ok(Self {
            source: Box::new(source),
            meta,
            provider_aliases,
            slots: keys.into_iter().map(|k| (k, Slot::new())).collect(),
        })
    }

    pub fn open_dir(root: impl AsRef<Path>) -> Result<Self, RegistryError> {
        Self::open(DirectorySource::new(root.as_ref()))
    }

    pub fn meta(&self) -> &RegistryMeta {
        &self.meta
    }

    pub fn pricing_version(&self) -> &str {
        &self.meta.pricing_version
    }

    pub fn currency(&self) -> &str {
        &self.meta.currency
    }

    /// Canonical provider keys, sorted
    pub fn provider_keys(&self) -> impl Iterator<Item = &str> {
        let mut keys: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys.into_iter()
    }

    pub fn provider_aliases(&self, canonical: &str) -> &[String] {
        self.provider_aliases.aliases_of(canonical)
    }

    /// Resolve a provider name or alias to its canonical key
    pub fn resolve_provider(&self, input: &str) -> Option<&str> {
        self.provider_aliases.resolve(input)
    }

    /// Whether `key` has been loaded (successfully or not)
    pub fn is_loaded(&self, key: &str) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.get().is_some())
    }

    /// Fetch a provider by canonical key, loading it on first reference
    pub fn get_provider(&self, key: &str) -> Result<Arc<ProviderEntry>, LookupError> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| LookupError::NotFound(key.to_string()))?;

        match slot.get_or_init(|| self.load(key)) {
            Ok(entry) => Ok(Arc::clone(entry)),
            Err(source) => Err(LookupError::Unavailable {
                provider: key.to_string(),
                source: Arc::clone(source),
            }),
        }
    }

    fn load(&self, key: &str) -> Result<Arc<ProviderEntry>, Arc<RegistryError>> {
        let start = Instant::now();
        let loaded = self.source.load_provider(key).and_then(|entry| {
            if entry.key == key {
                Ok(entry)
            } else {
                Err(RegistryError::invalid(
                    key,
                    format!("source returned provider '{}'", entry.key),
                ))
            }
        });
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match loaded {
            Ok(entry) => {
                debug!(
                    provider = key,
                    models = entry.model_count(),
                    elapsed_ms,
                    "provider pricing loaded"
                );
                Ok(Arc::new(entry))
            }
            Err(e) => {
                warn!(provider = key, error = %e, elapsed_ms, "provider pricing failed to load");
                Err(Arc::new(e))
            }
        }
    }
}
