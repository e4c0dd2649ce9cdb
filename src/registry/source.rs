//! Backing sources for registry data
//!
//! A registry directory looks like:
//!
//! ```text
//! registry_meta.json          pricing_version, currency, schema_version
//! providers/<provider>.json   one canonical provider per document
//! aliases/<provider>.json     model aliases for <provider>, optional
//! aliases/*.json              any alias document may carry provider_aliases
//! ```
//!
//! Documents are assumed schema-valid; parsing still rejects structurally
//! broken input rather than trusting it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::dimension::Dimension;
use super::types::{
    ModelPricingEntry, PricingTier, ProviderBuildError, ProviderEntry, Rate, RateSpec,
    RegistryMeta, TierCondition, TierMetric,
};
use crate::error::RegistryError;

/// Where the registry store reads its snapshot from.
///
/// `meta`, `provider_keys` and `provider_aliases` are read once when the store
/// opens. `load_provider` is called at most once per key.
pub trait ProviderSource: Send + Sync {
    fn meta(&self) -> Result<RegistryMeta, RegistryError>;

    /// Canonical provider keys, discovered without reading provider documents
    fn provider_keys(&self) -> Result<BTreeSet<String>, RegistryError>;

    /// Process-wide provider alias table: alias -> canonical key
    fn provider_aliases(&self) -> Result<BTreeMap<String, String>, RegistryError>;

    fn load_provider(&self, key: &str) -> Result<ProviderEntry, RegistryError>;
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderDocument {
    provider: String,
    #[serde(default)]
    source: Map<String, Value>,
    models: Vec<ModelDocument>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDocument {
    model: String,
    effective_from: NaiveDate,
    billable: BTreeMap<Dimension, RateSpec>,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    pricing_tiers: Vec<TierDocument>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TierDocument {
    condition: ConditionDocument,
    billable: BTreeMap<Dimension, RateSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionDocument {
    dimension: String,
    gt: u64,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AliasDocument {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    provider_aliases: BTreeMap<String, String>,
}

fn convert_rates(
    raw: BTreeMap<Dimension, RateSpec>,
    origin: &str,
) -> Result<BTreeMap<Dimension, Rate>, RegistryError> {
    raw.into_iter()
        .map(|(dimension, spec)| {
            Rate::try_from(spec)
                .map(|rate| (dimension, rate))
                .map_err(|e| RegistryError::invalid(origin, format!("{dimension}: {e}")))
        })
        .collect()
}

impl ModelDocument {
    fn into_entry(self, origin: &str) -> Result<ModelPricingEntry, RegistryError> {
        let origin = format!("{origin}#{}", self.model);
        let tiers = self
            .pricing_tiers
            .into_iter()
            .map(|tier| -> Result<PricingTier, RegistryError> {
                let metric = TierMetric::parse(&tier.condition.dimension).ok_or_else(|| {
                    RegistryError::invalid(
                        &origin,
                        format!("unknown tier dimension '{}'", tier.condition.dimension),
                    )
                })?;
                Ok(PricingTier {
                    condition: TierCondition {
                        dimension: metric,
                        gt: tier.condition.gt,
                    },
                    rates: convert_rates(tier.billable, &origin)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(
            ModelPricingEntry::new(self.model, self.effective_from, convert_rates(self.billable, &origin)?)
                .with_capabilities(self.capabilities)
                .with_tiers(tiers)
                .with_metadata(self.metadata),
        )
    }
}

fn parse_json<T: DeserializeOwned>(origin: &str, text: &str) -> Result<T, RegistryError> {
    serde_json::from_str(text).map_err(|source| RegistryError::Json {
        path: origin.to_string(),
        source,
    })
}

/// Parse one provider document plus its optional model alias document.
///
/// `origin` only labels errors. The document's `provider` field must equal
/// `key`.
pub fn parse_provider_document(
    key: &str,
    origin: &str,
    document: &str,
    aliases: Option<&str>,
) -> Result<ProviderEntry, RegistryError> {
    let doc: ProviderDocument = parse_json(origin, document)?;
    if doc.provider != key {
        return Err(RegistryError::invalid(
            origin,
            format!("declares provider '{}', expected '{key}'", doc.provider),
        ));
    }

    let model_aliases = match aliases {
        Some(text) => {
            let alias_doc: AliasDocument = parse_json(origin, text)?;
            if let Some(ref declared) = alias_doc.provider
                && declared != key
            {
                return Err(RegistryError::invalid(
                    origin,
                    format!("alias document declares provider '{declared}', expected '{key}'"),
                ));
            }
            alias_doc.aliases
        }
        None => BTreeMap::new(),
    };

    let models = doc
        .models
        .into_iter()
        .map(|m| m.into_entry(origin))
        .collect::<Result<Vec<_>, _>>()?;

    ProviderEntry::new(doc.provider, doc.source, models, &model_aliases).map_err(|e| match e {
        ProviderBuildError::Alias(source) => RegistryError::Alias {
            path: origin.to_string(),
            source,
        },
        other => RegistryError::invalid(origin, other.to_string()),
    })
}

/// Registry laid out as a directory of JSON documents
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, path: &Path) -> Result<String, RegistryError> {
        fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn json_files(&self, dir: &str) -> Result<Vec<PathBuf>, RegistryError> {
        let pattern = self.root.join(dir).join("*.json");
        let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        Ok(files)
    }
}

impl ProviderSource for DirectorySource {
    fn meta(&self) -> Result<RegistryMeta, RegistryError> {
        let path = self.root.join("registry_meta.json");
        parse_json(&path.display().to_string(), &self.read(&path)?)
    }

    fn provider_keys(&self) -> Result<BTreeSet<String>, RegistryError> {
        Ok(self
            .json_files("providers")?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect())
    }

    fn provider_aliases(&self) -> Result<BTreeMap<String, String>, RegistryError> {
        let mut merged = BTreeMap::new();
        for path in self.json_files("aliases")? {
            let origin = path.display().to_string();
            let doc: AliasDocument = parse_json(&origin, &self.read(&path)?)?;
            for (alias, target) in doc.provider_aliases {
                if let Some(previous) = merged.insert(alias.clone(), target.clone())
                    && previous != target
                {
                    return Err(RegistryError::Alias {
                        path: origin,
                        source: crate::error::AliasError::Ambiguous {
                            alias,
                            first: previous,
                            second: target,
                        },
                    });
                }
            }
        }
        Ok(merged)
    }

    fn load_provider(&self, key: &str) -> Result<ProviderEntry, RegistryError> {
        let path = self.root.join("providers").join(format!("{key}.json"));
        let document = self.read(&path)?;

        let alias_path = self.root.join("aliases").join(format!("{key}.json"));
        let aliases = if alias_path.is_file() {
            Some(self.read(&alias_path)?)
        } else {
            None
        };

        parse_provider_document(
            key,
            &path.display().to_string(),
            &document,
            aliases.as_deref(),
        )
    }
}
