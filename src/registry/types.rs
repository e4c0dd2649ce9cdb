//! Pricing registry value types
//!
//! Rates are exact decimals end to end. Wire values may be JSON strings or
//! numbers; numbers are read from their literal text, never through `f64`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::alias::AliasIndex;
use super::dimension::Dimension;
use crate::consts::MAX_RATE_SCALE;
use crate::error::AliasError;

/// Price of one dimension: exactly one unit form by construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rate {
    /// Price per 1,000,000 units
    PerMillion(Decimal),
    /// Price per single unit
    PerUnit(Decimal),
}

impl Rate {
    pub fn value(&self) -> Decimal {
        match self {
            Rate::PerMillion(v) | Rate::PerUnit(v) => *v,
        }
    }

    /// Wire key for the unit form
    pub fn unit_key(&self) -> &'static str {
        match self {
            Rate::PerMillion(_) => "per_1m",
            Rate::PerUnit(_) => "per_unit",
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::PerMillion(v) => write!(f, "{v}/1M"),
            Rate::PerUnit(v) => write!(f, "{v}/unit"),
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.unit_key(), &self.value().to_string())?;
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateSpecError {
    #[error("exactly one of per_1m or per_unit must be provided")]
    Ambiguous,
    #[error("rate values must be >= 0")]
    Negative,
    #[error("rate values may have at most {MAX_RATE_SCALE} decimal places")]
    TooPrecise,
}

/// Unvalidated wire form of a rate, as found in documents and overrides
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateSpec {
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub per_1m: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub per_unit: Option<Decimal>,
}

impl RateSpec {
    pub fn per_1m(value: Decimal) -> Self {
        Self {
            per_1m: Some(value),
            per_unit: None,
        }
    }

    pub fn per_unit(value: Decimal) -> Self {
        Self {
            per_1m: None,
            per_unit: Some(value),
        }
    }
}

impl TryFrom<RateSpec> for Rate {
    type Error = RateSpecError;

    fn try_from(spec: RateSpec) -> Result<Self, Self::Error> {
        let rate = match (spec.per_1m, spec.per_unit) {
            (Some(v), None) => Rate::PerMillion(v),
            (None, Some(v)) => Rate::PerUnit(v),
            _ => return Err(RateSpecError::Ambiguous),
        };
        if rate.value().is_sign_negative() && !rate.value().is_zero() {
            return Err(RateSpecError::Negative);
        }
        if rate.value().normalize().scale() > MAX_RATE_SCALE {
            return Err(RateSpecError::TooPrecise);
        }
        Ok(rate)
    }
}

/// Parse decimal text, accepting plain and scientific notation.
///
/// Text that a `Decimal` cannot hold without rounding is rejected.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return Decimal::from_str_exact(text).ok();
    };
    let mantissa = Decimal::from_str_exact(mantissa).ok()?;
    let exponent: i64 = exponent.parse().ok()?;
    let scale = i64::from(mantissa.scale()) - exponent;
    if scale >= 0 {
        Decimal::try_from_i128_with_scale(mantissa.mantissa(), u32::try_from(scale).ok()?).ok()
    } else {
        let factor = 10_i128.checked_pow(u32::try_from(-scale).ok()?)?;
        Decimal::try_from_i128_with_scale(mantissa.mantissa().checked_mul(factor)?, 0).ok()
    }
}

fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(de::Error::custom(format!(
                "expected a decimal string or number, got {other}"
            )));
        }
    };
    parse_decimal(&text)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid decimal value {text:?}")))
}

/// A currency plus the rates it prices. Compared by content only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ratecard {
    pub currency: String,
    #[serde(rename = "billable")]
    pub rates: BTreeMap<Dimension, Rate>,
}

impl Ratecard {
    pub fn new(currency: impl Into<String>, rates: BTreeMap<Dimension, Rate>) -> Self {
        Self {
            currency: currency.into(),
            rates,
        }
    }

    pub fn rate(&self, dimension: Dimension) -> Option<&Rate> {
        self.rates.get(&dimension)
    }
}

/// Quantity a pricing tier threshold is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMetric {
    /// `input_tokens_uncached + input_tokens_cached`
    ContextTokens,
    Dimension(Dimension),
}

impl TierMetric {
    pub fn parse(name: &str) -> Option<Self> {
        if name == "context_tokens" {
            return Some(TierMetric::ContextTokens);
        }
        Dimension::parse(name).map(TierMetric::Dimension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TierMetric::ContextTokens => "context_tokens",
            TierMetric::Dimension(d) => d.as_str(),
        }
    }

    pub fn measure(&self, usage: &BTreeMap<String, u64>) -> u64 {
        let get = |d: Dimension| usage.get(d.as_str()).copied().unwrap_or(0);
        match self {
            TierMetric::ContextTokens => get(Dimension::InputTokensUncached)
                .saturating_add(get(Dimension::InputTokensCached)),
            TierMetric::Dimension(d) => get(*d),
        }
    }
}

impl Serialize for TierMetric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierCondition {
    pub dimension: TierMetric,
    pub gt: u64,
}

/// Replacement rate map applied when usage exceeds a threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingTier {
    pub condition: TierCondition,
    #[serde(rename = "billable")]
    pub rates: BTreeMap<Dimension, Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPricingEntry {
    pub model: String,
    pub effective_from: NaiveDate,
    #[serde(rename = "billable")]
    pub rates: BTreeMap<Dimension, Rate>,
    pub capabilities: BTreeSet<String>,
    /// Sorted by threshold, highest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pricing_tiers: Vec<PricingTier>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub aliases: Vec<String>,
}

impl ModelPricingEntry {
    pub fn new(
        model: impl Into<String>,
        effective_from: NaiveDate,
        rates: BTreeMap<Dimension, Rate>,
    ) -> Self {
        Self {
            model: model.into(),
            effective_from,
            rates,
            capabilities: BTreeSet::new(),
            pricing_tiers: Vec::new(),
            metadata: Map::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tiers(mut self, mut tiers: Vec<PricingTier>) -> Self {
        tiers.sort_by(|a, b| b.condition.gt.cmp(&a.condition.gt));
        self.pricing_tiers = tiers;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn tiers(&self) -> &[PricingTier] {
        &self.pricing_tiers
    }

    /// Base ratecard, ignoring tiers
    pub fn ratecard(&self, currency: &str) -> Ratecard {
        Ratecard::new(currency, self.rates.clone())
    }

    /// Highest-threshold tier the usage exceeds, if any
    pub fn tier_for(&self, usage: &BTreeMap<String, u64>) -> Option<&PricingTier> {
        self.pricing_tiers
            .iter()
            .find(|tier| tier.condition.dimension.measure(usage) > tier.condition.gt)
    }
}

/// One provider's models and model aliases. Immutable once built.
#[derive(Debug)]
pub struct ProviderEntry {
    pub key: String,
    pub source: Map<String, Value>,
    models: BTreeMap<String, Arc<ModelPricingEntry>>,
    model_aliases: AliasIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderBuildError {
    #[error("duplicate model '{0}'")]
    DuplicateModel(String),
    #[error(transparent)]
    Alias(#[from] AliasError),
}

impl ProviderEntry {
    /// Build an entry, validating model keys and the model alias table.
    pub fn new(
        key: impl Into<String>,
        source: Map<String, Value>,
        models: Vec<ModelPricingEntry>,
        aliases: &BTreeMap<String, String>,
    ) -> Result<Self, ProviderBuildError> {
        let mut by_key = BTreeMap::new();
        for model in models {
            if by_key.contains_key(&model.model) {
                return Err(ProviderBuildError::DuplicateModel(model.model));
            }
            by_key.insert(model.model.clone(), model);
        }

        let model_aliases = AliasIndex::build(
            by_key.keys().map(String::as_str),
            aliases.iter().map(|(a, t)| (a.as_str(), t.as_str())),
        )?;

        let models = by_key
            .into_iter()
            .map(|(key, mut model)| {
                model.aliases = model_aliases.aliases_of(&key).to_vec();
                (key, Arc::new(model))
            })
            .collect();

        Ok(Self {
            key: key.into(),
            source,
            models,
            model_aliases,
        })
    }

    /// Resolve a caller-supplied model name to its canonical key
    pub fn resolve_model(&self, input: &str) -> Option<&str> {
        self.model_aliases.resolve(input)
    }

    pub fn model(&self, canonical: &str) -> Option<&Arc<ModelPricingEntry>> {
        self.models.get(canonical)
    }

    /// Models in canonical key order
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelPricingEntry>> {
        self.models.values()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Union of all model capabilities, sorted
    pub fn capabilities(&self) -> BTreeSet<String> {
        self.models
            .values()
            .flat_map(|m| m.capabilities.iter().cloned())
            .collect()
    }
}

/// Snapshot-wide metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMeta {
    pub pricing_version: String,
    #[serde(default)]
    pub published_at: Option<String>,
    pub currency: String,
    pub schema_version: u32,
}
