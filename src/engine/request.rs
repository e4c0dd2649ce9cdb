//! Request types accepted by the estimator
//!
//! These mirror the wire format one-to-one. Unknown fields are rejected at
//! parse time; semantic checks (ranges, dimension names, rate forms) happen
//! in the engine so every caller gets the same error kinds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::EngineError;
use crate::registry::RateSpec;

/// Policy for usage of dimensions the ratecard does not price
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Unpriced dimensions fail the estimate
    #[default]
    Strict,
    /// Unpriced dimensions are dropped with a warning
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimateOptions {
    #[serde(default)]
    pub mode: Option<Mode>,
    /// `None` and `"latest"` both mean the loaded snapshot
    #[serde(default)]
    pub pricing_version: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Caller-supplied ratecard, validated before use
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideRatecard {
    /// Defaults to the snapshot currency
    #[serde(default)]
    pub currency: Option<String>,
    pub billable: BTreeMap<String, RateSpec>,
}

impl OverrideRatecard {
    pub fn with_rate(mut self, dimension: impl Into<String>, rate: RateSpec) -> Self {
        self.billable.insert(dimension.into(), rate);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    #[serde(default)]
    pub ratecard: Option<OverrideRatecard>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsageRequest {
    pub provider: String,
    pub model: String,
    pub usage: BTreeMap<String, i64>,
    #[serde(default)]
    pub options: EstimateOptions,
    #[serde(default)]
    pub overrides: Overrides,
}

impl UsageRequest {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            usage: BTreeMap::new(),
            options: EstimateOptions::default(),
            overrides: Overrides::default(),
        }
    }

    pub fn with_usage(mut self, dimension: impl Into<String>, quantity: i64) -> Self {
        self.usage.insert(dimension.into(), quantity);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.options.mode = Some(mode);
        self
    }

    pub fn with_pricing_version(mut self, version: impl Into<String>) -> Self {
        self.options.pricing_version = Some(version.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.options.currency = Some(currency.into());
        self
    }

    pub fn with_override(mut self, ratecard: OverrideRatecard) -> Self {
        self.overrides.ratecard = Some(ratecard);
        self
    }

    /// Parse a single request document
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(malformed)
    }
}

fn malformed(e: serde_json::Error) -> EngineError {
    EngineError::invalid(
        "Request validation failed",
        json!({ "reason": e.to_string() }),
    )
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchDocument {
    items: Vec<UsageRequest>,
}

/// Parse a batch document: either `{"items": [...]}` or a bare array.
///
/// A malformed item rejects the whole document; batch size is checked by the
/// estimator.
pub fn parse_batch(text: &str) -> Result<Vec<UsageRequest>, EngineError> {
    let value: Value = serde_json::from_str(text).map_err(malformed)?;
    if value.is_array() {
        serde_json::from_value(value).map_err(malformed)
    } else {
        serde_json::from_value::<BatchDocument>(value)
            .map(|doc| doc.items)
            .map_err(malformed)
    }
}
