use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::EngineError;
use crate::registry::{Dimension, Rate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// A dimension was dropped in lenient mode
    UnsupportedDimension,
    /// Usage crossed a tier threshold and the tier's rates were used
    PricingTierApplied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    #[serde(rename = "code")]
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    pub message: String,
}

/// One priced dimension of an estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostLine {
    pub dimension: Dimension,
    pub quantity: u64,
    pub rate: Rate,
    /// Rounded to six decimal places, half-even
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateResult {
    pub pricing_version: String,
    pub provider: String,
    pub model: String,
    pub currency: String,
    /// In canonical dimension order
    pub lines: Vec<CostLine>,
    pub total: Decimal,
    pub warnings: Vec<Warning>,
    pub computed_at: DateTime<Utc>,
    pub engine_version: String,
}

impl EstimateResult {
    /// Equal in everything except the computation timestamp
    pub fn same_estimate(&self, other: &Self) -> bool {
        self.pricing_version == other.pricing_version
            && self.provider == other.provider
            && self.model == other.model
            && self.currency == other.currency
            && self.lines == other.lines
            && self.total == other.total
            && self.warnings == other.warnings
            && self.engine_version == other.engine_version
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Success { index: usize, result: EstimateResult },
    Failure { index: usize, error: EngineError },
}

impl BatchOutcome {
    pub fn index(&self) -> usize {
        match self {
            BatchOutcome::Success { index, .. } | BatchOutcome::Failure { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub pricing_version: String,
    /// One per input item, in input order
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
