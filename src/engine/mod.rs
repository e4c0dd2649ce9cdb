//! Cost estimation over a registry snapshot
//!
//! Per request: validate usage shape, resolve the ratecard (override or
//! registry, then tiers), apply the strict/lenient dimension policy and
//! compute exact line costs.

pub mod calculator;
pub mod catalog;
pub mod estimator;
pub mod ratecard;
pub mod request;
pub mod result;
pub mod validator;

pub use catalog::{ModelListing, ModelSummary, ProviderSummary};
pub use estimator::Estimator;
pub use ratecard::{RatecardResolver, ResolvedRatecard};
pub use request::{EstimateOptions, Mode, OverrideRatecard, Overrides, UsageRequest, parse_batch};
pub use result::{BatchOutcome, BatchResult, CostLine, EstimateResult, Warning, WarningKind};

pub use crate::registry::RateSpec;
