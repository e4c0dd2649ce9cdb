//! Decimal-exact cost estimation for LLM API usage.
//!
//! A [`registry::RegistryStore`] holds one pricing snapshot and loads provider
//! documents lazily. An [`engine::Estimator`] resolves aliases and ratecards,
//! validates usage dimensions and computes cost breakdowns on top of it.

pub mod consts;
pub mod engine;
pub mod error;
pub mod registry;

pub use engine::{
    BatchOutcome, BatchResult, CostLine, EstimateOptions, EstimateResult, Estimator, Mode,
    OverrideRatecard, Overrides, RateSpec, UsageRequest, Warning, WarningKind,
};
pub use error::{EngineError, ErrorKind, RegistryError};
pub use registry::{Dimension, DirectorySource, ProviderSource, Rate, Ratecard, RegistryStore};
