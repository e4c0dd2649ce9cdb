//! Pricing registry: one immutable snapshot of provider rates
//!
//! The store reads snapshot metadata and alias tables up front and loads each
//! provider document on first reference. Everything it hands out is immutable.

pub mod alias;
pub mod dimension;
pub mod source;
pub mod store;
pub mod types;

pub use alias::{AliasIndex, normalize_key};
pub use dimension::Dimension;
pub use source::{DirectorySource, ProviderSource, parse_provider_document};
pub use store::{LookupError, RegistryStore};
pub use types::{
    ModelPricingEntry, PricingTier, ProviderEntry, Rate, RateSpec, RateSpecError, Ratecard,
    RegistryMeta, TierCondition, TierMetric,
};
