//! Ratecard resolution
//!
//! Produces the ratecard an estimate is priced with: either a validated
//! caller override (the registry is never consulted) or the registry entry for
//! the resolved provider and model, with any pricing tier applied.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error};

use super::request::OverrideRatecard;
use super::result::{Warning, WarningKind};
use super::validator::Usage;
use crate::consts::LATEST_VERSION;
use crate::error::EngineError;
use crate::registry::{
    Dimension, LookupError, ModelPricingEntry, ProviderEntry, Rate, Ratecard, RegistryStore,
};

/// Ratecard chosen for one request
#[derive(Debug, Clone)]
pub struct ResolvedRatecard {
    /// Canonical provider key, or the caller's name under an override
    pub provider: String,
    /// Canonical model key, or the caller's name under an override
    pub model: String,
    pub ratecard: Ratecard,
    entry: Option<Arc<ModelPricingEntry>>,
}

impl ResolvedRatecard {
    pub fn is_override(&self) -> bool {
        self.entry.is_none()
    }

    /// Ratecard to price `usage` with. A tier whose threshold the usage
    /// exceeds replaces the base rates and yields a warning.
    pub fn for_usage(&self, usage: &Usage) -> (Ratecard, Option<Warning>) {
        let Some(tier) = self.entry.as_ref().and_then(|e| e.tier_for(usage)) else {
            return (self.ratecard.clone(), None);
        };
        let metric = tier.condition.dimension;
        let warning = Warning {
            kind: WarningKind::PricingTierApplied,
            dimension: Some(metric.as_str().to_string()),
            message: format!(
                "Pricing tier applied: {} {} > {}",
                metric.as_str(),
                metric.measure(usage),
                tier.condition.gt
            ),
        };
        (
            Ratecard::new(self.ratecard.currency.clone(), tier.rates.clone()),
            Some(warning),
        )
    }
}

/// Resolves provider/model names and ratecards against one store
pub struct RatecardResolver<'a> {
    store: &'a RegistryStore,
}

impl<'a> RatecardResolver<'a> {
    pub fn new(store: &'a RegistryStore) -> Self {
        Self { store }
    }

    /// `None`, `"latest"` and the snapshot's own version are accepted.
    pub fn check_version(&self, requested: Option<&str>) -> Result<(), EngineError> {
        match requested.map(str::trim) {
            None | Some(LATEST_VERSION) => Ok(()),
            Some(v) if v == self.store.pricing_version() => Ok(()),
            Some(v) => Err(EngineError::PricingVersionNotFound {
                requested: v.to_string(),
                available: self.store.pricing_version().to_string(),
            }),
        }
    }

    /// Requested currency must be the snapshot currency; there is no conversion.
    pub fn check_currency(&self, requested: Option<&str>) -> Result<(), EngineError> {
        match requested.map(str::trim) {
            None => Ok(()),
            Some(c) if c.eq_ignore_ascii_case(self.store.currency()) => Ok(()),
            Some(c) => Err(EngineError::invalid(
                format!("Currency not supported: {c}"),
                json!({ "currency": c, "supported": [self.store.currency()] }),
            )),
        }
    }

    pub fn provider(&self, input: &str) -> Result<Arc<ProviderEntry>, EngineError> {
        let not_supported = || EngineError::ProviderNotSupported {
            provider: input.to_string(),
        };
        let key = self.store.resolve_provider(input).ok_or_else(not_supported)?;
        match self.store.get_provider(key) {
            Ok(entry) => Ok(entry),
            Err(LookupError::NotFound(_)) => Err(not_supported()),
            Err(LookupError::Unavailable { provider, source }) => {
                error!(provider = %provider, error = %source, "provider pricing unavailable");
                Err(EngineError::internal(source))
            }
        }
    }

    pub fn model(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<(Arc<ProviderEntry>, Arc<ModelPricingEntry>), EngineError> {
        let entry = self.provider(provider)?;
        let found = entry
            .resolve_model(model)
            .and_then(|key| entry.model(key))
            .cloned();
        match found {
            Some(m) => Ok((entry, m)),
            None => Err(EngineError::ModelNotFound {
                provider: entry.key.clone(),
                model: model.to_string(),
            }),
        }
    }

    pub fn resolve(
        &self,
        provider: &str,
        model: &str,
        override_card: Option<&OverrideRatecard>,
    ) -> Result<ResolvedRatecard, EngineError> {
        if let Some(card) = override_card {
            let ratecard = self.from_override(card)?;
            debug!(provider, model, "using caller-supplied ratecard");
            return Ok(ResolvedRatecard {
                provider: provider.trim().to_string(),
                model: model.trim().to_string(),
                ratecard,
                entry: None,
            });
        }

        let (entry, pricing) = self.model(provider, model)?;
        Ok(ResolvedRatecard {
            provider: entry.key.clone(),
            model: pricing.model.clone(),
            ratecard: pricing.ratecard(self.store.currency()),
            entry: Some(pricing),
        })
    }

    fn from_override(&self, card: &OverrideRatecard) -> Result<Ratecard, EngineError> {
        let currency = self.store.currency();
        if let Some(c) = card.currency.as_deref()
            && !c.trim().eq_ignore_ascii_case(currency)
        {
            return Err(EngineError::invalid(
                format!("Override currency must be {currency}"),
                json!({ "currency": c, "supported": [currency] }),
            ));
        }
        if card.billable.is_empty() {
            return Err(EngineError::invalid(
                "Override ratecard must price at least one dimension",
                json!({ "field": "overrides.ratecard.billable" }),
            ));
        }

        let mut rates = BTreeMap::new();
        for (name, spec) in &card.billable {
            let Some(dimension) = Dimension::parse(name) else {
                return Err(EngineError::invalid(
                    format!("Unknown dimension in override ratecard: {name}"),
                    json!({ "dimension": name }),
                ));
            };
            let rate = Rate::try_from(spec.clone()).map_err(|e| {
                EngineError::invalid(
                    format!("Invalid override rate for {name}: {e}"),
                    json!({ "dimension": name }),
                )
            })?;
            rates.insert(dimension, rate);
        }
        Ok(Ratecard::new(currency, rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::{PricingTier, RateSpec, TierCondition, TierMetric};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn entry_with_tier() -> ResolvedRatecard {
        let base = BTreeMap::from([(Dimension::InputTokensUncached, Rate::PerMillion(dec!(3)))]);
        let tier = PricingTier {
            condition: TierCondition {
                dimension: TierMetric::ContextTokens,
                gt: 200_000,
            },
            rates: BTreeMap::from([(Dimension::InputTokensUncached, Rate::PerMillion(dec!(6)))]),
        };
        let date = NaiveDate::from_ymd_opt(2025, 5, 22).unwrap();
        let model = ModelPricingEntry::new("claude-sonnet-4", date, base).with_tiers(vec![tier]);
        ResolvedRatecard {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4".to_string(),
            ratecard: model.ratecard("USD"),
            entry: Some(Arc::new(model)),
        }
    }

    #[test]
    fn for_usage_keeps_base_rates_under_threshold() {
        let resolved = entry_with_tier();
        let usage = Usage::from([("input_tokens_uncached".to_string(), 200_000)]);
        let (card, warning) = resolved.for_usage(&usage);
        assert_eq!(card.rate(Dimension::InputTokensUncached), Some(&Rate::PerMillion(dec!(3))));
        assert!(warning.is_none());
    }

    #[test]
    fn for_usage_switches_to_tier_above_threshold() {
        let resolved = entry_with_tier();
        let usage = Usage::from([
            ("input_tokens_uncached".to_string(), 150_000),
            ("input_tokens_cached".to_string(), 60_000),
        ]);
        let (card, warning) = resolved.for_usage(&usage);
        assert_eq!(card.rate(Dimension::InputTokensUncached), Some(&Rate::PerMillion(dec!(6))));
        let warning = warning.unwrap();
        assert_eq!(warning.kind, WarningKind::PricingTierApplied);
        assert_eq!(warning.message, "Pricing tier applied: context_tokens 210000 > 200000");
    }

    #[test]
    fn override_rejects_bad_dimension_and_rate() {
        let store = crate::registry::store::tests::static_store(&["openai"]);
        let resolver = RatecardResolver::new(&store);

        let bad_dim = OverrideRatecard::default().with_rate("gpu_hours", RateSpec::per_unit(dec!(1)));
        let err = resolver.resolve("p", "m", Some(&bad_dim)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let bad_rate = OverrideRatecard::default().with_rate("requests", RateSpec::default());
        assert!(resolver.resolve("p", "m", Some(&bad_rate)).is_err());

        let empty = OverrideRatecard::default();
        assert!(resolver.resolve("p", "m", Some(&empty)).is_err());

        let eur = OverrideRatecard {
            currency: Some("EUR".to_string()),
            ..OverrideRatecard::default()
        }
        .with_rate("requests", RateSpec::per_unit(dec!(1)));
        assert!(resolver.resolve("p", "m", Some(&eur)).is_err());
    }

    #[test]
    fn override_keeps_caller_names() {
        let store = crate::registry::store::tests::static_store(&["openai"]);
        let resolver = RatecardResolver::new(&store);
        let card = OverrideRatecard::default().with_rate("requests", RateSpec::per_unit(dec!(0.01)));
        let resolved = resolver.resolve(" my-proxy ", "internal-v2", Some(&card)).unwrap();
        assert!(resolved.is_override());
        assert_eq!(resolved.provider, "my-proxy");
        assert_eq!(resolved.ratecard.currency, "USD");
    }

    #[test]
    fn version_and_currency_checks() {
        let store = crate::registry::store::tests::static_store(&["openai"]);
        let resolver = RatecardResolver::new(&store);
        assert!(resolver.check_version(None).is_ok());
        assert!(resolver.check_version(Some("latest")).is_ok());
        assert!(resolver.check_version(Some(store.pricing_version())).is_ok());
        assert_eq!(
            resolver.check_version(Some("1999-01-01")).unwrap_err().kind(),
            ErrorKind::PricingVersionNotFound
        );
        assert!(resolver.check_currency(Some("usd")).is_ok());
        assert!(resolver.check_currency(Some("EUR")).is_err());
    }
}
