//! Read-only registry queries
//!
//! Provider and model listings share the estimator's resolution rules, so a
//! name that estimates also lists, and vice versa.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::estimator::Estimator;
use crate::error::EngineError;
use crate::registry::{ModelPricingEntry, Ratecard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub aliases: Vec<String>,
    pub model_count: usize,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub effective_from: NaiveDate,
    pub aliases: Vec<String>,
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Only present when rates were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratecard: Option<Ratecard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelListing {
    /// Canonical provider key
    pub provider: String,
    pub models: Vec<ModelSummary>,
}

impl Estimator {
    /// Every provider in the snapshot, sorted by key.
    ///
    /// Loads each provider to count its models. A provider whose document
    /// fails to load is logged and left out.
    pub fn list_providers(&self) -> Vec<ProviderSummary> {
        let store = self.store();
        store
            .provider_keys()
            .filter_map(|key| match store.get_provider(key) {
                Ok(entry) => Some(ProviderSummary {
                    provider: entry.key.clone(),
                    aliases: store.provider_aliases(key).to_vec(),
                    model_count: entry.model_count(),
                    capabilities: entry.capabilities().into_iter().collect(),
                }),
                Err(e) => {
                    warn!(provider = key, error = %e, "skipping provider in listing");
                    None
                }
            })
            .collect()
    }

    pub fn list_models(
        &self,
        provider: &str,
        include_rates: bool,
    ) -> Result<ModelListing, EngineError> {
        let entry = self.resolver().provider(provider)?;
        let currency = self.store().currency();
        let models = entry
            .models()
            .map(|m| ModelSummary {
                model: m.model.clone(),
                effective_from: m.effective_from,
                aliases: m.aliases.clone(),
                capabilities: m.capabilities.iter().cloned().collect(),
                metadata: m.metadata.clone(),
                ratecard: include_rates.then(|| m.ratecard(currency)),
            })
            .collect();
        Ok(ModelListing {
            provider: entry.key.clone(),
            models,
        })
    }

    /// Full pricing entry for one model, tiers included
    pub fn model_details(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<(String, Arc<ModelPricingEntry>), EngineError> {
        let (entry, pricing) = self.resolver().model(provider, model)?;
        Ok((entry.key.clone(), pricing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::store::tests::{static_store, store_with_documents};

    #[test]
    fn providers_are_listed_sorted_with_counts() {
        let est = Estimator::new(Arc::new(static_store(&["xai", "openai"])));
        let listed = est.list_providers();
        let keys: Vec<_> = listed.iter().map(|p| p.provider.as_str()).collect();
        assert_eq!(keys, vec!["openai", "xai"]);
        assert!(listed.iter().all(|p| p.model_count == 1));
    }

    #[test]
    fn broken_provider_is_left_out_of_listing() {
        let est = Estimator::new(Arc::new(store_with_documents(&[
            ("broken", "{"),
            (
                "xai",
                r#"{"provider": "xai", "models": [{"model": "grok-4",
                    "effective_from": "2025-07-09",
                    "capabilities": ["chat"],
                    "billable": {"output_tokens": {"per_1m": "15"}}}]}"#,
            ),
        ])));
        let listed = est.list_providers();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].capabilities, vec!["chat".to_string()]);
    }

    #[test]
    fn list_models_includes_rates_on_request() {
        let est = Estimator::new(Arc::new(static_store(&["openai"])));
        let bare = est.list_models("OpenAI", false).unwrap();
        assert_eq!(bare.provider, "openai");
        assert!(bare.models[0].ratecard.is_none());

        let priced = est.list_models("openai", true).unwrap();
        assert_eq!(priced.models[0].ratecard.as_ref().unwrap().currency, "USD");
    }

    #[test]
    fn unknown_provider_and_model_map_to_error_kinds() {
        let est = Estimator::new(Arc::new(static_store(&["openai"])));
        assert_eq!(
            est.list_models("mistral", false).unwrap_err().kind(),
            ErrorKind::ProviderNotSupported
        );
        assert_eq!(
            est.model_details("openai", "gpt-99").unwrap_err().kind(),
            ErrorKind::ModelNotFound
        );
        let (provider, model) = est.model_details("openai", "openai-base").unwrap();
        assert_eq!((provider.as_str(), model.model.as_str()), ("openai", "openai-base"));
    }
}
