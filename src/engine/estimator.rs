use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, info, warn};

use super::calculator;
use super::ratecard::RatecardResolver;
use super::request::{Mode, UsageRequest};
use super::result::{BatchOutcome, BatchResult, EstimateResult};
use super::validator;
use crate::consts::{ENGINE_VERSION, MAX_BATCH_SIZE};
use crate::error::EngineError;
use crate::registry::RegistryStore;

/// Stateless estimation over one shared registry snapshot.
///
/// Cheap to share across threads; every call reads only the immutable store.
#[derive(Debug, Clone)]
pub struct Estimator {
    store: Arc<RegistryStore>,
    default_mode: Mode,
}

impl Estimator {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self {
            store,
            default_mode: Mode::default(),
        }
    }

    /// Mode used when a request does not choose one
    pub fn with_default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub(crate) fn resolver(&self) -> RatecardResolver<'_> {
        RatecardResolver::new(&self.store)
    }

    /// Version identifier of the loaded pricing snapshot
    pub fn current_version(&self) -> &str {
        self.store.pricing_version()
    }

    pub fn estimate(&self, request: &UsageRequest) -> Result<EstimateResult, EngineError> {
        let result = self.run(request);
        match &result {
            Ok(r) => debug!(
                provider = %r.provider,
                model = %r.model,
                total = %r.total,
                lines = r.lines.len(),
                warnings = r.warnings.len(),
                "estimate computed"
            ),
            Err(EngineError::Internal { cause }) => warn!(
                provider = %request.provider,
                model = %request.model,
                cause = %cause,
                "estimate failed internally"
            ),
            Err(e) => debug!(
                provider = %request.provider,
                model = %request.model,
                code = e.kind().code(),
                "estimate rejected"
            ),
        }
        result
    }

    fn run(&self, request: &UsageRequest) -> Result<EstimateResult, EngineError> {
        let usage = validator::check_request(request)?;

        let resolver = self.resolver();
        resolver.check_version(request.options.pricing_version.as_deref())?;
        resolver.check_currency(request.options.currency.as_deref())?;
        let resolved = resolver.resolve(
            &request.provider,
            &request.model,
            request.overrides.ratecard.as_ref(),
        )?;

        let (ratecard, tier_warning) = resolved.for_usage(&usage);
        let mode = request.options.mode.unwrap_or(self.default_mode);
        let (billable, unsupported) =
            validator::validate(&ratecard, &usage, mode, &resolved.provider, &resolved.model)?;
        let (lines, total) = calculator::compute(&ratecard, &billable)?;

        let warnings = tier_warning.into_iter().chain(unsupported).collect();

        Ok(EstimateResult {
            pricing_version: self.current_version().to_string(),
            provider: resolved.provider,
            model: resolved.model,
            currency: ratecard.currency,
            lines,
            total,
            warnings,
            computed_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
        })
    }

    /// Estimate 1..=100 independent requests. Items are processed in parallel;
    /// outcomes come back in input order and one failure never affects another.
    pub fn estimate_batch(&self, requests: &[UsageRequest]) -> Result<BatchResult, EngineError> {
        if requests.is_empty() || requests.len() > MAX_BATCH_SIZE {
            return Err(EngineError::invalid(
                format!("batch must contain between 1 and {MAX_BATCH_SIZE} items"),
                json!({ "items": requests.len(), "max": MAX_BATCH_SIZE }),
            ));
        }

        let start = Instant::now();
        let outcomes: Vec<BatchOutcome> = requests
            .par_iter()
            .enumerate()
            .map(|(index, request)| match self.estimate(request) {
                Ok(result) => BatchOutcome::Success { index, result },
                Err(error) => BatchOutcome::Failure { index, error },
            })
            .collect();

        let batch = BatchResult {
            pricing_version: self.current_version().to_string(),
            outcomes,
        };
        info!(
            items = requests.len(),
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "batch estimated"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::store::tests::store_with_documents;

    const OPENAI: &str = r#"{
        "provider": "openai",
        "models": [{
            "model": "gpt-4.1-mini",
            "effective_from": "2025-04-14",
            "billable": {
                "input_tokens_uncached": {"per_1m": "0.80"},
                "input_tokens_cached": {"per_1m": "0.20"},
                "output_tokens": {"per_1m": "3.20"}
            }
        }]
    }"#;

    fn estimator() -> Estimator {
        Estimator::new(Arc::new(store_with_documents(&[("openai", OPENAI)])))
    }

    fn mini() -> UsageRequest {
        UsageRequest::new("openai", "gpt-4.1-mini")
            .with_usage("input_tokens_uncached", 1200)
            .with_usage("input_tokens_cached", 800)
            .with_usage("output_tokens", 350)
    }

    #[test]
    fn estimate_prices_every_line() {
        let result = estimator().estimate(&mini()).unwrap();
        assert_eq!(result.total.to_string(), "0.002240");
        assert_eq!(result.currency, "USD");
        assert_eq!(result.pricing_version, "2026-02-22");
        assert_eq!(result.engine_version, ENGINE_VERSION);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn default_mode_applies_only_when_unset() {
        let lenient = estimator().with_default_mode(Mode::Lenient);
        let req = mini().with_usage("reasoning_tokens", 10);
        let result = lenient.estimate(&req).unwrap();
        assert_eq!(result.warnings.len(), 1);

        let err = lenient.estimate(&req.with_mode(Mode::Strict)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDimension);
    }

    #[test]
    fn malformed_usage_fails_before_provider_lookup() {
        let est = estimator();
        let req = UsageRequest::new("nope", "nope").with_usage("output_tokens", -5);
        assert_eq!(est.estimate(&req).unwrap_err().kind(), ErrorKind::InvalidRequest);
        assert!(!est.store().is_loaded("openai"));
    }

    #[test]
    fn batch_bounds_are_enforced() {
        let est = estimator();
        assert!(est.estimate_batch(&[]).is_err());
        let too_many = vec![mini(); MAX_BATCH_SIZE + 1];
        assert_eq!(
            est.estimate_batch(&too_many).unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(est.estimate_batch(&vec![mini(); MAX_BATCH_SIZE]).unwrap().succeeded(), 100);
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let items = vec![
            mini(),
            UsageRequest::new("openai", "gpt-99").with_usage("output_tokens", 1),
            mini().with_usage("output_tokens", 1_000_000),
        ];
        let batch = estimator().estimate_batch(&items).unwrap();

        assert_eq!(batch.outcomes.len(), 3);
        for (i, outcome) in batch.outcomes.iter().enumerate() {
            assert_eq!(outcome.index(), i);
        }
        match &batch.outcomes[1] {
            BatchOutcome::Failure { error, .. } => {
                assert_eq!(error.kind(), ErrorKind::ModelNotFound)
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(batch.succeeded(), 2);
    }
}
