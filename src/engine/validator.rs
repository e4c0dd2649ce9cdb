//! Usage validation
//!
//! Two passes. [`check_request`] runs before any registry access and rejects
//! malformed input as `INVALID_REQUEST`. [`validate`] runs against the resolved
//! ratecard and applies the strict/lenient policy to unpriced dimensions.

use std::collections::BTreeMap;

use serde_json::json;

use super::request::{Mode, UsageRequest};
use super::result::{Warning, WarningKind};
use crate::consts::MAX_DIMENSION_QUANTITY;
use crate::error::EngineError;
use crate::registry::{Dimension, Ratecard};

/// Usage keyed by the caller's dimension names, range-checked
pub type Usage = BTreeMap<String, u64>;

/// Priced usage in canonical dimension order, zero quantities removed
pub type BillableUsage = BTreeMap<Dimension, u64>;

pub fn check_request(request: &UsageRequest) -> Result<Usage, EngineError> {
    if request.provider.trim().is_empty() {
        return Err(EngineError::invalid(
            "provider must not be empty",
            json!({ "field": "provider" }),
        ));
    }
    if request.model.trim().is_empty() {
        return Err(EngineError::invalid(
            "model must not be empty",
            json!({ "field": "model" }),
        ));
    }
    if request.usage.is_empty() {
        return Err(EngineError::invalid(
            "usage must contain at least one dimension",
            json!({ "field": "usage" }),
        ));
    }

    let mut usage = Usage::new();
    for (name, &quantity) in &request.usage {
        if name.trim().is_empty() {
            return Err(EngineError::invalid(
                "usage dimension names must not be empty",
                json!({ "field": "usage" }),
            ));
        }
        let in_range = u64::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_DIMENSION_QUANTITY);
        let Some(quantity) = in_range else {
            return Err(EngineError::invalid(
                format!("usage quantity out of range for {name}"),
                json!({
                    "dimension": name,
                    "quantity": quantity,
                    "max": MAX_DIMENSION_QUANTITY,
                }),
            ));
        };
        usage.insert(name.clone(), quantity);
    }
    Ok(usage)
}

/// Split usage into priced dimensions and warnings.
///
/// Zero quantities are always accepted and never billed. In strict mode any
/// nonzero quantity without a rate fails the request, naming every such
/// dimension at once.
pub fn validate(
    ratecard: &Ratecard,
    usage: &Usage,
    mode: Mode,
    provider: &str,
    model: &str,
) -> Result<(BillableUsage, Vec<Warning>), EngineError> {
    let mut billable = BillableUsage::new();
    let mut unsupported = Vec::new();

    for (name, &quantity) in usage {
        if quantity == 0 {
            continue;
        }
        match Dimension::parse(name).filter(|d| ratecard.rate(*d).is_some()) {
            Some(dimension) => {
                billable.insert(dimension, quantity);
            }
            None => unsupported.push(name.clone()),
        }
    }

    if unsupported.is_empty() {
        return Ok((billable, Vec::new()));
    }

    match mode {
        Mode::Strict => Err(EngineError::UnsupportedDimension {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions: unsupported,
        }),
        Mode::Lenient => {
            let warnings = unsupported
                .into_iter()
                .map(|name| Warning {
                    kind: WarningKind::UnsupportedDimension,
                    message: format!(
                        "Ignored unsupported dimension '{name}' for {provider}/{model}"
                    ),
                    dimension: Some(name),
                })
                .collect();
            Ok((billable, warnings))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::Rate;
    use rust_decimal_macros::dec;

    fn ratecard() -> Ratecard {
        Ratecard::new(
            "USD",
            BTreeMap::from([
                (Dimension::InputTokensUncached, Rate::PerMillion(dec!(0.80))),
                (Dimension::OutputTokens, Rate::PerMillion(dec!(3.20))),
            ]),
        )
    }

    fn usage(pairs: &[(&str, u64)]) -> Usage {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn check_request_rejects_empty_usage() {
        let err = check_request(&UsageRequest::new("openai", "gpt-4.1-mini")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn check_request_rejects_negative_and_oversized() {
        let neg = UsageRequest::new("p", "m").with_usage("output_tokens", -1);
        assert_eq!(check_request(&neg).unwrap_err().kind(), ErrorKind::InvalidRequest);

        let max = MAX_DIMENSION_QUANTITY as i64;
        let at_max = UsageRequest::new("p", "m").with_usage("output_tokens", max);
        assert_eq!(check_request(&at_max).unwrap()["output_tokens"], MAX_DIMENSION_QUANTITY);

        let over = UsageRequest::new("p", "m").with_usage("output_tokens", max + 1);
        let err = check_request(&over).unwrap_err();
        assert_eq!(err.details()["dimension"], "output_tokens");
    }

    #[test]
    fn check_request_rejects_blank_names() {
        let blank_provider = UsageRequest::new("  ", "m").with_usage("requests", 1);
        assert!(check_request(&blank_provider).is_err());
        let blank_dim = UsageRequest::new("p", "m").with_usage("", 1);
        assert!(check_request(&blank_dim).is_err());
    }

    #[test]
    fn strict_lists_every_unsupported_dimension() {
        let u = usage(&[
            ("reasoning_tokens", 10),
            ("output_tokens", 5),
            ("audio_input_seconds", 3),
        ]);
        let err = validate(&ratecard(), &u, Mode::Strict, "openai", "gpt-4.1-mini").unwrap_err();
        match err {
            EngineError::UnsupportedDimension { dimensions, .. } => {
                assert_eq!(dimensions, vec!["audio_input_seconds", "reasoning_tokens"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lenient_drops_with_warnings() {
        let u = usage(&[("reasoning_tokens", 10), ("output_tokens", 5)]);
        let (billable, warnings) =
            validate(&ratecard(), &u, Mode::Lenient, "openai", "gpt-4.1-mini").unwrap();
        assert_eq!(billable, BillableUsage::from([(Dimension::OutputTokens, 5)]));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnsupportedDimension);
        assert_eq!(warnings[0].dimension.as_deref(), Some("reasoning_tokens"));
    }

    #[test]
    fn zero_quantities_never_fail_and_never_bill() {
        let u = usage(&[("reasoning_tokens", 0), ("output_tokens", 0), ("made_up", 0)]);
        let (billable, warnings) = validate(&ratecard(), &u, Mode::Strict, "p", "m").unwrap();
        assert!(billable.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_names_count_as_unsupported() {
        let u = usage(&[("gpu_hours", 2)]);
        let err = validate(&ratecard(), &u, Mode::Strict, "p", "m").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDimension);
    }
}
