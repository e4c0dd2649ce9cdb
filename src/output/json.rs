use chrono::SecondsFormat;
use serde_json::{Value, json};

use ratecard::consts::ENGINE_VERSION;
use ratecard::engine::{ModelListing, ProviderSummary};
use ratecard::registry::ModelPricingEntry;
use ratecard::{BatchOutcome, BatchResult, CostLine, EstimateResult};

fn line_json(line: &CostLine) -> Value {
    json!({
        "dimension": line.dimension,
        "quantity": line.quantity,
        "rate": line.rate.value().to_string(),
        "unit": line.rate.unit_key(),
        "cost": line.cost.to_string(),
    })
}

pub(crate) fn estimate_json(result: &EstimateResult) -> Value {
    json!({
        "pricing_version": result.pricing_version,
        "provider": result.provider,
        "model": result.model,
        "breakdown": result.lines.iter().map(line_json).collect::<Vec<_>>(),
        "total": {
            "currency": result.currency,
            "cost": result.total.to_string(),
        },
        "warnings": result.warnings,
        "meta": {
            "computed_at": result.computed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            "engine_version": result.engine_version,
        },
    })
}

/// Results and errors in input order, each tagged with its item index
pub(crate) fn batch_json(batch: &BatchResult) -> Value {
    let mut results = Vec::new();
    let mut errors = Vec::new();
    for outcome in &batch.outcomes {
        match outcome {
            BatchOutcome::Success { index, result } => {
                let mut item = estimate_json(result);
                item["index"] = json!(index);
                results.push(item);
            }
            BatchOutcome::Failure { index, error } => {
                errors.push(json!({ "index": index, "error": error.to_body() }));
            }
        }
    }
    json!({
        "pricing_version": batch.pricing_version,
        "results": results,
        "errors": errors,
    })
}

pub(crate) fn providers_json(pricing_version: &str, providers: &[ProviderSummary]) -> Value {
    json!({
        "pricing_version": pricing_version,
        "providers": providers,
    })
}

pub(crate) fn models_json(pricing_version: &str, listing: &ModelListing) -> Value {
    let models: Vec<Value> = listing
        .models
        .iter()
        .map(|m| {
            let mut item = json!({
                "model": m.model,
                "effective_from": m.effective_from,
                "aliases": m.aliases,
                "capabilities": m.capabilities,
            });
            if !m.metadata.is_empty() {
                item["metadata"] = Value::Object(m.metadata.clone());
            }
            if let Some(card) = &m.ratecard {
                item["billable"] = json!(card.rates);
            }
            item
        })
        .collect();
    json!({
        "pricing_version": pricing_version,
        "provider": listing.provider,
        "models": models,
    })
}

pub(crate) fn model_json(pricing_version: &str, provider: &str, entry: &ModelPricingEntry) -> Value {
    let mut model = json!(entry);
    model["provider"] = json!(provider);
    json!({
        "pricing_version": pricing_version,
        "model": model,
    })
}

pub(crate) fn version_json(pricing_version: &str) -> Value {
    json!({
        "pricing_version": pricing_version,
        "engine_version": ENGINE_VERSION,
    })
}

pub(crate) fn print_json(value: &Value) {
    println!("{value:#}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ratecard::{Dimension, EngineError, Rate, Warning, WarningKind};
    use rust_decimal_macros::dec;

    fn result() -> EstimateResult {
        EstimateResult {
            pricing_version: "2026-02-22".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            currency: "USD".to_string(),
            lines: vec![CostLine {
                dimension: Dimension::OutputTokens,
                quantity: 350,
                rate: Rate::PerMillion(dec!(3.20)),
                cost: dec!(0.001120),
            }],
            total: dec!(0.001120),
            warnings: vec![Warning {
                kind: WarningKind::UnsupportedDimension,
                dimension: Some("reasoning_tokens".to_string()),
                message: "ignored".to_string(),
            }],
            computed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            engine_version: "0.1.0".to_string(),
        }
    }

    #[test]
    fn estimate_json_shape() {
        let json = estimate_json(&result());
        assert_eq!(json["breakdown"][0]["dimension"], "output_tokens");
        assert_eq!(json["breakdown"][0]["rate"], "3.20");
        assert_eq!(json["breakdown"][0]["unit"], "per_1m");
        assert_eq!(json["breakdown"][0]["cost"], "0.001120");
        assert_eq!(json["total"], json!({ "currency": "USD", "cost": "0.001120" }));
        assert_eq!(json["warnings"][0]["code"], "UNSUPPORTED_DIMENSION");
        assert_eq!(json["meta"]["computed_at"], "2026-03-01T12:00:00.000000Z");
    }

    #[test]
    fn batch_json_splits_results_and_errors() {
        let batch = BatchResult {
            pricing_version: "2026-02-22".to_string(),
            outcomes: vec![
                BatchOutcome::Failure {
                    index: 0,
                    error: EngineError::ProviderNotSupported {
                        provider: "mistral".to_string(),
                    },
                },
                BatchOutcome::Success {
                    index: 1,
                    result: result(),
                },
            ],
        };
        let json = batch_json(&batch);
        assert_eq!(json["results"][0]["index"], 1);
        assert_eq!(json["errors"][0]["index"], 0);
        assert_eq!(json["errors"][0]["error"]["code"], "PROVIDER_NOT_SUPPORTED");
    }
}
