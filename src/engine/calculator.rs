//! Exact cost arithmetic
//!
//! Line costs are computed exactly, then rounded half-even to [`COST_SCALE`]
//! places for display. The total is the exact sum of unrounded line costs,
//! rounded once, so it can differ from the sum of displayed line costs by at
//! most one unit in the last place per line.
//!
//! Products and sums are formed on the raw mantissa in `i128`. A result that
//! does not fit a `Decimal` (96-bit mantissa, scale 28) is reported as an
//! error instead of being rounded to fit.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;

use super::result::CostLine;
use super::validator::BillableUsage;
use crate::consts::COST_SCALE;
use crate::error::EngineError;
use crate::registry::{Dimension, Rate, Ratecard};

/// Dividing by 1,000,000 is a shift of six decimal places
const PER_MILLION_SHIFT: u32 = 6;

/// Unrounded cost of `quantity` units at `rate`; `None` if it is not exactly representable
pub fn line_cost(quantity: u64, rate: &Rate) -> Option<Decimal> {
    let value = rate.value().normalize();
    let mantissa = value.mantissa().checked_mul(i128::from(quantity))?;
    let scale = match rate {
        Rate::PerMillion(_) => value.scale() + PER_MILLION_SHIFT,
        Rate::PerUnit(_) => value.scale(),
    };
    Decimal::try_from_i128_with_scale(mantissa, scale).ok()
}

fn exact_add(a: Decimal, b: Decimal) -> Option<Decimal> {
    let scale = a.scale().max(b.scale());
    let widen = |d: Decimal| {
        d.mantissa()
            .checked_mul(10_i128.checked_pow(scale - d.scale())?)
    };
    let sum = widen(a)?.checked_add(widen(b)?)?;
    Decimal::try_from_i128_with_scale(sum, scale).ok()
}

/// Round half-even and pad to exactly [`COST_SCALE`] fractional digits
pub fn finalize(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(COST_SCALE);
    rounded
}

fn overflow(dimension: Dimension) -> EngineError {
    EngineError::invalid(
        format!("cost for {dimension} exceeds the representable range"),
        json!({ "dimension": dimension.as_str() }),
    )
}

/// Price every billable dimension; returns lines in canonical order and the total.
pub fn compute(
    ratecard: &Ratecard,
    billable: &BillableUsage,
) -> Result<(Vec<CostLine>, Decimal), EngineError> {
    let mut lines = Vec::with_capacity(billable.len());
    let mut exact_total = Decimal::ZERO;

    for (&dimension, &quantity) in billable {
        let Some(rate) = ratecard.rate(dimension).copied() else {
            return Err(EngineError::internal(format!(
                "billable dimension {dimension} has no rate"
            )));
        };
        let exact = line_cost(quantity, &rate).ok_or_else(|| overflow(dimension))?;
        exact_total = exact_add(exact_total, exact).ok_or_else(|| overflow(dimension))?;
        lines.push(CostLine {
            dimension,
            quantity,
            rate,
            cost: finalize(exact),
        });
    }

    Ok((lines, finalize(exact_total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn card(rates: &[(Dimension, Rate)]) -> Ratecard {
        Ratecard::new("USD", rates.iter().copied().collect::<BTreeMap<_, _>>())
    }

    #[test]
    fn per_million_is_exact() {
        assert_eq!(
            line_cost(1200, &Rate::PerMillion(dec!(0.80))),
            Some(dec!(0.00096))
        );
        assert_eq!(line_cost(3, &Rate::PerUnit(dec!(0.04))), Some(dec!(0.12)));
    }

    #[test]
    fn finalize_rounds_half_even_with_fixed_scale() {
        assert_eq!(finalize(dec!(0.0000005)).to_string(), "0.000000");
        assert_eq!(finalize(dec!(0.0000015)).to_string(), "0.000002");
        assert_eq!(finalize(dec!(0.0000025)).to_string(), "0.000002");
        assert_eq!(finalize(dec!(1.5)).to_string(), "1.500000");
        assert_eq!(finalize(Decimal::ZERO).to_string(), "0.000000");
    }

    #[test]
    fn compute_orders_lines_canonically() {
        let rc = card(&[
            (Dimension::InputTokensUncached, Rate::PerMillion(dec!(0.80))),
            (Dimension::InputTokensCached, Rate::PerMillion(dec!(0.20))),
            (Dimension::OutputTokens, Rate::PerMillion(dec!(3.20))),
        ]);
        let billable = BillableUsage::from([
            (Dimension::OutputTokens, 350),
            (Dimension::InputTokensUncached, 1200),
            (Dimension::InputTokensCached, 800),
        ]);
        let (lines, total) = compute(&rc, &billable).unwrap();

        let dims: Vec<_> = lines.iter().map(|l| l.dimension).collect();
        assert_eq!(
            dims,
            vec![
                Dimension::InputTokensUncached,
                Dimension::InputTokensCached,
                Dimension::OutputTokens
            ]
        );
        let costs: Vec<_> = lines.iter().map(|l| l.cost.to_string()).collect();
        assert_eq!(costs, vec!["0.000960", "0.000160", "0.001120"]);
        assert_eq!(total.to_string(), "0.002240");
    }

    #[test]
    fn total_rounds_the_exact_sum_once() {
        let rc = card(&[
            (Dimension::InputTokensUncached, Rate::PerUnit(dec!(0.0000004))),
            (Dimension::OutputTokens, Rate::PerUnit(dec!(0.0000004))),
        ]);
        let billable = BillableUsage::from([
            (Dimension::InputTokensUncached, 1),
            (Dimension::OutputTokens, 1),
        ]);
        let (lines, total) = compute(&rc, &billable).unwrap();
        assert!(lines.iter().all(|l| l.cost.is_zero()));
        assert_eq!(total.to_string(), "0.000001");
    }

    #[test]
    fn empty_usage_costs_nothing() {
        let (lines, total) = compute(&card(&[]), &BillableUsage::new()).unwrap();
        assert!(lines.is_empty());
        assert_eq!(total.to_string(), "0.000000");
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let rc = card(&[(Dimension::Requests, Rate::PerUnit(Decimal::MAX))]);
        let billable = BillableUsage::from([(Dimension::Requests, 10)]);
        assert!(compute(&rc, &billable).is_err());
    }

    #[test]
    fn precision_loss_is_reported_not_rounded() {
        // 0.5000000000000000000000000001 per 1M: the exact cost needs scale 34
        let fine = Decimal::from_i128_with_scale(5_000_000_000_000_000_000_000_000_001, 28);
        assert_eq!(line_cost(1, &Rate::PerMillion(fine)), None);
        let rc = card(&[(Dimension::Requests, Rate::PerMillion(fine))]);
        let billable = BillableUsage::from([(Dimension::Requests, 1)]);
        let err = compute(&rc, &billable).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
    }

    #[test]
    fn small_rates_at_the_quantity_bound_stay_exact() {
        let rate = Rate::PerUnit(Decimal::from_i128_with_scale(5, 20));
        assert_eq!(
            line_cost(9_999_999_999, &rate),
            Some(Decimal::from_i128_with_scale(49_999_999_995, 20))
        );
        let per_1m = Rate::PerMillion(dec!(0.000000000001));
        assert_eq!(
            line_cost(10_000_000_000, &per_1m),
            Some(Decimal::from_i128_with_scale(1, 8))
        );
    }

    #[test]
    fn trailing_zeros_do_not_cost_precision() {
        let padded = Rate::PerMillion(Decimal::from_i128_with_scale(
            800_000_000_000_000_000_000_000,
            24,
        ));
        assert_eq!(line_cost(1_000_000, &padded), Some(dec!(0.8)));
    }

    #[test]
    fn exact_sum_spans_mixed_scales() {
        assert_eq!(
            exact_add(dec!(100000000000), Decimal::from_i128_with_scale(1, 16)),
            Some(Decimal::from_i128_with_scale(1_000_000_000_000_000_000_000_000_001, 16))
        );
        assert_eq!(exact_add(Decimal::MAX, dec!(1)), None);
    }
}
