//! Weighted consensus across several inflation measures.
//!
//! Each measure with a non-zero weight adjusts the amount independently; the
//! consensus is the weight-averaged adjustment. Weights are renormalized by the
//! weight actually available, so a currency missing one measure still produces
//! a consistent blend.

pub mod measure;

use tracing::{debug, warn};

use crate::data::weights::{WeightTable, normalize_currency};
use crate::domain::{ConsensusResult, MeasureContribution, MeasureMap};
use crate::error::{AppError, ErrorKind};

pub use measure::{calculate_inflation_for_measure, resolve_end_year, resolve_start_year};

/// Blend all weighted measures in `measures` for `currency`.
///
/// Measures are visited heaviest first; the first one that computes fixes the
/// canonical actual years. Contributions that resolved other years are kept
/// (with their own years) and flagged through `coverage_mismatch`.
pub fn consensus(
    measures: &MeasureMap,
    weights: &WeightTable,
    currency: &str,
    from_year: i32,
    to_year: i32,
    amount: f64,
) -> Result<ConsensusResult, AppError> {
    let currency_weights = weights.for_currency(currency).ok_or_else(|| {
        AppError::new(
            ErrorKind::UnknownCurrency,
            format!("No measure weights defined for currency {currency}; cannot compute consensus."),
        )
    })?;
    if !(amount.is_finite() && amount > 0.0) {
        return Err(AppError::invalid_input(format!("Amount must be a positive number, got {amount}.")));
    }

    let mut ordered: Vec<(&String, f64)> = currency_weights
        .iter()
        .filter(|(_, w)| w.is_finite() && **w > 0.0)
        .map(|(name, w)| (name, *w))
        .collect();
    ordered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(b.0)));

    let mut contributions = Vec::new();
    let mut skipped = Vec::new();
    let mut canonical: Option<(i32, i32)> = None;
    let mut weighted_adjusted = 0.0;
    let mut weighted_pct = 0.0;
    let mut total_weight = 0.0;

    for (name, weight) in ordered {
        let Some(series) = measures.get(name) else {
            continue;
        };

        let calc = match calculate_inflation_for_measure(series, from_year, to_year, amount) {
            Ok(calc) => calc,
            Err(e) => {
                warn!(currency, measure = %name, error = %e, "skipping measure in consensus");
                skipped.push((name.clone(), e.to_string()));
                continue;
            }
        };
        debug!(
            currency,
            measure = %name,
            weight,
            adjusted = calc.adjusted_amount,
            from = calc.actual_from_year,
            to = calc.actual_to_year,
            "measure contribution"
        );

        canonical.get_or_insert((calc.actual_from_year, calc.actual_to_year));
        weighted_adjusted += calc.adjusted_amount * weight;
        weighted_pct += calc.pct_change * weight;
        total_weight += weight;

        contributions.push(MeasureContribution {
            measure: name.clone(),
            adjusted_amount: calc.adjusted_amount,
            pct_change: calc.pct_change,
            weight,
            confidence: series.provenance.confidence(),
            provenance: series.provenance,
            actual_from_year: calc.actual_from_year,
            actual_to_year: calc.actual_to_year,
        });
    }

    let Some((actual_from, actual_to)) = canonical else {
        return Err(AppError::calculation(format!(
            "No measure could be computed for {currency} {from_year}-{to_year}."
        )));
    };

    if (total_weight - 1.0).abs() > f64::EPSILON {
        weighted_adjusted /= total_weight;
        weighted_pct /= total_weight;
        for c in &mut contributions {
            c.weight /= total_weight;
        }
    }

    let years = actual_to - actual_from;
    let annualized_rate = if years > 0 {
        (weighted_adjusted / amount).powf(1.0 / years as f64) - 1.0
    } else {
        0.0
    };

    let coverage_mismatch = contributions
        .iter()
        .any(|c| (c.actual_from_year, c.actual_to_year) != (actual_from, actual_to));

    contributions.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.measure.cmp(&b.measure))
    });

    Ok(ConsensusResult {
        currency: normalize_currency(currency),
        amount,
        adjusted_amount: weighted_adjusted,
        total_inflation_pct: weighted_pct,
        annualized_rate,
        requested_from_year: from_year,
        requested_to_year: to_year,
        actual_from_year: actual_from,
        actual_to_year: actual_to,
        coverage_mismatch,
        measures: contributions,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{Confidence, DataPoint, MeasureSeries, Provenance};

    fn series(measure: &str, factors: &[(i32, f64)], provenance: Provenance) -> MeasureSeries {
        let points: BTreeMap<i32, DataPoint> = factors
            .iter()
            .map(|&(y, f)| {
                (
                    y,
                    DataPoint {
                        index_value: f * 100.0,
                        inflation_factor: f,
                        year_over_year_change: None,
                    },
                )
            })
            .collect();
        MeasureSeries {
            currency: "USD".to_string(),
            measure: measure.to_string(),
            source: None,
            last_updated: None,
            earliest_year: factors.first().map_or(0, |p| p.0),
            latest_year: factors.last().map_or(0, |p| p.0),
            points,
            provenance,
        }
    }

    fn usd_pair() -> MeasureMap {
        let mut m = MeasureMap::new();
        m.insert(
            "cpi".to_string(),
            series("cpi", &[(2015, 1.0), (2023, 1.25)], Provenance::RealAgencyData),
        );
        m.insert(
            "core_cpi".to_string(),
            series("core_cpi", &[(2015, 1.0), (2023, 1.20)], Provenance::EstimatedPattern),
        );
        m
    }

    #[test]
    fn blends_two_measures() {
        let weights = WeightTable::new().with_currency("USD", [("cpi", 0.6), ("core_cpi", 0.4)]);
        let result = consensus(&usd_pair(), &weights, "USD", 2015, 2023, 100.0).unwrap();

        assert!((result.adjusted_amount - 123.0).abs() < 1e-9, "got {}", result.adjusted_amount);
        assert!((result.total_inflation_pct - 23.0).abs() < 1e-9);
        assert_eq!(result.measures[0].measure, "cpi");
        assert_eq!(result.measures[0].confidence, Confidence::High);
        assert_eq!(result.measures[1].confidence, Confidence::Medium);
        assert!(!result.coverage_mismatch);

        let expected_rate = 1.23_f64.powf(1.0 / 8.0) - 1.0;
        assert!((result.annualized_rate - expected_rate).abs() < 1e-12);
    }

    #[test]
    fn single_full_weight_measure_matches_measure_output() {
        let weights = WeightTable::new().with_currency("USD", [("cpi", 1.0)]);
        let measures = usd_pair();
        let result = consensus(&measures, &weights, "USD", 2015, 2023, 100.0).unwrap();
        let direct = calculate_inflation_for_measure(&measures["cpi"], 2015, 2023, 100.0).unwrap();

        assert_eq!(result.adjusted_amount, direct.adjusted_amount);
        assert_eq!(result.total_inflation_pct, direct.pct_change);
        assert_eq!(result.measures.len(), 1);
    }

    #[test]
    fn renormalizes_partial_weights() {
        // Only cpi and core_cpi are loaded; builtin USD weights are 0.30 and 0.20.
        let result = consensus(&usd_pair(), &WeightTable::builtin(), "USD", 2015, 2023, 100.0).unwrap();
        let weight_sum: f64 = result.measures.iter().map(|m| m.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-12);
        // 0.6 * 125 + 0.4 * 120
        assert!((result.adjusted_amount - 123.0).abs() < 1e-9);
    }

    #[test]
    fn skips_failing_measures_and_reports_them() {
        let mut measures = usd_pair();
        measures.insert("pce".to_string(), series("pce", &[], Provenance::RealAgencyData));
        let weights = WeightTable::new().with_currency("USD", [("cpi", 0.5), ("pce", 0.5)]);

        let result = consensus(&measures, &weights, "USD", 2015, 2023, 100.0).unwrap();
        assert_eq!(result.measures.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].0, "pce");
        assert!((result.adjusted_amount - 125.0).abs() < 1e-9);
    }

    #[test]
    fn reports_coverage_mismatch() {
        let mut measures = usd_pair();
        measures.insert(
            "core_cpi".to_string(),
            series("core_cpi", &[(2016, 1.0), (2023, 1.2)], Provenance::RealAgencyData),
        );
        let weights = WeightTable::new().with_currency("USD", [("cpi", 0.6), ("core_cpi", 0.4)]);

        let result = consensus(&measures, &weights, "USD", 2015, 2023, 100.0).unwrap();
        assert!(result.coverage_mismatch);
        assert_eq!((result.actual_from_year, result.actual_to_year), (2015, 2023));
        let core = result.measures.iter().find(|m| m.measure == "core_cpi").unwrap();
        assert_eq!(core.actual_from_year, 2016);
    }

    #[test]
    fn unknown_currency_and_empty_blend_fail() {
        let err = consensus(&usd_pair(), &WeightTable::builtin(), "ZZZ", 2015, 2023, 100.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCurrency);

        let err = consensus(&MeasureMap::new(), &WeightTable::builtin(), "USD", 2015, 2023, 100.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Calculation);

        let err = consensus(&usd_pair(), &WeightTable::builtin(), "USD", 2015, 2023, 0.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn same_year_has_zero_annualized_rate() {
        let weights = WeightTable::new().with_currency("USD", [("cpi", 1.0)]);
        let result = consensus(&usd_pair(), &weights, "USD", 2023, 2023, 100.0).unwrap();
        assert_eq!(result.annualized_rate, 0.0);
        assert!((result.adjusted_amount - 100.0).abs() < 1e-12);
    }
}
