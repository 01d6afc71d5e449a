//! Per-currency health report built from individual series validation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{HealthReport, MeasureMap};
use crate::quality::validator::validate_at;

/// More missing years than this earns a recommendation.
const MISSING_YEARS_ALERT: usize = 10;
/// Scores below this earn a recommendation.
const LOW_SCORE_ALERT: f64 = 70.0;

pub fn report(currency: &str, measures: &MeasureMap) -> HealthReport {
    report_at(currency, measures, Utc::now())
}

pub fn report_at(currency: &str, measures: &MeasureMap, now: DateTime<Utc>) -> HealthReport {
    let mut results = BTreeMap::new();
    let mut critical_issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut valid_scores = Vec::new();

    for (name, series) in measures {
        let result = validate_at(series, now);
        debug!(currency, measure = %name, score = result.score, valid = result.is_valid, "validated measure");

        if result.is_valid {
            valid_scores.push(result.score);
        } else {
            critical_issues.extend(result.errors.iter().map(|e| format!("{name}: {e}")));
        }

        let missing = result.details.missing_years.len();
        if missing > MISSING_YEARS_ALERT {
            recommendations.push(format!(
                "{name}: {missing} missing years; consider interpolation or an alternate source"
            ));
        }
        if result.score < LOW_SCORE_ALERT {
            recommendations.push(format!(
                "{name}: quality score {:.0} is below {LOW_SCORE_ALERT:.0}; review the source data",
                result.score
            ));
        }

        results.insert(name.clone(), result);
    }

    if measures.is_empty() {
        critical_issues.push(format!("No measures loaded for {currency}"));
    }
    if valid_scores.is_empty() {
        recommendations.push("No measure passed validation; consensus will rely on fallback data".to_string());
    }

    let overall_score = if valid_scores.is_empty() {
        0.0
    } else {
        valid_scores.iter().sum::<f64>() / valid_scores.len() as f64
    };

    HealthReport {
        currency: currency.to_string(),
        overall_score,
        valid_measures: valid_scores.len(),
        total_measures: measures.len(),
        measures: results,
        critical_issues,
        recommendations,
    }
}
