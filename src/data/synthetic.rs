//! Estimated (synthetic) series generation from long-run average inflation.
//!
//! Used only as the last-resort recovery path. The output is explicitly tagged
//! `Provenance::EstimatedPattern` so it can never pass for agency data.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Datelike, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::weights::{average_inflation_rate, normalize_currency, start_year};
use crate::domain::{DataPoint, MeasureSeries, Provenance};
use crate::error::AppError;

/// Standard deviation of the yearly jitter around the average rate (fraction).
const JITTER_STD: f64 = 0.005;
/// Keeps a jittered year from collapsing the cumulative factor.
const MIN_YEARLY_RATE: f64 = -0.05;

/// Generate a yearly series named `measure` from the currency's start year through `now`'s year.
///
/// The jitter is seeded from the currency and end year, so the same request
/// always yields the same series.
pub fn estimated_series(currency: &str, measure: &str, now: DateTime<Utc>) -> Result<MeasureSeries, AppError> {
    let currency = normalize_currency(currency);
    let end = now.year();
    let start = start_year(&currency).min(end);
    let rate = average_inflation_rate(&currency);

    let mut rng = StdRng::seed_from_u64(series_seed(&currency, end));
    let jitter = Normal::new(0.0, JITTER_STD)
        .map_err(|e| AppError::calculation(format!("Jitter distribution error: {e}")))?;

    let mut points = BTreeMap::new();
    let mut factor = 1.0;
    for year in start..=end {
        let yoy = if year == start {
            None
        } else {
            let yearly = (rate + jitter.sample(&mut rng)).max(MIN_YEARLY_RATE);
            factor *= 1.0 + yearly;
            Some(yearly * 100.0)
        };
        points.insert(
            year,
            DataPoint {
                index_value: factor * 100.0,
                inflation_factor: factor,
                year_over_year_change: yoy,
            },
        );
    }

    Ok(MeasureSeries {
        currency,
        measure: measure.to_string(),
        source: Some(format!(
            "Estimated from {:.1}% average annual inflation (low confidence)",
            rate * 100.0
        )),
        last_updated: Some(now.format("%Y-%m-%d").to_string()),
        earliest_year: start,
        latest_year: end,
        points,
        provenance: Provenance::EstimatedPattern,
    })
}

fn series_seed(currency: &str, end_year: i32) -> u64 {
    let mut hasher = DefaultHasher::new();
    currency.hash(&mut hasher);
    end_year.hash(&mut hasher);
    hasher.finish()
}
