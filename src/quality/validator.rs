//! Series validation: structure, gaps, outliers, freshness, and a quality score.
//!
//! Scoring (starting from 100):
//! - −20 per error, −5 per warning, −2 per outlier
//! - −30 × (1 − completeness), completeness = present years / years spanned
//! - +5 for ≥ 50 years of data, another +5 for ≥ 100
//! - clamped to `[0, 100]`
//!
//! A series is valid when it has no errors and scores at least `MIN_VALID_SCORE`.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{Gap, MeasureSeries, Outlier, OutlierKind, ValidationDetails, ValidationResult};

pub const MIN_DATA_POINTS: usize = 10;
pub const MIN_VALID_SCORE: f64 = 50.0;

/// Plausible band for annual inflation, in percent.
const MAX_YOY_CHANGE: f64 = 50.0;
const MIN_YOY_CHANGE: f64 = -20.0;

const Z_SCORE_LIMIT: f64 = 3.0;
/// Fewer samples make the standard deviation meaningless.
const MIN_STAT_SAMPLES: usize = 4;
const STALE_AFTER_DAYS: i64 = 90;

const ERROR_PENALTY: f64 = 20.0;
const WARNING_PENALTY: f64 = 5.0;
const OUTLIER_PENALTY: f64 = 2.0;
const COMPLETENESS_WEIGHT: f64 = 30.0;

/// Validate against the current wall-clock time.
pub fn validate(series: &MeasureSeries) -> ValidationResult {
    validate_at(series, Utc::now())
}

/// Validate with an explicit "now" for the freshness check.
pub fn validate_at(series: &MeasureSeries, now: DateTime<Utc>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if series.currency.trim().is_empty() {
        errors.push("Missing currency".to_string());
    }
    if series.measure.trim().is_empty() {
        errors.push("Missing measure name".to_string());
    }

    let n = series.len();
    if n < MIN_DATA_POINTS {
        errors.push(format!("Insufficient data points: {n} (minimum {MIN_DATA_POINTS})"));
    }

    // Points with unusable factors are reported and left out of the statistics.
    let mut yoy = Vec::new();
    for (&year, point) in &series.points {
        let factor = point.inflation_factor;
        if !(factor.is_finite() && factor > 0.0) {
            errors.push(format!("Invalid inflation factor for {year}: {factor}"));
            continue;
        }
        if let Some(change) = point.year_over_year_change.filter(|c| c.is_finite()) {
            yoy.push((year, change));
        }
    }

    let (missing_years, gaps) = find_gaps(series);
    let outliers = find_outliers(&yoy, &mut warnings);

    check_freshness(series, now, &mut warnings);

    let expected = match (series.min_year(), series.max_year()) {
        (Some(lo), Some(hi)) => (hi - lo + 1) as usize,
        _ => 0,
    };
    let completeness = if expected == 0 { 0.0 } else { n as f64 / expected as f64 };

    let mut score = 100.0;
    score -= ERROR_PENALTY * errors.len() as f64;
    score -= WARNING_PENALTY * warnings.len() as f64;
    score -= OUTLIER_PENALTY * outliers.len() as f64;
    score -= (1.0 - completeness) * COMPLETENESS_WEIGHT;
    if n >= 50 {
        score += 5.0;
    }
    if n >= 100 {
        score += 5.0;
    }
    let score = score.clamp(0.0, 100.0);

    ValidationResult {
        is_valid: errors.is_empty() && score >= MIN_VALID_SCORE,
        errors,
        warnings,
        score,
        details: ValidationDetails {
            data_points: n,
            missing_years,
            outliers,
            gaps,
        },
    }
}

/// Missing years across `[min, max]`, plus the same years grouped into runs.
pub fn find_gaps(series: &MeasureSeries) -> (Vec<i32>, Vec<Gap>) {
    let (Some(lo), Some(hi)) = (series.min_year(), series.max_year()) else {
        return (Vec::new(), Vec::new());
    };

    let missing: Vec<i32> = (lo..=hi).filter(|y| !series.points.contains_key(y)).collect();

    let mut gaps: Vec<Gap> = Vec::new();
    for &year in &missing {
        match gaps.last_mut() {
            Some(gap) if gap.end + 1 == year => {
                gap.end = year;
                gap.length += 1;
            }
            _ => gaps.push(Gap {
                start: year,
                end: year,
                length: 1,
            }),
        }
    }

    (missing, gaps)
}

fn find_outliers(yoy: &[(i32, f64)], warnings: &mut Vec<String>) -> Vec<Outlier> {
    let mut outliers = Vec::new();

    for &(year, change) in yoy {
        if change > MAX_YOY_CHANGE || change < MIN_YOY_CHANGE {
            warnings.push(format!("Extreme inflation change in {year}: {change:.1}%"));
            outliers.push(Outlier {
                year,
                value: change,
                kind: OutlierKind::Threshold,
                reason: "Year-over-year change outside plausible range (-20% to 50%)".to_string(),
            });
        }
    }

    if yoy.len() >= MIN_STAT_SAMPLES {
        let n = yoy.len() as f64;
        let mean = yoy.iter().map(|(_, v)| v).sum::<f64>() / n;
        let variance = yoy.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev > 0.0 {
            for &(year, change) in yoy {
                let z = (change - mean).abs() / std_dev;
                if z > Z_SCORE_LIMIT {
                    outliers.push(Outlier {
                        year,
                        value: change,
                        kind: OutlierKind::Statistical,
                        reason: format!("Statistical outlier (z-score {z:.2})"),
                    });
                }
            }
        }
    }

    outliers
}

fn check_freshness(series: &MeasureSeries, now: DateTime<Utc>, warnings: &mut Vec<String>) {
    if series.source.as_deref().is_none_or(|s| s.trim().is_empty()) {
        warnings.push("Missing data source".to_string());
    }

    let Some(raw) = series.last_updated.as_deref().filter(|s| !s.trim().is_empty()) else {
        warnings.push("Missing lastUpdated timestamp".to_string());
        return;
    };

    match parse_timestamp(raw) {
        Some(updated) => {
            let age = (now - updated).num_days();
            if age > STALE_AFTER_DAYS {
                warnings.push(format!("Data is {age} days old (last updated {raw})"));
            }
        }
        None => warnings.push(format!("Unrecognized lastUpdated timestamp '{raw}'")),
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
