//! Single-measure adjustment and year resolution.

use crate::domain::{MeasureCalculation, MeasureSeries};
use crate::error::AppError;

/// Resolve the start year actually used for `series`.
///
/// Rules, in order:
/// 1. the requested year when it has data
/// 2. the first year with data after the requested one
/// 3. the nominal `earliest_year` when it has data
/// 4. the earliest year present
pub fn resolve_start_year(series: &MeasureSeries, requested: i32) -> Option<i32> {
    if series.points.contains_key(&requested) {
        return Some(requested);
    }
    if let Some((&year, _)) = series.points.range(requested..).next() {
        return Some(year);
    }
    if series.points.contains_key(&series.earliest_year) {
        return Some(series.earliest_year);
    }
    series.min_year()
}

/// Resolve the end year actually used for `series`.
///
/// The requested year when it has data, else the nominal `latest_year` when it
/// has data, else the latest year present.
pub fn resolve_end_year(series: &MeasureSeries, requested: i32) -> Option<i32> {
    if series.points.contains_key(&requested) {
        return Some(requested);
    }
    if series.points.contains_key(&series.latest_year) {
        return Some(series.latest_year);
    }
    series.max_year()
}

/// Adjust `amount` from `from_year` prices to `to_year` prices using one measure.
pub fn calculate_inflation_for_measure(
    series: &MeasureSeries,
    from_year: i32,
    to_year: i32,
    amount: f64,
) -> Result<MeasureCalculation, AppError> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(AppError::invalid_input(format!("Amount must be a positive number, got {amount}.")));
    }

    let (Some(actual_from), Some(actual_to)) = (
        resolve_start_year(series, from_year),
        resolve_end_year(series, to_year),
    ) else {
        return Err(AppError::calculation(format!(
            "{} has no data to resolve {from_year}-{to_year}.",
            series.measure
        )));
    };

    let from_factor = usable_factor(series, actual_from)?;
    let to_factor = usable_factor(series, actual_to)?;

    let adjusted_amount = amount * to_factor / from_factor;
    let pct_change = (adjusted_amount - amount) / amount * 100.0;

    Ok(MeasureCalculation {
        measure: series.measure.clone(),
        adjusted_amount,
        pct_change,
        actual_from_year: actual_from,
        actual_to_year: actual_to,
    })
}

fn usable_factor(series: &MeasureSeries, year: i32) -> Result<f64, AppError> {
    match series.factor(year) {
        Some(f) if f.is_finite() && f > 0.0 => Ok(f),
        Some(f) => Err(AppError::calculation(format!(
            "{} has an unusable inflation factor for {year}: {f}",
            series.measure
        ))),
        None => Err(AppError::calculation(format!("{} has no data for {year}.", series.measure))),
    }
}
