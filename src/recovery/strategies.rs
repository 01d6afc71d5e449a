//! The four standard recovery strategies.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::data::aggregator::MeasureAggregator;
use crate::data::measure::{LEGACY_MEASURE, MeasureStore};
use crate::data::synthetic::estimated_series;
use crate::data::weights::WeightTable;
use crate::domain::{DataPoint, MeasureMap, MeasureSeries, Provenance, RecoveryContext, RecoveryResult};
use crate::error::{AppError, ErrorKind};
use crate::quality::validate_at;
use crate::recovery::RecoveryStrategy;

/// Waits between retry attempts.
pub trait Backoff: Send + Sync {
    fn wait(&self, attempt: u32);
}

/// Sleeps `base * 2^attempt`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn wait(&self, attempt: u32) {
        let delay = self.base.saturating_mul(2u32.saturating_pow(attempt));
        debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
        std::thread::sleep(delay);
    }
}

/// Retries immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl Backoff for NoBackoff {
    fn wait(&self, _attempt: u32) {}
}

/// Re-fetches the failed measure (or the whole currency) until the retry budget runs out.
pub struct RetryStrategy {
    aggregator: Arc<MeasureAggregator>,
    clock: Arc<dyn Clock>,
    backoff: Arc<dyn Backoff>,
}

impl RetryStrategy {
    pub fn new(aggregator: Arc<MeasureAggregator>, clock: Arc<dyn Clock>, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            aggregator,
            clock,
            backoff,
        }
    }

    fn refetch(&self, ctx: &RecoveryContext) -> Result<MeasureMap, AppError> {
        let Some(measure) = ctx.measure.as_deref() else {
            return Ok(self.aggregator.load_all(&ctx.currency)?.measures);
        };

        let series = self.aggregator.store().load(&ctx.currency, measure)?;
        let validation = validate_at(&series, self.clock.now());
        if !validation.is_valid {
            return Err(AppError::validation(format!(
                "{measure} still fails validation (score {:.0}).",
                validation.score
            )));
        }
        let mut measures = MeasureMap::new();
        measures.insert(measure.to_string(), series);
        Ok(measures)
    }
}

impl RecoveryStrategy for RetryStrategy {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn priority(&self) -> u8 {
        1
    }

    /// Validation failures and unknown currencies do not fix themselves.
    fn can_recover(&self, error: &AppError, ctx: &RecoveryContext) -> bool {
        ctx.retry_count < ctx.max_retries
            && !matches!(error.kind(), ErrorKind::Validation | ErrorKind::UnknownCurrency)
    }

    fn recover(&self, _error: &AppError, ctx: &RecoveryContext) -> Result<RecoveryResult, AppError> {
        let mut last = None;
        for attempt in ctx.retry_count..ctx.max_retries {
            self.backoff.wait(attempt);
            match self.refetch(ctx) {
                Ok(measures) if !measures.is_empty() => {
                    let tries = attempt - ctx.retry_count + 1;
                    return Ok(RecoveryResult::recovered(
                        self.name(),
                        measures,
                        false,
                        vec![format!("Data loaded after {tries} retry attempt(s)")],
                    ));
                }
                Ok(_) => last = Some("retry produced no measures".to_string()),
                Err(e) => {
                    warn!(currency = %ctx.currency, attempt, error = %e, "retry attempt failed");
                    last = Some(e.to_string());
                }
            }
        }
        Ok(RecoveryResult::failed(
            self.name(),
            last.unwrap_or_else(|| "retry budget exhausted".to_string()),
        ))
    }
}

/// Falls back to the simplified CPI-only document.
pub struct LegacyDataStrategy {
    store: MeasureStore,
    weights: Arc<WeightTable>,
}

impl LegacyDataStrategy {
    pub fn new(store: MeasureStore, weights: Arc<WeightTable>) -> Self {
        Self { store, weights }
    }
}

impl RecoveryStrategy for LegacyDataStrategy {
    fn name(&self) -> &'static str {
        "legacy_data"
    }

    fn priority(&self) -> u8 {
        2
    }

    /// Only supported currencies have a legacy document.
    fn can_recover(&self, error: &AppError, ctx: &RecoveryContext) -> bool {
        self.weights.contains(&ctx.currency)
            && matches!(
                error.kind(),
                ErrorKind::NotFound | ErrorKind::MalformedData | ErrorKind::NoValidMeasures | ErrorKind::Validation
            )
    }

    fn recover(&self, _error: &AppError, ctx: &RecoveryContext) -> Result<RecoveryResult, AppError> {
        let measure = self
            .weights
            .primary_measure(&ctx.currency)
            .unwrap_or(LEGACY_MEASURE)
            .to_string();
        let series = self.store.load_legacy(&ctx.currency, &measure)?;
        if series.is_empty() {
            return Ok(RecoveryResult::failed(self.name(), "legacy document has no data"));
        }

        let mut measures = MeasureMap::new();
        measures.insert(measure, series);
        Ok(RecoveryResult::recovered(
            self.name(),
            measures,
            true,
            vec![format!(
                "Only simplified CPI data is available for {}; multi-measure consensus is unavailable",
                ctx.currency
            )],
        ))
    }
}

/// Fills missing years in the series that failed validation.
///
/// Succeeds only when at least one year was filled and the repaired series
/// validates without errors.
pub struct InterpolationStrategy {
    clock: Arc<dyn Clock>,
}

impl InterpolationStrategy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl RecoveryStrategy for InterpolationStrategy {
    fn name(&self) -> &'static str {
        "interpolation"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn can_recover(&self, error: &AppError, ctx: &RecoveryContext) -> bool {
        error.kind() == ErrorKind::Validation && ctx.original.is_some()
    }

    fn recover(&self, _error: &AppError, ctx: &RecoveryContext) -> Result<RecoveryResult, AppError> {
        let Some(original) = ctx.original.as_ref() else {
            return Ok(RecoveryResult::failed(self.name(), "no original series to interpolate"));
        };
        let name = ctx.measure.clone().unwrap_or_else(|| original.measure.clone());
        let filled = interpolate_gaps(original)?;

        // Years that had no usable factor before.
        let added = filled
            .points
            .keys()
            .filter(|&&year| original.factor(year).is_none_or(|f| !(f.is_finite() && f > 0.0)))
            .count();
        if added == 0 {
            return Ok(RecoveryResult::failed(
                self.name(),
                format!("{name} has no gaps to interpolate"),
            ));
        }

        let validation = validate_at(&filled, self.clock.now());
        if !validation.errors.is_empty() {
            return Ok(RecoveryResult::failed(
                self.name(),
                format!(
                    "{name} still fails validation after interpolation: {}",
                    validation.errors.join("; ")
                ),
            ));
        }

        let mut measures = MeasureMap::new();
        measures.insert(name.clone(), filled);
        Ok(RecoveryResult::recovered(
            self.name(),
            measures,
            true,
            vec![format!("Interpolated {added} missing year(s) in {name}")],
        ))
    }
}

/// Linearly interpolate every missing year strictly between the first and last
/// usable years. Years with non-positive or non-finite factors count as missing.
pub fn interpolate_gaps(series: &MeasureSeries) -> Result<MeasureSeries, AppError> {
    let known: Vec<(i32, DataPoint)> = series
        .points
        .iter()
        .filter(|(_, p)| p.inflation_factor.is_finite() && p.inflation_factor > 0.0)
        .map(|(&y, &p)| (y, p))
        .collect();

    if known.len() < 2 {
        return Err(AppError::calculation(format!(
            "Need at least two data points to interpolate {}, found {}.",
            series.measure,
            known.len()
        )));
    }

    let mut out = series.clone();
    out.points = known.iter().copied().collect();

    for pair in known.windows(2) {
        let (y0, p0) = pair[0];
        let (y1, p1) = pair[1];
        let span = (y1 - y0) as f64;
        let mut prev_factor = p0.inflation_factor;
        for year in (y0 + 1)..y1 {
            let u = (year - y0) as f64 / span;
            let factor = lerp(p0.inflation_factor, p1.inflation_factor, u);
            out.points.insert(
                year,
                DataPoint {
                    index_value: lerp(p0.index_value, p1.index_value, u),
                    inflation_factor: factor,
                    year_over_year_change: Some((factor / prev_factor - 1.0) * 100.0),
                },
            );
            prev_factor = factor;
        }
    }

    out.provenance = Provenance::Interpolated;
    Ok(out)
}

fn lerp(a: f64, b: f64, u: f64) -> f64 {
    a + u * (b - a)
}

/// Last resort: a synthetic series from the currency's average inflation rate.
pub struct EstimatedDataStrategy {
    weights: Arc<WeightTable>,
    clock: Arc<dyn Clock>,
}

impl EstimatedDataStrategy {
    pub fn new(weights: Arc<WeightTable>, clock: Arc<dyn Clock>) -> Self {
        Self { weights, clock }
    }
}

impl RecoveryStrategy for EstimatedDataStrategy {
    fn name(&self) -> &'static str {
        "estimated_data"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn can_recover(&self, _error: &AppError, _ctx: &RecoveryContext) -> bool {
        true
    }

    fn recover(&self, _error: &AppError, ctx: &RecoveryContext) -> Result<RecoveryResult, AppError> {
        let measure = self
            .weights
            .primary_measure(&ctx.currency)
            .unwrap_or(LEGACY_MEASURE)
            .to_string();
        let series = estimated_series(&ctx.currency, &measure, self.clock.now())?;

        let mut measures = MeasureMap::new();
        measures.insert(measure, series);
        Ok(RecoveryResult::recovered(
            self.name(),
            measures,
            true,
            vec![format!(
                "Using estimated inflation data for {}; results are approximate (low confidence)",
                ctx.currency
            )],
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;

    fn gappy() -> MeasureSeries {
        let factors = [(2000, 1.00), (2001, 1.02), (2004, 1.10), (2005, 1.13)];
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
            measure: "cpi".to_string(),
            source: Some("BLS".to_string()),
            last_updated: None,
            earliest_year: 2000,
            latest_year: 2005,
            points,
            provenance: Provenance::RealAgencyData,
        }
    }

    #[test]
    fn interpolation_fills_between_neighbours() {
        let filled = interpolate_gaps(&gappy()).unwrap();
        let f2001 = filled.factor(2001).unwrap();
        let f2002 = filled.factor(2002).unwrap();
        let f2003 = filled.factor(2003).unwrap();
        let f2004 = filled.factor(2004).unwrap();

        assert!(f2001 < f2002 && f2002 < f2003 && f2003 < f2004);
        assert!((f2002 - (1.02 + (1.10 - 1.02) / 3.0)).abs() < 1e-12);
        assert_eq!(filled.len(), 6);
        assert_eq!(filled.provenance, Provenance::Interpolated);
    }

    #[test]
    fn interpolation_needs_two_points() {
        let mut s = gappy();
        s.points.retain(|&y, _| y == 2000);
        let err = interpolate_gaps(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Calculation);
    }

    #[test]
    fn interpolation_treats_bad_factors_as_missing() {
        let mut s = gappy();
        s.points.get_mut(&2001).unwrap().inflation_factor = -1.0;
        let filled = interpolate_gaps(&s).unwrap();
        let f2001 = filled.factor(2001).unwrap();
        assert!(f2001 > 1.0 && f2001 < 1.10);
    }

    #[test]
    fn interpolation_strategy_requires_validation_error_and_original() {
        let strategy = InterpolationStrategy::new(test_clock());
        let mut ctx = RecoveryContext::for_currency("USD", 3);
        assert!(!strategy.can_recover(&AppError::validation("bad"), &ctx));
        ctx.original = Some(gappy());
        assert!(strategy.can_recover(&AppError::validation("bad"), &ctx));
        assert!(!strategy.can_recover(&AppError::not_found("gone"), &ctx));
    }

    fn test_clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
    }

    /// Yearly points `2000..=last` rising a steady 2%, minus the `skip` years.
    fn steady(last: i32, skip: &[i32]) -> MeasureSeries {
        let mut s = gappy();
        s.last_updated = Some("2023-12-01".to_string());
        s.points = (2000..=last)
            .filter(|y| !skip.contains(y))
            .map(|y| {
                let f = 1.02f64.powi(y - 2000);
                (
                    y,
                    DataPoint {
                        index_value: f * 100.0,
                        inflation_factor: f,
                        year_over_year_change: Some(2.0),
                    },
                )
            })
            .collect();
        s.earliest_year = 2000;
        s.latest_year = last;
        s
    }

    fn interpolate_ctx(series: MeasureSeries) -> RecoveryContext {
        RecoveryContext {
            measure: Some("cpi".to_string()),
            original: Some(series),
            ..RecoveryContext::for_currency("USD", 0)
        }
    }

    #[test]
    fn interpolation_repairs_gappy_series() {
        let strategy = InterpolationStrategy::new(test_clock());
        let ctx = interpolate_ctx(steady(2011, &[2003, 2004, 2008]));
        let result = strategy.recover(&AppError::validation("short"), &ctx).unwrap();

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.measures["cpi"].len(), 12);
        assert_eq!(result.warnings, vec!["Interpolated 3 missing year(s) in cpi".to_string()]);
    }

    #[test]
    fn interpolation_fails_without_gaps() {
        let strategy = InterpolationStrategy::new(test_clock());
        let ctx = interpolate_ctx(steady(2004, &[]));
        let result = strategy.recover(&AppError::validation("short"), &ctx).unwrap();

        assert!(!result.success);
        assert!(result.measures.is_empty());
        assert!(result.error.unwrap().contains("no gaps"));
    }

    #[test]
    fn interpolation_fails_when_filled_series_is_still_invalid() {
        let strategy = InterpolationStrategy::new(test_clock());
        // Six years spanned: filling 2002 still leaves too few points.
        let ctx = interpolate_ctx(steady(2005, &[2002]));
        let result = strategy.recover(&AppError::validation("short"), &ctx).unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Insufficient data points: 6"));
    }

    #[test]
    fn legacy_applies_to_validation_failures_of_known_currencies() {
        let store = MeasureStore::new(Arc::new(crate::data::MemoryBlobStore::new()));
        let strategy = LegacyDataStrategy::new(store, Arc::new(WeightTable::builtin()));
        let ctx = interpolate_ctx(gappy());

        assert!(strategy.can_recover(&AppError::validation("bad"), &ctx));
        assert!(strategy.can_recover(&AppError::not_found("gone"), &ctx));
        assert!(!strategy.can_recover(&AppError::calculation("boom"), &ctx));
        let zzz = RecoveryContext::for_currency("ZZZ", 0);
        assert!(!strategy.can_recover(&AppError::not_found("gone"), &zzz));
    }

    #[test]
    fn estimated_strategy_always_applies() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let strategy = EstimatedDataStrategy::new(Arc::new(WeightTable::builtin()), clock);
        let ctx = RecoveryContext::for_currency("ZZZ", 0);
        let err = AppError::unknown_currency("ZZZ");

        assert!(strategy.can_recover(&err, &ctx));
        let result = strategy.recover(&err, &ctx).unwrap();
        assert!(result.success);
        assert!(result.fallback_used);
        let series = &result.measures[LEGACY_MEASURE];
        assert_eq!(series.provenance, Provenance::EstimatedPattern);
        assert_eq!(series.max_year(), Some(2024));
    }
}
