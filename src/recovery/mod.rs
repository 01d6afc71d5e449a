//! Layered recovery from load and validation failures.
//!
//! Strategies are tried in ascending priority order until one succeeds:
//!
//! 1. `retry`: re-fetch with exponential backoff
//! 2. `legacy_data`: simplified CPI-only document
//! 3. `interpolation`: fill gaps in the series that failed validation
//! 4. `estimated_data`: synthetic series from long-run average inflation
//!
//! `RecoveryEngine::recover` never returns an error; exhaustion is reported as
//! `success == false` with strategy `all_failed`.

pub mod strategies;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::data::aggregator::MeasureAggregator;
use crate::data::weights::WeightTable;
use crate::domain::{RecoveryContext, RecoveryResult};
use crate::error::AppError;

pub use strategies::{
    Backoff, EstimatedDataStrategy, ExponentialBackoff, InterpolationStrategy, LegacyDataStrategy, NoBackoff,
    RetryStrategy, interpolate_gaps,
};

pub const ALL_FAILED: &str = "all_failed";

pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> u8;

    fn can_recover(&self, error: &AppError, ctx: &RecoveryContext) -> bool;

    /// `Err` and `Ok(success == false)` are both treated as "try the next strategy".
    fn recover(&self, error: &AppError, ctx: &RecoveryContext) -> Result<RecoveryResult, AppError>;
}

pub struct RecoveryEngine {
    strategies: Vec<Box<dyn RecoveryStrategy>>,
}

impl RecoveryEngine {
    pub fn new(mut strategies: Vec<Box<dyn RecoveryStrategy>>) -> Self {
        strategies.sort_by_key(|s| s.priority());
        Self { strategies }
    }

    /// The four standard strategies wired to the given collaborators.
    pub fn standard(
        aggregator: Arc<MeasureAggregator>,
        weights: Arc<WeightTable>,
        clock: Arc<dyn Clock>,
        backoff: Arc<dyn Backoff>,
    ) -> Self {
        let store = aggregator.store().clone();
        Self::new(vec![
            Box::new(RetryStrategy::new(aggregator, clock.clone(), backoff)),
            Box::new(LegacyDataStrategy::new(store, weights.clone())),
            Box::new(InterpolationStrategy::new(clock.clone())),
            Box::new(EstimatedDataStrategy::new(weights, clock)),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn recover(&self, error: &AppError, ctx: &RecoveryContext) -> RecoveryResult {
        let mut last_error = error.to_string();

        for strategy in &self.strategies {
            let name = strategy.name();
            if !strategy.can_recover(error, ctx) {
                debug!(strategy = name, currency = %ctx.currency, "recovery strategy not applicable");
                continue;
            }

            match strategy.recover(error, ctx) {
                Ok(result) if result.success => {
                    info!(
                        strategy = name,
                        currency = %ctx.currency,
                        measures = result.measures.len(),
                        "recovered from data error"
                    );
                    return result;
                }
                Ok(result) => {
                    let reason = result.error.unwrap_or_else(|| "no data produced".to_string());
                    warn!(strategy = name, currency = %ctx.currency, %reason, "recovery strategy failed");
                    last_error = reason;
                }
                Err(e) => {
                    warn!(strategy = name, currency = %ctx.currency, error = %e, "recovery strategy failed");
                    last_error = e.to_string();
                }
            }
        }

        warn!(currency = %ctx.currency, error = %error, "all recovery strategies failed");
        RecoveryResult::failed(ALL_FAILED, format!("All recovery strategies failed; last error: {last_error}"))
    }
}
