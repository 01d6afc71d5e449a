//! Loads every weighted measure for a currency, tolerating partial failure.
//!
//! Fetches fan out across the rayon pool; each measure writes only its own
//! slot, so completion order does not affect the result.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::data::measure::MeasureStore;
use crate::data::weights::WeightTable;
use crate::domain::{MeasureMap, MeasureSeries};
use crate::error::{AppError, ErrorKind};
use crate::quality::validate_at;

/// Everything one `load_report` pass produced.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Loaded and validated.
    pub measures: MeasureMap,
    /// Per-measure failures (load or validation), in weight-table order.
    pub errors: Vec<(String, AppError)>,
    /// Loaded but failed validation; kept for interpolation-based recovery.
    pub rejected: MeasureMap,
}

pub struct MeasureAggregator {
    store: MeasureStore,
    weights: Arc<WeightTable>,
    clock: Arc<dyn Clock>,
}

impl MeasureAggregator {
    pub fn new(store: MeasureStore, weights: Arc<WeightTable>, clock: Arc<dyn Clock>) -> Self {
        Self { store, weights, clock }
    }

    pub fn store(&self) -> &MeasureStore {
        &self.store
    }

    /// Load all measures for `currency`; fails when none survive.
    pub fn load_all(&self, currency: &str) -> Result<LoadReport, AppError> {
        let report = self.load_report(currency)?;
        if report.measures.is_empty() {
            return Err(AppError::new(
                ErrorKind::NoValidMeasures,
                format!("No valid inflation measures for {currency} ({} failed).", report.errors.len()),
            ));
        }
        Ok(report)
    }

    /// Like `load_all`, but an empty result is returned rather than raised.
    pub fn load_report(&self, currency: &str) -> Result<LoadReport, AppError> {
        let weights = self
            .weights
            .for_currency(currency)
            .ok_or_else(|| AppError::unknown_currency(currency))?;
        let names: Vec<&String> = weights.keys().collect();
        let now = self.clock.now();

        let loaded: Vec<(String, Result<MeasureSeries, AppError>)> = names
            .par_iter()
            .map(|name| ((*name).clone(), self.store.load(currency, name)))
            .collect();

        let mut report = LoadReport::default();
        for (name, result) in loaded {
            let series = match result {
                Ok(series) => series,
                Err(e) => {
                    warn!(currency, measure = %name, error = %e, "measure failed to load");
                    report.errors.push((name, e));
                    continue;
                }
            };

            let validation = validate_at(&series, now);
            if validation.is_valid {
                report.measures.insert(name, series);
            } else {
                let reason = if validation.errors.is_empty() {
                    format!("score {:.0} below threshold", validation.score)
                } else {
                    validation.errors.join("; ")
                };
                warn!(currency, measure = %name, score = validation.score, %reason, "dropping invalid measure");
                report.errors.push((
                    name.clone(),
                    AppError::validation(format!("{name} failed validation: {reason}")),
                ));
                report.rejected.insert(name, series);
            }
        }

        info!(
            currency,
            loaded = report.measures.len(),
            failed = report.errors.len(),
            "loaded currency measures"
        );
        Ok(report)
    }
}
