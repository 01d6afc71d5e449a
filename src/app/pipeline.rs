//! Shared pipeline used by the CLI and by any embedding UI.
//!
//! Keeping the four boundary operations in one place avoids duplicating the
//! workflow: cache -> load -> validate -> (recover) -> consensus.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{DataSource, Settings};
use crate::consensus::consensus;
use crate::data::{BlobStore, DirBlobStore, HttpBlobStore, MeasureAggregator, MeasureCache, MeasureStore, WeightTable};
use crate::domain::{ConsensusResult, HealthReport, MeasureMap, RecoveryContext, RecoveryResult};
use crate::error::{AppError, ErrorKind};
use crate::quality;
use crate::recovery::{Backoff, ExponentialBackoff, RecoveryEngine};

/// Measures for a currency plus the flags a UI must surface.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub measures: MeasureMap,
    /// At least one measure is recognized agency data.
    pub has_real_data: bool,
    /// Data came from legacy, interpolated, or estimated sources.
    pub fallback_used: bool,
    /// Recovery strategy that produced the data, if any.
    pub strategy: Option<String>,
    pub warnings: Vec<String>,
}

pub struct PipelineOptions {
    pub weights: WeightTable,
    pub max_retries: u32,
    pub backoff: Arc<dyn Backoff>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            weights: WeightTable::builtin(),
            max_retries: 3,
            backoff: Arc::new(ExponentialBackoff::default()),
        }
    }
}

pub struct MeasurePipeline {
    weights: Arc<WeightTable>,
    clock: Arc<dyn Clock>,
    aggregator: Arc<MeasureAggregator>,
    cache: Arc<MeasureCache>,
    engine: RecoveryEngine,
    max_retries: u32,
}

impl MeasurePipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        cache: Arc<MeasureCache>,
        clock: Arc<dyn Clock>,
        options: PipelineOptions,
    ) -> Self {
        let weights = Arc::new(options.weights);
        let aggregator = Arc::new(MeasureAggregator::new(
            MeasureStore::new(blobs),
            weights.clone(),
            clock.clone(),
        ));
        let engine = RecoveryEngine::standard(aggregator.clone(), weights.clone(), clock.clone(), options.backoff);
        Self {
            weights,
            clock,
            aggregator,
            cache,
            engine,
            max_retries: options.max_retries,
        }
    }

    /// Wire a pipeline from settings: blob store per `DataSource`, wall clock, builtin weights.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let blobs: Arc<dyn BlobStore> = match &settings.source {
            DataSource::Url(url) => Arc::new(HttpBlobStore::new(url.clone(), settings.http_timeout)?),
            DataSource::Dir(dir) => Arc::new(DirBlobStore::new(dir.clone())),
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(MeasureCache::new(settings.cache_ttl, clock.clone()));
        let options = PipelineOptions {
            max_retries: settings.max_retries,
            ..PipelineOptions::default()
        };
        Ok(Self::new(blobs, cache, clock, options))
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn cache(&self) -> &MeasureCache {
        &self.cache
    }

    /// Load every measure for `currency`, recovering through fallbacks when needed.
    ///
    /// Only fully real loads are cached, together with their per-measure
    /// warnings; recovered data is rebuilt on each call.
    pub fn load_currency_measures_with_fallback(&self, currency: &str) -> Result<LoadOutcome, AppError> {
        if let Some(cached) = self.cache.get(currency) {
            return Ok(LoadOutcome {
                has_real_data: has_real_data(&cached.measures),
                measures: cached.measures,
                fallback_used: false,
                strategy: None,
                warnings: cached.warnings,
            });
        }

        let (error, ctx, mut warnings) = match self.aggregator.load_report(currency) {
            Ok(report) if !report.measures.is_empty() => {
                let warnings = describe_failures(&report.errors);
                self.cache.insert(currency, report.measures.clone(), warnings.clone());
                return Ok(LoadOutcome {
                    has_real_data: has_real_data(&report.measures),
                    measures: report.measures,
                    fallback_used: false,
                    strategy: None,
                    warnings,
                });
            }
            Ok(report) => {
                let warnings = describe_failures(&report.errors);
                let mut ctx = RecoveryContext::for_currency(currency, self.max_retries);
                // Prefer repairing the heaviest measure that loaded but failed validation.
                let rejected = self.heaviest_rejected(currency, &report.rejected);
                let error = match rejected {
                    Some((name, series)) => {
                        let error = AppError::validation(format!("{name} failed validation for {currency}."));
                        ctx.measure = Some(name);
                        ctx.original = Some(series);
                        error
                    }
                    None => AppError::new(
                        ErrorKind::NoValidMeasures,
                        format!("No valid inflation measures for {currency}."),
                    ),
                };
                (error, ctx, warnings)
            }
            Err(e) => (e, RecoveryContext::for_currency(currency, self.max_retries), Vec::new()),
        };

        warn!(currency, error = %error, "falling back to data recovery");
        let result = self.engine.recover(&error, &ctx);
        if !result.success {
            return Err(AppError::new(
                ErrorKind::NoValidMeasures,
                format!(
                    "No usable inflation data for {currency}: {}",
                    result.error.unwrap_or_else(|| error.to_string())
                ),
            ));
        }

        info!(currency, strategy = %result.strategy, "using recovered measures");
        warnings.extend(result.warnings);
        Ok(LoadOutcome {
            has_real_data: has_real_data(&result.measures),
            measures: result.measures,
            fallback_used: result.fallback_used,
            strategy: Some(result.strategy),
            warnings,
        })
    }

    /// Every measure that parsed, valid or not, for diagnostics. Bypasses the cache.
    pub fn load_for_diagnostics(&self, currency: &str) -> Result<(MeasureMap, Vec<String>), AppError> {
        let report = self.aggregator.load_report(currency)?;
        let mut measures = report.measures;
        measures.extend(report.rejected);
        let load_failures = report
            .errors
            .iter()
            .filter(|(_, e)| e.kind() != ErrorKind::Validation)
            .map(|(name, e)| format!("{name}: {e}"))
            .collect();
        Ok((measures, load_failures))
    }

    pub fn calculate_consensus_inflation(
        &self,
        measures: &MeasureMap,
        currency: &str,
        from_year: i32,
        to_year: i32,
        amount: f64,
    ) -> Result<ConsensusResult, AppError> {
        consensus(measures, &self.weights, currency, from_year, to_year, amount)
    }

    pub fn validate_currency_measures(&self, currency: &str, measures: &MeasureMap) -> HealthReport {
        quality::report_at(currency, measures, self.clock.now())
    }

    pub fn recover_from_data_error(&self, error: &AppError, ctx: &RecoveryContext) -> RecoveryResult {
        self.engine.recover(error, ctx)
    }

    fn heaviest_rejected(
        &self,
        currency: &str,
        rejected: &MeasureMap,
    ) -> Option<(String, crate::domain::MeasureSeries)> {
        let weights = self.weights.for_currency(currency)?;
        rejected
            .iter()
            .max_by(|a, b| {
                let wa = weights.get(a.0).copied().unwrap_or(0.0);
                let wb = weights.get(b.0).copied().unwrap_or(0.0);
                wa.partial_cmp(&wb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(name, series)| (name.clone(), series.clone()))
    }
}

fn has_real_data(measures: &MeasureMap) -> bool {
    measures.values().any(|s| s.provenance.is_real())
}

fn describe_failures(errors: &[(String, AppError)]) -> Vec<String> {
    errors.iter().map(|(name, e)| format!("{name}: {e}")).collect()
}
