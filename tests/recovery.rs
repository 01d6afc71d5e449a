mod common;

use std::sync::Arc;

use inflation_measures::clock::ManualClock;
use inflation_measures::data::{BlobKey, DirBlobStore, MeasureAggregator, MeasureCache, MeasureStore, WeightTable};
use inflation_measures::domain::{Provenance, RecoveryContext};
use inflation_measures::error::{AppError, ErrorKind};
use inflation_measures::recovery::{ALL_FAILED, NoBackoff, RecoveryEngine};
use inflation_measures::{MeasurePipeline, PipelineOptions};

use common::{anchored, harness, insert_usd_pair, legacy_doc, measure_doc, now, usd_pair_weights};

#[test]
fn retry_refetches_the_failed_measure() {
    let h = harness(usd_pair_weights(), 2);
    insert_usd_pair(&h.store);

    let ctx = RecoveryContext {
        measure: Some("cpi".to_string()),
        ..RecoveryContext::for_currency("USD", 2)
    };
    let result = h
        .pipeline
        .recover_from_data_error(&AppError::not_found("transient"), &ctx);

    assert!(result.success);
    assert_eq!(result.strategy, "retry");
    assert!(!result.fallback_used);
    assert_eq!(result.measures.keys().collect::<Vec<_>>(), vec!["cpi"]);
    assert_eq!(result.warnings, vec!["Data loaded after 1 retry attempt(s)".to_string()]);
    assert_eq!(*h.backoff.attempts.lock().unwrap(), vec![0]);
}

#[test]
fn exhausted_retry_budget_moves_on_to_legacy() {
    let h = harness(usd_pair_weights(), 2);
    h.store
        .insert(&BlobKey::legacy("USD"), legacy_doc(&anchored(2000..=2023, 2000, 2023, 1.8)));

    let ctx = RecoveryContext {
        retry_count: 2,
        ..RecoveryContext::for_currency("USD", 2)
    };
    let result = h
        .pipeline
        .recover_from_data_error(&AppError::new(ErrorKind::MalformedData, "bad json"), &ctx);

    assert_eq!(result.strategy, "legacy_data");
    assert!(h.backoff.attempts.lock().unwrap().is_empty());
    assert_eq!(result.measures["cpi"].provenance, Provenance::Legacy);
}

#[test]
fn recovery_reports_failure_instead_of_raising() {
    let h = harness(usd_pair_weights(), 1);
    let errors = [
        AppError::not_found("gone"),
        AppError::malformed("bad"),
        AppError::unknown_currency("ZZZ"),
        AppError::new(ErrorKind::NoValidMeasures, "none"),
        AppError::validation("bad series"),
        AppError::calculation("boom"),
    ];
    for currency in ["USD", "ZZZ", ""] {
        for error in &errors {
            let result = h
                .pipeline
                .recover_from_data_error(error, &RecoveryContext::for_currency(currency, 1));
            // Estimated data is always available as the last resort.
            assert!(result.success, "{currency} / {error}");
            assert_eq!(result.error, None);
        }
    }

    let empty = RecoveryEngine::new(Vec::new());
    let result = empty.recover(&AppError::not_found("gone"), &RecoveryContext::default());
    assert!(!result.success);
    assert_eq!(result.strategy, ALL_FAILED);
    assert!(result.measures.is_empty());
}

#[test]
fn load_all_rejects_currency_without_valid_measures() {
    let clock = Arc::new(ManualClock::new(now()));
    let blobs = Arc::new(inflation_measures::data::MemoryBlobStore::new());
    let aggregator = MeasureAggregator::new(
        MeasureStore::new(blobs.clone()),
        Arc::new(usd_pair_weights()),
        clock,
    );

    let err = aggregator.load_all("USD").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoValidMeasures);

    let report = aggregator.load_report("USD").unwrap();
    assert!(report.measures.is_empty());
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors.iter().all(|(_, e)| e.kind() == ErrorKind::NotFound));

    blobs.insert(&BlobKey::measure("USD", "cpi"), "{ not json");
    let report = aggregator.load_report("USD").unwrap();
    let cpi_error = report.errors.iter().find(|(name, _)| name == "cpi").unwrap();
    assert_eq!(cpi_error.1.kind(), ErrorKind::MalformedData);

    let err = aggregator.load_all("ZZZ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownCurrency);
}

#[test]
fn directory_store_feeds_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("usd-cpi.json"),
        measure_doc("USD", "cpi", "BLS CPI-U", &anchored(2010..=2023, 2015, 2023, 1.25)),
    )
    .unwrap();

    let clock = Arc::new(ManualClock::new(now()));
    let cache = Arc::new(MeasureCache::new(chrono::Duration::minutes(5), clock.clone()));
    let pipeline = MeasurePipeline::new(
        Arc::new(DirBlobStore::new(dir.path())),
        cache,
        clock,
        PipelineOptions {
            weights: WeightTable::builtin(),
            max_retries: 0,
            backoff: Arc::new(NoBackoff),
        },
    );

    let outcome = pipeline.load_currency_measures_with_fallback("USD").unwrap();
    assert!(outcome.has_real_data);
    assert_eq!(outcome.measures.len(), 1);
    // Five builtin USD measures have no file.
    assert_eq!(outcome.warnings.len(), 5);

    let result = pipeline
        .calculate_consensus_inflation(&outcome.measures, "USD", 2015, 2023, 200.0)
        .unwrap();
    assert!((result.adjusted_amount - 250.0).abs() < 1e-9);
    assert!((result.measures[0].weight - 1.0).abs() < 1e-12);
}
