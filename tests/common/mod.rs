#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use inflation_measures::clock::ManualClock;
use inflation_measures::data::{BlobKey, MeasureCache, MemoryBlobStore, WeightTable};
use inflation_measures::recovery::Backoff;
use inflation_measures::{MeasurePipeline, PipelineOptions};
use serde_json::{Map, Value, json};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// Factors growing geometrically so that `base_year` is 1.0 and `end_year` is `end_factor`.
pub fn anchored(years: impl Iterator<Item = i32>, base_year: i32, end_year: i32, end_factor: f64) -> Vec<(i32, f64)> {
    let span = (end_year - base_year) as f64;
    years
        .map(|y| (y, end_factor.powf((y - base_year) as f64 / span)))
        .collect()
}

/// A measure document with a constant, integer-valued year-over-year change
/// so the statistical outlier pass sees zero variance.
pub fn measure_doc(currency: &str, measure: &str, source: &str, factors: &[(i32, f64)]) -> String {
    let mut data = Map::new();
    for (i, (year, factor)) in factors.iter().enumerate() {
        let yoy = if i == 0 { Value::Null } else { json!(2.0) };
        data.insert(
            year.to_string(),
            json!({ "indexValue": factor * 100.0, "inflationFactor": factor, "yearOverYearChange": yoy }),
        );
    }
    json!({
        "currency": currency,
        "measure": measure,
        "source": source,
        "lastUpdated": "2024-05-01",
        "earliestYear": factors.first().map(|p| p.0),
        "latestYear": factors.last().map(|p| p.0),
        "data": data,
    })
    .to_string()
}

pub fn legacy_doc(factors: &[(i32, f64)]) -> String {
    let data: Map<String, Value> = factors.iter().map(|(y, f)| (y.to_string(), json!(f))).collect();
    json!({
        "data": data,
        "source": "BLS CPI-U (legacy)",
        "lastUpdated": "2024-05-01",
        "earliest": factors.first().map(|p| p.0),
        "latest": factors.last().map(|p| p.0),
    })
    .to_string()
}

/// Records every backoff request instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingBackoff {
    pub attempts: Mutex<Vec<u32>>,
}

impl Backoff for RecordingBackoff {
    fn wait(&self, attempt: u32) {
        self.attempts.lock().unwrap().push(attempt);
    }
}

pub struct Harness {
    pub store: Arc<MemoryBlobStore>,
    pub clock: Arc<ManualClock>,
    pub backoff: Arc<RecordingBackoff>,
    pub pipeline: MeasurePipeline,
}

pub fn harness(weights: WeightTable, max_retries: u32) -> Harness {
    let store = Arc::new(MemoryBlobStore::new());
    let clock = Arc::new(ManualClock::new(now()));
    let backoff = Arc::new(RecordingBackoff::default());
    let cache = Arc::new(MeasureCache::new(chrono::Duration::minutes(5), clock.clone()));
    let pipeline = MeasurePipeline::new(
        store.clone(),
        cache,
        clock.clone(),
        PipelineOptions {
            weights,
            max_retries,
            backoff: backoff.clone(),
        },
    );
    Harness {
        store,
        clock,
        backoff,
        pipeline,
    }
}

pub fn usd_pair_weights() -> WeightTable {
    WeightTable::new().with_currency("USD", [("cpi", 0.6), ("core_cpi", 0.4)])
}

pub fn insert_usd_pair(store: &MemoryBlobStore) {
    store.insert(
        &BlobKey::measure("USD", "cpi"),
        measure_doc("USD", "cpi", "FRED CPIAUCSL", &anchored(2010..=2023, 2015, 2023, 1.25)),
    );
    store.insert(
        &BlobKey::measure("USD", "core_cpi"),
        measure_doc("USD", "core_cpi", "FRED CPILFESL", &anchored(2010..=2023, 2015, 2023, 1.20)),
    );
}
