//! Single-measure loading: fetch one blob and turn it into a typed `MeasureSeries`.
//!
//! Parsing is strict about shape (year keys must be integers, numbers must be
//! numbers) but performs no quality checks; those live in `quality`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::data::blob::{BlobKey, BlobStore};
use crate::data::weights::normalize_currency;
use crate::domain::{DataPoint, MeasureSeries, Provenance};
use crate::error::AppError;

/// Source-string markers of statistical agencies and central banks.
const AGENCY_MARKERS: &[&str] = &[
    "FRED",
    "BLS",
    "BEA",
    "Bureau of Labor Statistics",
    "ONS",
    "Office for National Statistics",
    "Eurostat",
    "ECB",
    "Statistics Canada",
    "StatCan",
    "Bank of Canada",
    "SNB",
    "Swiss National Bank",
    "FSO",
    "Statistics Bureau",
    "e-Stat",
    "ABS",
    "Australian Bureau of Statistics",
    "RBA",
    "Stats NZ",
    "RBNZ",
    "OECD",
    "IMF",
];

/// Measure name for single-series fallbacks when the currency has no weight table.
pub const LEGACY_MEASURE: &str = "cpi";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasureDocument {
    currency: Option<String>,
    measure: Option<String>,
    source: Option<String>,
    last_updated: Option<String>,
    earliest_year: Option<i32>,
    latest_year: Option<i32>,
    #[serde(alias = "points")]
    data: BTreeMap<String, PointDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointDocument {
    #[serde(default)]
    index_value: Option<f64>,
    inflation_factor: f64,
    #[serde(default)]
    year_over_year_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDocument {
    data: BTreeMap<String, f64>,
    source: Option<String>,
    last_updated: Option<String>,
    earliest: Option<i32>,
    latest: Option<i32>,
}

/// Loads individual measures from a blob store.
#[derive(Clone)]
pub struct MeasureStore {
    blobs: Arc<dyn BlobStore>,
}

impl MeasureStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn load(&self, currency: &str, measure: &str) -> Result<MeasureSeries, AppError> {
        let key = BlobKey::measure(currency, measure);
        let body = self.blobs.fetch(&key)?;
        let series = parse_measure(&body, currency, measure)?;
        debug!(currency, measure, points = series.len(), "loaded measure");
        Ok(series)
    }

    /// Load the simplified CPI-only document for `currency`, naming it `measure`.
    pub fn load_legacy(&self, currency: &str, measure: &str) -> Result<MeasureSeries, AppError> {
        let key = BlobKey::legacy(currency);
        let body = self.blobs.fetch(&key)?;
        parse_legacy(&body, currency, measure)
    }
}

/// Parse a measure document. Missing `currency`/`measure` fields fall back to the requested key.
pub fn parse_measure(body: &str, currency: &str, measure: &str) -> Result<MeasureSeries, AppError> {
    let doc: MeasureDocument = serde_json::from_str(body)
        .map_err(|e| AppError::malformed(format!("Invalid document for {currency}/{measure}: {e}")))?;

    let mut points = BTreeMap::new();
    for (raw_year, p) in doc.data {
        let year = parse_year(&raw_year, currency, measure)?;
        points.insert(
            year,
            DataPoint {
                index_value: p.index_value.unwrap_or(p.inflation_factor * 100.0),
                inflation_factor: p.inflation_factor,
                year_over_year_change: p.year_over_year_change,
            },
        );
    }

    let (min_year, max_year) = key_bounds(&points);
    let provenance = classify_source(doc.source.as_deref());

    Ok(MeasureSeries {
        currency: doc
            .currency
            .map(|c| normalize_currency(&c))
            .unwrap_or_else(|| normalize_currency(currency)),
        measure: doc.measure.unwrap_or_else(|| measure.to_string()),
        source: doc.source,
        last_updated: doc.last_updated,
        earliest_year: doc.earliest_year.unwrap_or(min_year),
        latest_year: doc.latest_year.unwrap_or(max_year),
        points,
        provenance,
    })
}

/// Parse the legacy `{ data: { year: factor } }` document into the standard shape.
pub fn parse_legacy(body: &str, currency: &str, measure: &str) -> Result<MeasureSeries, AppError> {
    let doc: LegacyDocument = serde_json::from_str(body)
        .map_err(|e| AppError::malformed(format!("Invalid legacy document for {currency}: {e}")))?;

    let mut factors = BTreeMap::new();
    for (raw_year, factor) in doc.data {
        factors.insert(parse_year(&raw_year, currency, measure)?, factor);
    }

    let mut points = BTreeMap::new();
    let mut prev: Option<(i32, f64)> = None;
    for (&year, &factor) in &factors {
        // Only consecutive years yield a year-over-year figure.
        let yoy = match prev {
            Some((prev_year, prev_factor)) if prev_year + 1 == year && prev_factor > 0.0 => {
                Some((factor / prev_factor - 1.0) * 100.0)
            }
            _ => None,
        };
        points.insert(
            year,
            DataPoint {
                index_value: factor * 100.0,
                inflation_factor: factor,
                year_over_year_change: yoy,
            },
        );
        prev = Some((year, factor));
    }

    let (min_year, max_year) = key_bounds(&points);

    Ok(MeasureSeries {
        currency: normalize_currency(currency),
        measure: measure.to_string(),
        source: doc.source,
        last_updated: doc.last_updated,
        earliest_year: doc.earliest.unwrap_or(min_year),
        latest_year: doc.latest.unwrap_or(max_year),
        points,
        provenance: Provenance::Legacy,
    })
}

/// Tag a freshly loaded series by its declared source.
///
/// Markers match whole words only, so "ABS" does not match "absolute".
pub fn classify_source(source: Option<&str>) -> Provenance {
    let Some(source) = source else {
        return Provenance::EstimatedPattern;
    };
    let tokens = words(source);
    let recognized = AGENCY_MARKERS.iter().any(|marker| {
        let marker = words(marker);
        !marker.is_empty() && tokens.windows(marker.len()).any(|w| w == marker.as_slice())
    });
    if recognized {
        Provenance::RealAgencyData
    } else {
        Provenance::EstimatedPattern
    }
}

/// Upper-cased alphanumeric runs of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

fn parse_year(raw: &str, currency: &str, measure: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::malformed(format!("Invalid year key '{raw}' in {currency}/{measure}.")))
}

fn key_bounds(points: &BTreeMap<i32, DataPoint>) -> (i32, i32) {
    let min = points.keys().next().copied().unwrap_or(0);
    let max = points.keys().next_back().copied().unwrap_or(0);
    (min, max)
}
