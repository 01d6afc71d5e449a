//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during consensus and validation
//! - printed as JSON by the `infl` binary
//! - handed to a UI layer verbatim (flags and warnings included)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a series came from, fixed when the series is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Published by a recognized statistical agency or central bank.
    RealAgencyData,
    /// Produced from an average-rate pattern rather than observations.
    EstimatedPattern,
    /// Real data with gaps filled by linear interpolation.
    Interpolated,
    /// Converted from the simplified single-series CPI document.
    Legacy,
}

impl Provenance {
    pub fn is_real(self) -> bool {
        matches!(self, Provenance::RealAgencyData)
    }

    pub fn confidence(self) -> Confidence {
        match self {
            Provenance::RealAgencyData => Confidence::High,
            _ => Confidence::Medium,
        }
    }
}

/// Confidence label attached to each consensus contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    pub fn display_name(self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
        }
    }
}

/// One year of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub index_value: f64,
    /// Cumulative factor relative to an arbitrary base; only ratios matter.
    pub inflation_factor: f64,
    /// Percent change versus the previous year, when known.
    pub year_over_year_change: Option<f64>,
}

/// One named inflation measure for one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureSeries {
    pub currency: String,
    pub measure: String,
    pub source: Option<String>,
    pub last_updated: Option<String>,
    /// Nominal coverage; may disagree with the keys actually present.
    pub earliest_year: i32,
    pub latest_year: i32,
    pub points: BTreeMap<i32, DataPoint>,
    pub provenance: Provenance,
}

impl MeasureSeries {
    pub fn factor(&self, year: i32) -> Option<f64> {
        self.points.get(&year).map(|p| p.inflation_factor)
    }

    pub fn min_year(&self) -> Option<i32> {
        self.points.keys().next().copied()
    }

    pub fn max_year(&self) -> Option<i32> {
        self.points.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Loaded measures for one currency, keyed by measure name.
pub type MeasureMap = BTreeMap<String, MeasureSeries>;

/// Result of adjusting an amount with a single measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureCalculation {
    pub measure: String,
    pub adjusted_amount: f64,
    pub pct_change: f64,
    pub actual_from_year: i32,
    pub actual_to_year: i32,
}

/// A measure's share of the consensus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureContribution {
    pub measure: String,
    pub adjusted_amount: f64,
    pub pct_change: f64,
    /// Normalized so the reported weights sum to 1.
    pub weight: f64,
    pub confidence: Confidence,
    pub provenance: Provenance,
    pub actual_from_year: i32,
    pub actual_to_year: i32,
}

/// Weighted blend of several measures' adjustments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusResult {
    pub currency: String,
    pub amount: f64,
    pub adjusted_amount: f64,
    pub total_inflation_pct: f64,
    /// Compound annual rate as a fraction (0.03 = 3%).
    pub annualized_rate: f64,
    pub requested_from_year: i32,
    pub requested_to_year: i32,
    /// Years resolved by the first contributing measure.
    pub actual_from_year: i32,
    pub actual_to_year: i32,
    /// True when some contribution resolved different years than the canonical pair.
    pub coverage_mismatch: bool,
    /// Sorted by weight, heaviest first.
    pub measures: Vec<MeasureContribution>,
    /// Measures that could not be computed, with the reason.
    pub skipped: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierKind {
    /// Outside the fixed plausible band for annual inflation.
    Threshold,
    /// More than three standard deviations from the series mean.
    Statistical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub year: i32,
    pub value: f64,
    pub kind: OutlierKind,
    pub reason: String,
}

/// A run of consecutive missing years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub start: i32,
    pub end: i32,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationDetails {
    pub data_points: usize,
    pub missing_years: Vec<i32>,
    pub outliers: Vec<Outlier>,
    pub gaps: Vec<Gap>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// 0..=100.
    pub score: f64,
    pub details: ValidationDetails,
}

/// Per-currency roll-up of measure validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub currency: String,
    /// Mean score of the measures that validated; 0 when none did.
    pub overall_score: f64,
    pub valid_measures: usize,
    pub total_measures: usize,
    pub measures: BTreeMap<String, ValidationResult>,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Everything a recovery strategy may need to know about the failure site.
#[derive(Debug, Clone, Default)]
pub struct RecoveryContext {
    pub currency: String,
    pub measure: Option<String>,
    /// The series as loaded, when the failure was a validation failure.
    pub original: Option<MeasureSeries>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl RecoveryContext {
    pub fn for_currency(currency: impl Into<String>, max_retries: u32) -> Self {
        Self {
            currency: currency.into(),
            max_retries,
            ..Self::default()
        }
    }
}

/// Outcome of a recovery attempt. Never an error: failure is `success == false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryResult {
    pub success: bool,
    pub strategy: String,
    pub measures: MeasureMap,
    pub fallback_used: bool,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl RecoveryResult {
    pub fn recovered(strategy: &str, measures: MeasureMap, fallback_used: bool, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            strategy: strategy.to_string(),
            measures,
            fallback_used,
            warnings,
            error: None,
        }
    }

    pub fn failed(strategy: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            strategy: strategy.to_string(),
            measures: MeasureMap::new(),
            fallback_used: false,
            warnings: Vec::new(),
            error: Some(error.into()),
        }
    }
}
