//! Compiled-in measure weights and per-currency estimation parameters.

use std::collections::BTreeMap;

/// `MEASURE_WEIGHTS[currency][measure]`. Weights need not sum to exactly 1;
/// consensus normalizes by whatever weight is actually available.
const MEASURE_WEIGHTS: &[(&str, &[(&str, f64)])] = &[
    (
        "USD",
        &[
            ("cpi", 0.30),
            ("core_cpi", 0.20),
            ("pce", 0.20),
            ("core_pce", 0.15),
            ("gdp_deflator", 0.10),
            ("ppi", 0.05),
        ],
    ),
    (
        "GBP",
        &[
            ("cpi", 0.35),
            ("cpih", 0.25),
            ("core_cpi", 0.15),
            ("rpi", 0.15),
            ("gdp_deflator", 0.10),
        ],
    ),
    (
        "EUR",
        &[
            ("hicp", 0.40),
            ("core_hicp", 0.25),
            ("gdp_deflator", 0.15),
            ("services_hicp", 0.10),
            ("ppi", 0.10),
        ],
    ),
    (
        "CAD",
        &[
            ("cpi", 0.35),
            ("cpi_trim", 0.20),
            ("cpi_median", 0.20),
            ("core_cpi", 0.15),
            ("gdp_deflator", 0.10),
        ],
    ),
    (
        "CHF",
        &[
            ("cpi", 0.40),
            ("core_cpi", 0.30),
            ("gdp_deflator", 0.10),
            ("import_prices", 0.10),
            ("ppi", 0.10),
        ],
    ),
    (
        "JPY",
        &[
            ("cpi", 0.35),
            ("core_cpi", 0.25),
            ("core_core_cpi", 0.20),
            ("gdp_deflator", 0.10),
            ("ppi", 0.10),
        ],
    ),
    (
        "AUD",
        &[
            ("cpi", 0.35),
            ("trimmed_mean", 0.25),
            ("weighted_median", 0.20),
            ("gdp_deflator", 0.10),
            ("ppi", 0.10),
        ],
    ),
    (
        "NZD",
        &[
            ("cpi", 0.40),
            ("core_cpi", 0.25),
            ("sectoral_factor", 0.15),
            ("gdp_deflator", 0.10),
            ("ppi", 0.10),
        ],
    ),
];

/// First year of data and long-run average annual inflation, per currency.
const ESTIMATION_PARAMS: &[(&str, i32, f64)] = &[
    ("USD", 1913, 0.031),
    ("GBP", 1947, 0.050),
    ("EUR", 1996, 0.021),
    ("CAD", 1914, 0.030),
    ("CHF", 1914, 0.022),
    ("JPY", 1946, 0.028),
    ("AUD", 1948, 0.045),
    ("NZD", 1914, 0.037),
];

const DEFAULT_START_YEAR: i32 = 1950;
const DEFAULT_AVERAGE_RATE: f64 = 0.030;

/// Measure weights for a single currency.
pub type CurrencyWeights = BTreeMap<String, f64>;

/// Per-currency weight tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    currencies: BTreeMap<String, CurrencyWeights>,
}

impl WeightTable {
    /// The compiled-in table covering the eight supported currencies.
    pub fn builtin() -> Self {
        let currencies = MEASURE_WEIGHTS
            .iter()
            .map(|(currency, measures)| {
                let weights = measures
                    .iter()
                    .map(|(name, w)| (name.to_string(), *w))
                    .collect();
                (currency.to_string(), weights)
            })
            .collect();
        Self { currencies }
    }

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by callers (and tests) that blend a custom set of measures.
    pub fn with_currency<I, S>(mut self, currency: &str, weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let weights = weights.into_iter().map(|(m, w)| (m.into(), w)).collect();
        self.currencies.insert(normalize_currency(currency), weights);
        self
    }

    pub fn for_currency(&self, currency: &str) -> Option<&CurrencyWeights> {
        self.currencies.get(&normalize_currency(currency))
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.for_currency(currency).is_some()
    }

    /// Heaviest measure for `currency` (ties broken by name).
    pub fn primary_measure(&self, currency: &str) -> Option<&str> {
        self.for_currency(currency)?
            .iter()
            .max_by(|a, b| {
                a.1.partial_cmp(b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(name, _)| name.as_str())
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.currencies.keys().map(String::as_str)
    }
}

pub fn normalize_currency(currency: &str) -> String {
    currency.trim().to_ascii_uppercase()
}

/// First year synthetic data should cover for `currency`.
pub fn start_year(currency: &str) -> i32 {
    estimation_params(currency).map_or(DEFAULT_START_YEAR, |(y, _)| y)
}

/// Long-run average annual inflation (fraction) used for estimated series.
pub fn average_inflation_rate(currency: &str) -> f64 {
    estimation_params(currency).map_or(DEFAULT_AVERAGE_RATE, |(_, r)| r)
}

fn estimation_params(currency: &str) -> Option<(i32, f64)> {
    let currency = normalize_currency(currency);
    ESTIMATION_PARAMS
        .iter()
        .find(|(c, _, _)| *c == currency)
        .map(|(_, y, r)| (*y, *r))
}
