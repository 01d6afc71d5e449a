//! Runtime settings read from the environment (and `.env`).

use std::path::PathBuf;
use std::time::Duration;

use crate::data::cache::DEFAULT_TTL_SECS;
use crate::error::{AppError, ErrorKind};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Where measure documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    Dir(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: DataSource,
    pub cache_ttl: chrono::Duration,
    pub max_retries: u32,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: DataSource::Dir(PathBuf::from(DEFAULT_DATA_DIR)),
            cache_ttl: chrono::Duration::seconds(DEFAULT_TTL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Self::default();

        if let Some(url) = non_empty(lookup("INFLATION_DATA_URL")) {
            settings.source = DataSource::Url(url);
        } else if let Some(dir) = non_empty(lookup("INFLATION_DATA_DIR")) {
            settings.source = DataSource::Dir(PathBuf::from(dir));
        }

        if let Some(raw) = non_empty(lookup("INFLATION_CACHE_TTL_SECS")) {
            let secs: i64 = parse_number("INFLATION_CACHE_TTL_SECS", &raw)?;
            settings.cache_ttl = chrono::Duration::try_seconds(secs)
                .filter(|ttl| *ttl >= chrono::Duration::zero())
                .ok_or_else(|| AppError::new(ErrorKind::Config, "INFLATION_CACHE_TTL_SECS is out of range."))?;
        }
        if let Some(raw) = non_empty(lookup("INFLATION_MAX_RETRIES")) {
            settings.max_retries = parse_number("INFLATION_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("INFLATION_HTTP_TIMEOUT_SECS")) {
            settings.http_timeout = Duration::from_secs(parse_number("INFLATION_HTTP_TIMEOUT_SECS", &raw)?);
        }

        Ok(settings)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.parse::<T>()
        .map_err(|_| AppError::new(ErrorKind::Config, format!("Invalid {key} value '{raw}'.")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.cache_ttl, chrono::Duration::minutes(5));
    }

    #[test]
    fn url_wins_over_dir() {
        let settings = Settings::from_lookup(lookup(&[
            ("INFLATION_DATA_URL", "https://example.org/data"),
            ("INFLATION_DATA_DIR", "/tmp/data"),
            ("INFLATION_MAX_RETRIES", "1"),
        ]))
        .unwrap();
        assert_eq!(settings.source, DataSource::Url("https://example.org/data".to_string()));
        assert_eq!(settings.max_retries, 1);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = Settings::from_lookup(lookup(&[("INFLATION_CACHE_TTL_SECS", "soon")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
