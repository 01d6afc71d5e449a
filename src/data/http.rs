//! HTTP-backed blob store (`{base_url}/{stem}.json`).

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::data::blob::{BlobKey, BlobStore};
use crate::error::{AppError, ErrorKind};

pub struct HttpBlobStore {
    client: Client,
    base_url: String,
}

impl HttpBlobStore {
    /// The timeout doubles as the abort signal for slow fetches.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(ErrorKind::Config, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, key: &BlobKey) -> String {
        format!("{}/{}.json", self.base_url, key.stem())
    }
}

impl BlobStore for HttpBlobStore {
    fn fetch(&self, key: &BlobKey) -> Result<String, AppError> {
        let url = self.url_for(key);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::not_found(format!("Request for '{url}' failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("No document at '{url}'.")));
        }
        if !resp.status().is_success() {
            return Err(AppError::not_found(format!(
                "Request for '{url}' failed with status {}.",
                resp.status()
            )));
        }

        resp.text()
            .map_err(|e| AppError::not_found(format!("Failed to read body of '{url}': {e}")))
    }
}
