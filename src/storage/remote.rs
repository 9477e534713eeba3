//! HTTP-backed storage talking to the share backend (`/api/share`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{StorageError, StorageProvider};
use crate::config::StorageConfig;
use crate::util::sleep;

#[derive(Serialize)]
struct SaveRequest<'a> {
    key: &'a str,
    data: &'a Value,
}

#[derive(Deserialize)]
struct SaveResponse {
    id: String,
}

#[derive(Deserialize)]
struct LoadResponse {
    #[serde(default)]
    data: Value,
}

enum Fetched {
    Found(Option<Value>),
    NotYetVisible,
}

/// Storage provider backed by the remote share API.
///
/// Freshly written keys may take a while to propagate through the backing
/// store, so reads treat a 404 as "not visible yet" and poll with linear
/// backoff before giving up.
#[derive(Debug, Clone)]
pub struct RemoteStorage {
    client: reqwest::Client,
    base_url: Url,
    max_read_retries: u32,
    read_retry_delay: Duration,
}

impl RemoteStorage {
    pub fn new(
        base_url: &str,
        max_read_retries: u32,
        read_retry_delay: Duration,
    ) -> Result<Self, StorageError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StorageError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            max_read_retries,
            read_retry_delay,
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(
            &config.api_base_url,
            config.max_read_retries,
            config.read_retry_delay,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch(&self, key: &str) -> Result<Fetched, StorageError> {
        let mut url = self.endpoint(&["api", "share", key])?;
        url.query_pairs_mut()
            .append_pair("t", &chrono::Utc::now().timestamp_millis().to_string());

        let response = self
            .client
            .get(url)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Fetched::NotYetVisible),
            status if status.is_success() => {
                let body: LoadResponse = response.json().await?;
                Ok(Fetched::Found(match body.data {
                    Value::Null => None,
                    data => Some(data),
                }))
            }
            status => Err(StorageError::Http {
                operation: "Load",
                status,
            }),
        }
    }

    async fn post(&self, key: &str, data: &Value) -> Result<String, StorageError> {
        let url = self.endpoint(&["api", "share"])?;
        let response = self
            .client
            .post(url)
            .json(&SaveRequest { key, data })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Http {
                operation: "Save",
                status,
            });
        }

        let body: SaveResponse = response.json().await?;
        Ok(body.id)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.read_retry_delay * (attempt + 1)
    }
}

#[async_trait]
impl StorageProvider for RemoteStorage {
    async fn save(&self, key: &str, data: &Value) -> Result<String, StorageError> {
        let result = self.post(key, data).await;
        if let Err(e) = &result {
            tracing::error!(key = %key, error = %e, "Remote share save failed");
        }
        result
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut attempt = 0;
        loop {
            let is_last = attempt >= self.max_read_retries;
            match self.fetch(key).await {
                Ok(Fetched::Found(data)) => return Ok(data),
                Ok(Fetched::NotYetVisible) if is_last => {
                    tracing::debug!(key = %key, attempts = attempt + 1, "Share not found");
                    return Ok(None);
                }
                Ok(Fetched::NotYetVisible) => {
                    tracing::debug!(key = %key, attempt, "Share not visible yet, polling");
                }
                Err(e) if is_last => {
                    tracing::error!(key = %key, error = %e, "Remote share load failed");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(key = %key, attempt, error = %e, "Remote share load failed, retrying");
                }
            }

            sleep(self.backoff(attempt)).await;
            attempt += 1;
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
