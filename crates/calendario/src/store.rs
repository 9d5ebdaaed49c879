//! Remote schedule store: fetch the bounds of a schedule, submit the picks.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{ScheduleResponse, SubmitRequest};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid schedule id '{0}'")]
    InvalidId(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Backend holding schedules, keyed by id
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// `GET /{id}`
    async fn fetch_schedule(&self, id: &str) -> Result<ScheduleResponse, StoreError>;

    /// `POST /{id}` with the serialized selection; returns the backend's acknowledgment
    async fn submit_schedule(
        &self,
        id: &str,
        dates: &[String],
    ) -> Result<serde_json::Value, StoreError>;
}

/// Reject ids that cannot name a single path segment
pub fn check_id(id: &str) -> Result<(), StoreError> {
    match id {
        "" | "." | ".." => Err(StoreError::InvalidId(id.to_string())),
        _ => Ok(()),
    }
}

/// [`ScheduleStore`] over the REST backend
pub struct HttpScheduleStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScheduleStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, id: &str) -> Result<String, StoreError> {
        check_id(id)?;
        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(id)
        ))
    }

    /// Send a request and return the raw body of a successful response
    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<String, StoreError> {
        let request_error = |source: reqwest::Error| StoreError::Request {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(request_error)?;
        debug!(url = %url, status = %status, bytes = body.len(), "Backend responded");
        Ok(body)
    }
}

#[async_trait]
impl ScheduleStore for HttpScheduleStore {
    async fn fetch_schedule(&self, id: &str) -> Result<ScheduleResponse, StoreError> {
        let url = self.url(id)?;
        let body = self.send(&url, self.client.get(&url)).await?;
        serde_json::from_str(&body).map_err(|source| StoreError::Decode { url, source })
    }

    async fn submit_schedule(
        &self,
        id: &str,
        dates: &[String],
    ) -> Result<serde_json::Value, StoreError> {
        let url = self.url(id)?;
        let payload = SubmitRequest {
            selected_dates: dates.to_vec(),
        };
        let body = self
            .send(&url, self.client.post(&url).json(&payload))
            .await?;

        // The acknowledgment is opaque; an empty body is accepted as-is
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| StoreError::Decode { url, source })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::types::{Bounds, UsedDate};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory backend
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub(crate) schedules: HashMap<String, ScheduleResponse>,
        pub(crate) submitted: Mutex<Vec<(String, Vec<String>)>>,
        pub(crate) fetches: Mutex<usize>,
        pub(crate) fail: bool,
    }

    impl FakeStore {
        /// One schedule with 2024-01-16 already used
        pub(crate) fn with_schedule(id: &str, start: &str, end: &str, max: u32) -> Self {
            let mut store = Self::default();
            store.schedules.insert(
                id.to_string(),
                ScheduleResponse {
                    calendario: Some(Bounds {
                        date_start: Some(start.to_string()),
                        date_end: Some(end.to_string()),
                    }),
                    contador: max,
                    get_calendario: Some(vec![UsedDate {
                        date_ads: "2024-01-16".to_string(),
                    }]),
                },
            );
            store
        }

        pub(crate) fn submitted(&self) -> Vec<(String, Vec<String>)> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScheduleStore for FakeStore {
        async fn fetch_schedule(&self, id: &str) -> Result<ScheduleResponse, StoreError> {
            *self.fetches.lock().unwrap() += 1;
            if self.fail {
                return Err(StoreError::Status {
                    url: format!("http://backend.test/{}", id),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            Ok(self.schedules.get(id).cloned().unwrap_or(ScheduleResponse {
                calendario: None,
                contador: 0,
                get_calendario: None,
            }))
        }

        async fn submit_schedule(
            &self,
            id: &str,
            dates: &[String],
        ) -> Result<serde_json::Value, StoreError> {
            self.submitted
                .lock()
                .unwrap()
                .push((id.to_string(), dates.to_vec()));
            Ok(serde_json::json!({"ok": true}))
        }
    }
}
