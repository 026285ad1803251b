use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, PosBackend};
use crate::checkout::types::{Customer, CustomerDraft, Device, DeviceDraft, OrderDraft};
use crate::config::ApiConfig;
use crate::observability::api_metrics;

/// Rate-limited REST client for the POS API
pub struct HttpPosBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    search_cache: Cache<String, Value>,
}

impl std::fmt::Debug for HttpPosBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPosBackend")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpPosBackend {
    pub fn new(settings: &ApiConfig) -> Result<Self, BackendError> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(BackendError::Config {
                message: format!("api.base_url must be an http(s) URL, got '{}'", settings.base_url),
            });
        }

        let per_second = NonZeroU32::new(settings.requests_per_second).ok_or_else(|| {
            BackendError::Config {
                message: "api.requests_per_second must be at least 1".to_string(),
            }
        })?;
        let burst = NonZeroU32::new(settings.burst_capacity.max(1)).unwrap_or(per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(
            Quota::per_second(per_second).allow_burst(burst),
        ));

        let timeout = settings.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pos-checkout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Config {
                message: e.to_string(),
            })?;

        let search_cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(settings.search_cache_ttl_seconds))
            .build();

        Ok(Self {
            client,
            base_url,
            token: settings.token.clone().filter(|t| !t.trim().is_empty()),
            timeout,
            rate_limiter,
            search_cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the rendered invoice of a completed sale
    pub async fn download_invoice(&self, sale_id: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.url(&format!("/sales/{sale_id}/invoice"));
        let response = self.execute(self.client.get(&url)).await?;
        let bytes = response.bytes().await.map_err(|e| self.map_transport(e))?;
        info!(sale_id, bytes = bytes.len(), "Invoice downloaded");
        Ok(bytes.to_vec())
    }

    /// Clear the search cache (useful for testing or after write operations)
    pub fn clear_cache(&self) {
        self.search_cache.invalidate_all();
        debug!("Customer search cache cleared");
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Wait for rate limit permission, send, and turn non-2xx answers into errors
    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, BackendError> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(20)))
            .await;
        api_metrics().record_request();

        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            api_metrics().record_error();
            self.map_transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        api_metrics().record_error();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        warn!(status = status.as_u16(), message = %message, "POS API returned an error");
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.execute(request).await?;
        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn map_transport(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            BackendError::from(err)
        }
    }
}

/// Pull a human-readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
}

/// Customer records nest differently per endpoint; unwrap `data` if present
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn unwrap_list(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) => match map.remove(key).or_else(|| map.remove("data")) {
            Some(inner) => unwrap_list(inner, key),
            None => Value::Object(map),
        },
        other => other,
    }
}

#[async_trait]
impl PosBackend for HttpPosBackend {
    async fn search_customers(&self, phone: &str, limit: u32) -> Result<Value, BackendError> {
        let key = format!("{phone}|{limit}");
        if let Some(cached) = self.search_cache.get(&key).await {
            api_metrics().record_cache_hit();
            debug!(phone, "Customer search cache hit");
            return Ok(cached);
        }
        api_metrics().record_cache_miss();

        let limit = limit.to_string();
        let request = self
            .client
            .get(self.url("/customers/search"))
            .query(&[("phone", phone), ("limit", limit.as_str())]);
        let payload: Value = self.execute_json(request).await?;

        self.search_cache.insert(key, payload.clone()).await;
        Ok(payload)
    }

    async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, BackendError> {
        let request = self.client.post(self.url("/customers")).json(draft);
        let payload: Value = self.execute_json(request).await?;
        let customer: Customer = serde_json::from_value(unwrap_data(payload))?;

        // a new record changes what any cached search would return
        self.search_cache.invalidate_all();
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    async fn get_customer_devices(&self, customer_id: &str) -> Result<Vec<Device>, BackendError> {
        let request = self
            .client
            .get(self.url(&format!("/customers/{customer_id}/devices")));
        let payload: Value = self.execute_json(request).await?;
        Ok(serde_json::from_value(unwrap_list(payload, "devices"))?)
    }

    async fn create_device(&self, draft: &DeviceDraft) -> Result<Device, BackendError> {
        let request = self.client.post(self.url("/devices")).json(draft);
        let payload: Value = self.execute_json(request).await?;
        let device: Device = serde_json::from_value(unwrap_data(payload))?;
        info!(device_id = %device.id, customer_id = %draft.customer_id, "Device created");
        Ok(device)
    }

    async fn complete_payment(&self, order: &OrderDraft) -> Result<Value, BackendError> {
        let request = self.client.post(self.url("/sales")).json(order);
        self.execute_json(request).await
    }
}
