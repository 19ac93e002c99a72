//! HTTP adapter for one category collection.
//!
//! Wire contract:
//! - `GET {base}` -> `{ success, data?: SceneElement[], error? }`
//! - `POST {base}` with `{ <plural>: SceneElement[] }` (full replace)
//! - `DELETE {base}/clear`

use crate::config::RemoteEndpoint;
use crate::model::element::{Category, SceneElement};
use crate::remote::{check_fetched, CategoryStore, RemoteError, RemoteResult};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed `CategoryStore`.
#[derive(Debug, Clone)]
pub struct HttpCategoryStore {
    category: Category,
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpCategoryStore {
    /// Builds an adapter with a fresh HTTP client.
    pub fn new(category: Category, endpoint: &RemoteEndpoint) -> RemoteResult<Self> {
        Self::with_client(category, endpoint, Client::new())
    }

    /// Builds an adapter sharing an existing HTTP client.
    ///
    /// # Errors
    /// - `InvalidConfig` when a header name or value is not valid HTTP.
    pub fn with_client(
        category: Category,
        endpoint: &RemoteEndpoint,
        client: Client,
    ) -> RemoteResult<Self> {
        Ok(Self {
            category,
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            headers: build_headers(&endpoint.headers)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn clear_url(&self) -> String {
        format!("{}/clear", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> RemoteResult<ApiEnvelope<T>> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|err| RemoteError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        if !envelope.success {
            return Err(RemoteError::Rejected(
                envelope
                    .error
                    .unwrap_or_else(|| format!("{} request failed", self.category.plural_key())),
            ));
        }
        Ok(envelope)
    }

    fn log_outcome<T>(&self, op: &'static str, started_at: Instant, result: &RemoteResult<T>) {
        match result {
            Ok(_) => debug!(
                "event=remote_{} module=remote status=ok category={} duration_ms={}",
                op,
                self.category,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=remote_{} module=remote status=error category={} duration_ms={} error_code={} error={}",
                op,
                self.category,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
    }
}

#[async_trait]
impl CategoryStore for HttpCategoryStore {
    fn category(&self) -> Category {
        self.category
    }

    async fn fetch_all(&self) -> RemoteResult<Vec<SceneElement>> {
        let started_at = Instant::now();
        let result = self
            .send::<Vec<SceneElement>>(self.client.get(self.base_url.as_str()))
            .await
            .and_then(|envelope| check_fetched(self.category, envelope.data.unwrap_or_default()));
        self.log_outcome("fetch", started_at, &result);
        result
    }

    async fn save_all(&self, elements: &[SceneElement]) -> RemoteResult<()> {
        let started_at = Instant::now();
        let body = BTreeMap::from([(self.category.plural_key(), elements)]);
        let result = self
            .send::<serde_json::Value>(self.client.post(self.base_url.as_str()).json(&body))
            .await
            .map(|_| ());
        self.log_outcome("save", started_at, &result);
        result
    }

    async fn clear_all(&self) -> RemoteResult<()> {
        let started_at = Instant::now();
        let result = self
            .send::<serde_json::Value>(self.client.delete(self.clear_url()))
            .await
            .map(|_| ());
        self.log_outcome("clear", started_at, &result);
        result
    }
}

fn build_headers(headers: &BTreeMap<String, String>) -> RemoteResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| RemoteError::InvalidConfig(format!("invalid header name `{name}`")))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|_| RemoteError::InvalidConfig(format!("invalid value for header `{name}`")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
