//! HTTP adapter for `live` mode sources
//!
//! Talks to an extraction service that exposes one JSON document per
//! (entity, signal type):
//!
//! ```text
//! GET {base_url}/entities/{entity_id}/signals/{signal_type}
//! Authorization: Bearer {api_key}
//!
//! 200 {"payload": {...}, "confidence": 0.85}
//! ```

use crate::{SourceAdapter, SourceError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use trustlens_domain::{now_millis, EntityId, SignalResult, SignalType, SourceId};

/// Default confidence when the service omits one
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

#[derive(Deserialize)]
struct SignalResponse {
    payload: serde_json::Value,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Fetches signals from a JSON-over-HTTP extraction service
#[derive(Debug, Clone)]
pub struct HttpJsonAdapter {
    source_id: SourceId,
    base_url: String,
    api_key: Option<String>,
    cost_per_call: f64,
    client: reqwest::Client,
}

impl HttpJsonAdapter {
    /// Create an adapter for `base_url`
    pub fn new(source_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            source_id: SourceId::new(source_id),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            cost_per_call: 0.0,
            client: reqwest::Client::new(),
        }
    }

    /// Send a bearer token with each request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Cost reported per call
    pub fn with_cost(mut self, cost_per_call: f64) -> Self {
        self.cost_per_call = cost_per_call;
        self
    }

    /// Request URL for one signal
    pub fn url(&self, entity_id: &EntityId, signal_type: SignalType) -> String {
        format!(
            "{}/entities/{}/signals/{}",
            self.base_url, entity_id, signal_type
        )
    }
}

/// Map a non-success HTTP status onto the source error taxonomy
pub fn classify_status(status: StatusCode, body: &str) -> SourceError {
    let detail = format!("HTTP {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Auth(detail),
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => SourceError::Extraction(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            SourceError::Transient(detail)
        }
        s if s.is_server_error() => SourceError::Transient(detail),
        _ => SourceError::Config(detail),
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonAdapter {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    async fn fetch(
        &self,
        entity_id: &EntityId,
        signal_type: SignalType,
        timeout: Duration,
    ) -> Result<SignalResult, SourceError> {
        let url = self.url(entity_id, signal_type);
        debug!("GET {}", url);

        let mut request = self.client.get(&url).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(timeout.as_millis() as u64)
            } else if e.is_builder() {
                SourceError::Config(format!("bad request for {}: {}", url, e))
            } else {
                SourceError::Transient(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &body));
        }

        let body: SignalResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Extraction(format!("invalid response from {}: {}", url, e)))?;

        Ok(SignalResult::live(
            self.source_id.clone(),
            entity_id.clone(),
            signal_type,
            body.payload,
            body.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            now_millis(),
        ))
    }

    fn cost_per_call(&self) -> f64 {
        self.cost_per_call
    }
}
