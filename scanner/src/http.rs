use crate::config::SourceConfig;
use crate::source::{MarketSource, SourceError, SourceResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Market source backed by a plain JSON endpoint.
///
/// The endpoint may return either a bare array of market records or an
/// object wrapping them under `markets`.
pub struct HttpMarketSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl HttpMarketSource {
    pub fn new(config: SourceConfig) -> SourceResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(SourceError::NotConfigured);
        }

        config
            .validate()
            .map_err(|message| SourceError::InvalidConfig { message })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn handle_http_error(err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            SourceError::ServiceUnavailable {
                message: "Cannot connect to market endpoint".to_string(),
            }
        } else {
            SourceError::Network(err)
        }
    }

    fn status_error(status: reqwest::StatusCode, body: String) -> SourceError {
        match status.as_u16() {
            429 => SourceError::RateLimit,
            503 => SourceError::ServiceUnavailable {
                message: "Market endpoint unavailable".to_string(),
            },
            code => SourceError::Http { status: code, body },
        }
    }

    /// Pull the record list out of a decoded response body.
    fn extract_markets(body: Value, limit: usize) -> SourceResult<Vec<Value>> {
        let mut markets = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("markets") {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(SourceError::UnexpectedShape {
                        message: "\"markets\" is not an array".to_string(),
                    })
                }
                None => {
                    return Err(SourceError::UnexpectedShape {
                        message: "object without a \"markets\" field".to_string(),
                    })
                }
            },
            other => {
                return Err(SourceError::UnexpectedShape {
                    message: format!("expected an array or object, got {}", json_kind(&other)),
                })
            }
        };

        markets.truncate(limit);
        Ok(markets)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl MarketSource for HttpMarketSource {
    async fn fetch_markets(&self) -> SourceResult<Vec<Value>> {
        let started = Instant::now();
        debug!("Fetching markets from {}", self.config.endpoint);

        let response = self
            .client
            .get(&self.config.endpoint)
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Market endpoint returned {}", status);
            return Err(Self::status_error(status, body));
        }

        let bytes = response.bytes().await.map_err(Self::handle_http_error)?;
        let body: Value = serde_json::from_slice(&bytes)?;
        let markets = Self::extract_markets(body, self.config.max_markets)?;

        debug!(
            count = markets.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched markets"
        );
        Ok(markets)
    }

    async fn health_check(&self) -> SourceResult<()> {
        self.fetch_markets().await.map(|_| ())
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
