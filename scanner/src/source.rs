use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No market endpoint configured; set POLY_ENDPOINT to a JSON endpoint returning market data")]
    NotConfigured,

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Unexpected response shape: {message}")]
    UnexpectedShape { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Market feed error ({status}): {body}")]
    Http { status: u16, body: String },
}

impl SourceError {
    /// Short variant name, used when reporting the error to a chat.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Network(_) => "Network",
            SourceError::Serialization(_) => "Serialization",
            SourceError::NotConfigured => "NotConfigured",
            SourceError::InvalidConfig { .. } => "InvalidConfig",
            SourceError::UnexpectedShape { .. } => "UnexpectedShape",
            SourceError::ServiceUnavailable { .. } => "ServiceUnavailable",
            SourceError::RateLimit => "RateLimit",
            SourceError::Http { .. } => "Http",
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Anything that can produce a batch of raw market records.
///
/// Records are returned as loose JSON and normalised later by
/// [`MarketSnapshot::from_json`](crate::types::MarketSnapshot::from_json), so
/// sources do not need to agree on field names.
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn fetch_markets(&self) -> SourceResult<Vec<Value>>;

    async fn health_check(&self) -> SourceResult<()>;

    fn source_name(&self) -> &'static str;
}
