pub mod config;
pub mod http;
pub mod signal;
pub mod source;
pub mod types;

pub use config::{MarketFilter, SourceConfig, Thresholds};
pub use http::HttpMarketSource;
pub use signal::{classify_tier, score_signal, SignalBuilder};
pub use source::{MarketSource, SourceError, SourceResult};
pub use types::{Direction, MarketSignal, MarketSnapshot, Tier};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::http::*;
    pub use crate::signal::*;
    pub use crate::source::*;
    pub use crate::types::*;
}
