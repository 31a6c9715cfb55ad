use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimums a market move must reach to be reported.
///
/// A move must clear all three WATCH values to be reported at all, and all
/// three ACTION values to be promoted to the ACTION tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub watch_vol_delta: f64,
    pub watch_price_pct: f64,
    pub watch_liq: f64,
    pub action_vol_delta: f64,
    pub action_price_pct: f64,
    pub action_liq: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            watch_vol_delta: 150.0,
            watch_price_pct: 1.2,
            watch_liq: 8_000.0,
            action_vol_delta: 600.0,
            action_price_pct: 3.0,
            action_liq: 20_000.0,
        }
    }
}

impl Thresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watch(mut self, vol_delta: f64, price_pct: f64, liq: f64) -> Self {
        self.watch_vol_delta = vol_delta;
        self.watch_price_pct = price_pct;
        self.watch_liq = liq;
        self
    }

    pub fn with_action(mut self, vol_delta: f64, price_pct: f64, liq: f64) -> Self {
        self.action_vol_delta = vol_delta;
        self.action_price_pct = price_pct;
        self.action_liq = liq;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("watch_vol_delta", self.watch_vol_delta),
            ("watch_price_pct", self.watch_price_pct),
            ("watch_liq", self.watch_liq),
            ("action_vol_delta", self.action_vol_delta),
            ("action_price_pct", self.action_price_pct),
            ("action_liq", self.action_liq),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number", name));
            }
        }

        if self.action_vol_delta < self.watch_vol_delta {
            return Err("action_vol_delta must be at least watch_vol_delta".to_string());
        }
        if self.action_price_pct < self.watch_price_pct {
            return Err("action_price_pct must be at least watch_price_pct".to_string());
        }
        if self.action_liq < self.watch_liq {
            return Err("action_liq must be at least watch_liq".to_string());
        }

        Ok(())
    }
}

/// Hygiene filters applied before a market is considered for a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFilter {
    /// Markets whose YES price is below this are treated as noise.
    pub min_price: f64,
    /// Markets whose YES price is above this are near-certain and ignored.
    pub max_price: f64,
    /// Ignore markets younger than this many hours. Zero disables the check.
    pub min_market_age_hours: f64,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            min_price: 0.02,
            max_price: 0.98,
            min_market_age_hours: 0.0,
        }
    }
}

impl MarketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price_range(mut self, min_price: f64, max_price: f64) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn with_min_market_age_hours(mut self, hours: f64) -> Self {
        self.min_market_age_hours = hours;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_price) || !(0.0..=1.0).contains(&self.max_price) {
            return Err("Price bounds must be between 0.0 and 1.0".to_string());
        }

        if self.min_price >= self.max_price {
            return Err("min_price must be lower than max_price".to_string());
        }

        if !self.min_market_age_hours.is_finite() || self.min_market_age_hours < 0.0 {
            return Err("min_market_age_hours must be a non-negative number".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub max_markets: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout: Duration::from_secs(25),
            max_markets: 250,
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_markets(mut self, max_markets: usize) -> Self {
        self.max_markets = max_markets;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Market endpoint cannot be empty; set POLY_ENDPOINT".to_string());
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(
                "Market endpoint (POLY_ENDPOINT) must start with http:// or https://".to_string(),
            );
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.max_markets == 0 {
            return Err("max_markets must be greater than 0".to_string());
        }

        Ok(())
    }
}
