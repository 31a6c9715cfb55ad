//! Runtime settings.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! process environment variables. File keys are the lowercase form of the
//! environment names (`poll_seconds`, `telegram_chat_id`, ...).

use crate::cooldown::AlertPolicy;
use crate::notifier::TelegramConfig;
use scanner::{MarketFilter, SourceConfig, Thresholds};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const POLL_SECONDS: &str = "POLL_SECONDS";
pub const MAX_MARKETS_PER_SCAN: &str = "MAX_MARKETS_PER_SCAN";
pub const WATCH_VOL_DELTA: &str = "WATCH_VOL_DELTA";
pub const WATCH_PRICE_PCT: &str = "WATCH_PRICE_PCT";
pub const WATCH_LIQ: &str = "WATCH_LIQ";
pub const ACTION_VOL_DELTA: &str = "ACTION_VOL_DELTA";
pub const ACTION_PRICE_PCT: &str = "ACTION_PRICE_PCT";
pub const ACTION_LIQ: &str = "ACTION_LIQ";
pub const MIN_PRICE: &str = "MIN_PRICE";
pub const MAX_PRICE: &str = "MAX_PRICE";
pub const MIN_MARKET_AGE_HOURS: &str = "MIN_MARKET_AGE_HOURS";
pub const COOLDOWN_MINUTES: &str = "COOLDOWN_MINUTES";
pub const IMPROVEMENT_RATIO_TO_RESEND: &str = "IMPROVEMENT_RATIO_TO_RESEND";
pub const MAX_ALERTS_PER_SCAN: &str = "MAX_ALERTS_PER_SCAN";
pub const HEARTBEAT_EVERY_MIN: &str = "HEARTBEAT_EVERY_MIN";
pub const POLY_ENDPOINT: &str = "POLY_ENDPOINT";
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const TELEGRAM_API_BASE: &str = "TELEGRAM_API_BASE";

const KNOWN_KEYS: &[&str] = &[
    POLL_SECONDS,
    MAX_MARKETS_PER_SCAN,
    WATCH_VOL_DELTA,
    WATCH_PRICE_PCT,
    WATCH_LIQ,
    ACTION_VOL_DELTA,
    ACTION_PRICE_PCT,
    ACTION_LIQ,
    MIN_PRICE,
    MAX_PRICE,
    MIN_MARKET_AGE_HOURS,
    COOLDOWN_MINUTES,
    IMPROVEMENT_RATIO_TO_RESEND,
    MAX_ALERTS_PER_SCAN,
    HEARTBEAT_EVERY_MIN,
    POLY_ENDPOINT,
    TELEGRAM_BOT_TOKEN,
    TELEGRAM_CHAT_ID,
    TELEGRAM_API_BASE,
];

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Missing {name} (set it in the environment or the config file)")]
    MissingVariable { name: &'static str },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid settings: {message}")]
    Invalid { message: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub telegram: TelegramConfig,
    pub source: SourceConfig,
    pub thresholds: Thresholds,
    pub filter: MarketFilter,
    pub policy: AlertPolicy,
    pub poll_interval: Duration,
    pub max_alerts_per_scan: usize,
    /// `None` disables the heartbeat message.
    pub heartbeat_every: Option<Duration>,
}

impl BotSettings {
    /// Defaults for everything except the Telegram credentials.
    pub fn new(telegram: TelegramConfig) -> Self {
        Self {
            telegram,
            source: SourceConfig::default(),
            thresholds: Thresholds::default(),
            filter: MarketFilter::default(),
            policy: AlertPolicy::default(),
            poll_interval: Duration::from_secs(60),
            max_alerts_per_scan: 5,
            heartbeat_every: Some(Duration::from_secs(60 * 60)),
        }
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_filter(mut self, filter: MarketFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_alerts_per_scan(mut self, max_alerts: usize) -> Self {
        self.max_alerts_per_scan = max_alerts;
        self
    }

    pub fn with_heartbeat_every(mut self, heartbeat_every: Option<Duration>) -> Self {
        self.heartbeat_every = heartbeat_every;
        self
    }

    /// Load from the process environment, optionally layered over a TOML
    /// file.
    pub fn load(config_file: Option<&Path>) -> SettingsResult<Self> {
        let file_values = match config_file {
            Some(path) => read_file_values(path)?,
            None => HashMap::new(),
        };

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_values.get(key).cloned())
        })
    }

    /// Build settings from an arbitrary key lookup. Values are trimmed and
    /// empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> SettingsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get(TELEGRAM_BOT_TOKEN).ok_or(SettingsError::MissingVariable {
            name: TELEGRAM_BOT_TOKEN,
        })?;
        let chat_id = get(TELEGRAM_CHAT_ID).ok_or(SettingsError::MissingVariable {
            name: TELEGRAM_CHAT_ID,
        })?;

        let mut telegram = TelegramConfig::new(bot_token, chat_id);
        if let Some(api_base) = get(TELEGRAM_API_BASE) {
            telegram = telegram.with_api_base(api_base);
        }

        let defaults = Self::new(telegram);

        let source = SourceConfig::new()
            .with_endpoint(get(POLY_ENDPOINT).unwrap_or_default())
            .with_max_markets(parse_or(
                &get,
                MAX_MARKETS_PER_SCAN,
                defaults.source.max_markets,
            )?);

        let t = &defaults.thresholds;
        let thresholds = Thresholds::new()
            .with_watch(
                parse_or(&get, WATCH_VOL_DELTA, t.watch_vol_delta)?,
                parse_or(&get, WATCH_PRICE_PCT, t.watch_price_pct)?,
                parse_or(&get, WATCH_LIQ, t.watch_liq)?,
            )
            .with_action(
                parse_or(&get, ACTION_VOL_DELTA, t.action_vol_delta)?,
                parse_or(&get, ACTION_PRICE_PCT, t.action_price_pct)?,
                parse_or(&get, ACTION_LIQ, t.action_liq)?,
            );

        let f = &defaults.filter;
        let filter = MarketFilter::new()
            .with_price_range(
                parse_or(&get, MIN_PRICE, f.min_price)?,
                parse_or(&get, MAX_PRICE, f.max_price)?,
            )
            .with_min_market_age_hours(parse_or(
                &get,
                MIN_MARKET_AGE_HOURS,
                f.min_market_age_hours,
            )?);

        let cooldown_minutes: u64 = parse_or(&get, COOLDOWN_MINUTES, 25)?;
        let policy = AlertPolicy::new()
            .with_cooldown(Duration::from_secs(cooldown_minutes * 60))
            .with_improvement_ratio(parse_or(
                &get,
                IMPROVEMENT_RATIO_TO_RESEND,
                defaults.policy.improvement_ratio,
            )?);

        let poll_seconds: u64 = parse_or(&get, POLL_SECONDS, 60)?;
        let heartbeat_minutes: i64 = parse_or(&get, HEARTBEAT_EVERY_MIN, 60)?;
        let heartbeat_every = if heartbeat_minutes > 0 {
            Some(Duration::from_secs(heartbeat_minutes as u64 * 60))
        } else {
            None
        };
        let max_alerts = parse_or(&get, MAX_ALERTS_PER_SCAN, defaults.max_alerts_per_scan)?;

        Ok(defaults
            .with_source(source)
            .with_thresholds(thresholds)
            .with_filter(filter)
            .with_policy(policy)
            .with_poll_interval(Duration::from_secs(poll_seconds))
            .with_heartbeat_every(heartbeat_every)
            .with_max_alerts_per_scan(max_alerts))
    }

    pub fn validate(&self) -> SettingsResult<()> {
        let checks = [
            self.telegram.validate(),
            self.source.validate(),
            self.thresholds.validate(),
            self.filter.validate(),
            self.policy.validate(),
        ];
        for check in checks {
            check.map_err(|message| SettingsError::Invalid { message })?;
        }

        if self.poll_interval.is_zero() {
            return Err(SettingsError::Invalid {
                message: "Poll interval must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> SettingsResult<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| SettingsError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Read a flat TOML file into environment-style keys.
fn read_file_values(path: &Path) -> SettingsResult<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path)?;
    parse_file_values(&contents)
}

fn parse_file_values(contents: &str) -> SettingsResult<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(contents)?;
    let mut values = HashMap::new();

    for (key, value) in table {
        let name = key.to_ascii_uppercase();
        if !KNOWN_KEYS.contains(&name.as_str()) {
            warn!("Ignoring unknown config key {:?}", key);
            continue;
        }

        let rendered = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            other => {
                return Err(SettingsError::InvalidValue {
                    key,
                    value: other.to_string(),
                })
            }
        };
        values.insert(name, rendered);
    }

    Ok(values)
}
