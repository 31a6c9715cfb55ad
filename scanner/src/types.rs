use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Alert strength. `Action` ranks above `Watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Watch,
    Action,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Watch => write!(f, "WATCH"),
            Tier::Action => write!(f, "ACTION"),
        }
    }
}

/// What happened to the YES price between snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    YesUp,
    YesDown,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::YesUp => write!(f, "YES_UP"),
            Direction::YesDown => write!(f, "YES_DOWN"),
        }
    }
}

/// A market record normalised from whatever JSON the feed returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub id: String,
    pub title: String,
    pub url: String,
    pub yes_price: f64,
    pub no_price: f64,
    pub liquidity: f64,
    pub volume: f64,
    pub volume_prev: f64,
    pub yes_price_prev: f64,
    pub created_at: Option<DateTime<Utc>>,
}

const UNTITLED: &str = "Untitled market";

impl MarketSnapshot {
    pub fn new(id: impl Into<String>, yes_price: f64) -> Self {
        Self {
            id: id.into(),
            title: UNTITLED.to_string(),
            url: String::new(),
            yes_price,
            no_price: if yes_price != 0.0 { 1.0 - yes_price } else { 0.0 },
            liquidity: 0.0,
            volume: 0.0,
            volume_prev: 0.0,
            yes_price_prev: yes_price,
            created_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn with_volume(mut self, volume: f64, volume_prev: f64) -> Self {
        self.volume = volume;
        self.volume_prev = volume_prev;
        self
    }

    pub fn with_previous_price(mut self, yes_price_prev: f64) -> Self {
        self.yes_price_prev = yes_price_prev;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Normalise a raw feed record.
    ///
    /// Feeds disagree on field names, so each field is looked up under a list
    /// of aliases and the first truthy value wins. Returns `None` when the
    /// record carries no usable id.
    pub fn from_json(record: &Value) -> Option<Self> {
        let id = first_truthy(record, &["id", "market_id"]).map(render_text)?;
        if id.is_empty() {
            return None;
        }

        let title = first_truthy(record, &["title", "question"])
            .map(render_text)
            .unwrap_or_else(|| UNTITLED.to_string());
        let url = first_truthy(record, &["url", "market_url"])
            .map(render_text)
            .unwrap_or_default();

        let yes_price = lenient_f64(record.get("yes_price"), 0.0);
        let no_default = if yes_price != 0.0 { 1.0 - yes_price } else { 0.0 };
        let no_price = lenient_f64(record.get("no_price"), no_default);
        let liquidity = lenient_f64(alias(record, &["liquidity", "liq"]), 0.0);
        let volume = lenient_f64(alias(record, &["volume", "vol"]), 0.0);
        let volume_prev = lenient_f64(
            alias(record, &["volume_1h_ago", "vol_1h_ago", "volume_prev"]),
            volume,
        );
        let yes_price_prev = lenient_f64(
            alias(record, &["yes_price_1h_ago", "yes_prev", "yes_price_prev"]),
            yes_price,
        );
        let created_at = first_truthy(
            record,
            &["created_at", "createdAt", "start_date", "startDate"],
        )
        .and_then(parse_timestamp);

        Some(Self {
            id,
            title,
            url,
            yes_price,
            no_price,
            liquidity,
            volume,
            volume_prev,
            yes_price_prev,
            created_at,
        })
    }
}

/// A market move that cleared at least the WATCH thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSignal {
    pub market_id: String,
    pub title: String,
    pub url: String,
    pub yes_price: f64,
    pub no_price: f64,
    pub liquidity: f64,
    pub volume: f64,
    pub vol_delta: f64,
    pub price_pct: f64,
    pub price_abs: f64,
    pub direction: Direction,
    pub score: f64,
    pub tier: Tier,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn first_truthy<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| is_truthy(value))
}

/// First truthy alias, otherwise whatever the last alias holds (possibly a
/// falsy zero, which is then taken literally rather than defaulted).
fn alias<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    first_truthy(record, keys).or_else(|| keys.last().and_then(|key| record.get(*key)))
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Best-effort float conversion; anything unparseable yields `default`.
pub fn lenient_f64(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(default),
        _ => default,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}
