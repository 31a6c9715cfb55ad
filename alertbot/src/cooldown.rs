//! Per-market anti-spam bookkeeping.
//!
//! A market that was alerted recently stays quiet for the cooldown window
//! unless its signal has strengthened by at least `improvement_ratio`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub cooldown: Duration,
    pub improvement_ratio: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(25 * 60),
            improvement_ratio: 1.25,
        }
    }
}

impl AlertPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_improvement_ratio(mut self, ratio: f64) -> Self {
        self.improvement_ratio = ratio;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.improvement_ratio.is_finite() || self.improvement_ratio <= 0.0 {
            return Err("Improvement ratio must be a positive number".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertRecord {
    pub sent_at: DateTime<Utc>,
    pub score: f64,
}

#[derive(Debug, Default)]
pub struct AlertLedger {
    policy: AlertPolicy,
    records: HashMap<String, AlertRecord>,
}

impl AlertLedger {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            records: HashMap::new(),
        }
    }

    fn within_cooldown(&self, record: &AlertRecord, now: DateTime<Utc>) -> bool {
        let age = now - record.sent_at;
        // Clock going backwards counts as "just sent".
        match age.to_std() {
            Ok(age) => age < self.policy.cooldown,
            Err(_) => true,
        }
    }

    pub fn should_alert(&self, market_id: &str, score: f64, now: DateTime<Utc>) -> bool {
        match self.records.get(market_id) {
            None => true,
            Some(record) if self.within_cooldown(record, now) => {
                score >= record.score * self.policy.improvement_ratio
            }
            Some(_) => true,
        }
    }

    pub fn remember(&mut self, market_id: impl Into<String>, score: f64, now: DateTime<Utc>) {
        self.records.insert(
            market_id.into(),
            AlertRecord {
                sent_at: now,
                score,
            },
        );
    }

    pub fn get(&self, market_id: &str) -> Option<&AlertRecord> {
        self.records.get(market_id)
    }

    /// Forget markets whose cooldown has fully elapsed. Returns how many
    /// records were dropped.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        let policy_cooldown = self.policy.cooldown;
        self.records.retain(|_, record| match (now - record.sent_at).to_std() {
            Ok(age) => age < policy_cooldown,
            Err(_) => true,
        });
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    #[test]
    fn test_first_alert_always_allowed() {
        let ledger = AlertLedger::new(AlertPolicy::default());
        assert!(ledger.should_alert("m1", 0.1, t0()));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_cooldown_blocks_similar_score() {
        let mut ledger = AlertLedger::new(AlertPolicy::default());
        ledger.remember("m1", 8.0, t0());

        assert!(!ledger.should_alert("m1", 8.0, t0() + minutes(10)));
        assert!(!ledger.should_alert("m1", 9.99, t0() + minutes(24)));
        assert!(ledger.should_alert("m2", 1.0, t0() + minutes(1)));
    }

    #[test]
    fn test_improved_score_bypasses_cooldown() {
        let mut ledger = AlertLedger::new(AlertPolicy::default());
        ledger.remember("m1", 8.0, t0());

        assert!(ledger.should_alert("m1", 10.0, t0() + minutes(5)));
        assert!(ledger.should_alert("m1", 12.0, t0() + minutes(5)));
    }

    #[test]
    fn test_cooldown_expiry() {
        let mut ledger = AlertLedger::new(AlertPolicy::default());
        ledger.remember("m1", 8.0, t0());

        assert!(ledger.should_alert("m1", 1.0, t0() + minutes(25)));
        assert!(ledger.should_alert("m1", 1.0, t0() + minutes(90)));
    }

    #[test]
    fn test_remember_overwrites() {
        let mut ledger = AlertLedger::new(AlertPolicy::default());
        ledger.remember("m1", 8.0, t0());
        ledger.remember("m1", 10.0, t0() + minutes(5));

        let record = ledger.get("m1").unwrap();
        assert_eq!(record.score, 10.0);
        assert_eq!(record.sent_at, t0() + minutes(5));
        assert_eq!(ledger.len(), 1);

        // New baseline: 12.0 is no longer a 25% improvement.
        assert!(!ledger.should_alert("m1", 12.0, t0() + minutes(6)));
    }

    #[test]
    fn test_clock_skew_treated_as_recent() {
        let mut ledger = AlertLedger::new(AlertPolicy::default());
        ledger.remember("m1", 8.0, t0());
        assert!(!ledger.should_alert("m1", 8.0, t0() - minutes(1)));
    }

    #[test]
    fn test_prune_drops_only_expired() {
        let policy = AlertPolicy::new().with_cooldown(Duration::from_secs(600));
        let mut ledger = AlertLedger::new(policy);
        ledger.remember("old", 5.0, t0());
        ledger.remember("new", 5.0, t0() + minutes(8));

        let dropped = ledger.prune(t0() + minutes(12));
        assert_eq!(dropped, 1);
        assert!(ledger.get("old").is_none());
        assert!(ledger.get("new").is_some());
    }

    #[test]
    fn test_policy_validation() {
        assert!(AlertPolicy::default().validate().is_ok());
        assert!(AlertPolicy::new()
            .with_improvement_ratio(0.0)
            .validate()
            .is_err());
        assert!(AlertPolicy::new()
            .with_improvement_ratio(f64::INFINITY)
            .validate()
            .is_err());
    }
}
