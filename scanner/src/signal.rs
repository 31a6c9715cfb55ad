//! Momentum scoring and tier classification.
//!
//! A signal is derived from two snapshots of the same market (current and
//! roughly one hour earlier): the traded volume since the earlier snapshot,
//! the relative move of the YES price, and the current liquidity.

use crate::config::{MarketFilter, Thresholds};
use crate::types::{Direction, MarketSignal, MarketSnapshot, Tier};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(x))
}

/// Combined signal strength; higher is stronger.
///
/// Volume contributes roughly 0..5, the price move 0..6 and liquidity
/// 0..3.5.
pub fn score_signal(vol_delta: f64, price_pct: f64, liq: f64) -> f64 {
    let v = vol_delta.max(1.0).log10();
    let p = clamp(price_pct / 5.0, 0.0, 3.0);
    let l = clamp(liq.max(1.0).log10() / 2.0, 0.0, 3.5);
    v * 1.2 + p * 2.0 + l
}

pub fn classify_tier(
    vol_delta: f64,
    price_pct: f64,
    liq: f64,
    thresholds: &Thresholds,
) -> Option<Tier> {
    let action = vol_delta >= thresholds.action_vol_delta
        && price_pct >= thresholds.action_price_pct
        && liq >= thresholds.action_liq;
    if action {
        return Some(Tier::Action);
    }

    let watch = vol_delta >= thresholds.watch_vol_delta
        && price_pct >= thresholds.watch_price_pct
        && liq >= thresholds.watch_liq;
    if watch {
        return Some(Tier::Watch);
    }

    None
}

/// Turns market snapshots into ranked signals.
#[derive(Debug, Clone, Default)]
pub struct SignalBuilder {
    thresholds: Thresholds,
    filter: MarketFilter,
}

impl SignalBuilder {
    pub fn new(thresholds: Thresholds, filter: MarketFilter) -> Self {
        Self { thresholds, filter }
    }

    fn too_young(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> bool {
        if self.filter.min_market_age_hours <= 0.0 {
            return false;
        }
        match snapshot.created_at {
            Some(created_at) => {
                let age_hours = (now - created_at).num_seconds() as f64 / 3600.0;
                age_hours < self.filter.min_market_age_hours
            }
            None => false,
        }
    }

    /// Evaluate a single snapshot. `None` means the market is filtered out
    /// or its move is below the WATCH tier.
    pub fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        now: DateTime<Utc>,
    ) -> Option<MarketSignal> {
        let price = snapshot.yes_price;
        if price < self.filter.min_price || price > self.filter.max_price {
            return None;
        }

        if self.too_young(snapshot, now) {
            debug!(market_id = %snapshot.id, "Skipping market younger than minimum age");
            return None;
        }

        let vol_delta = (snapshot.volume - snapshot.volume_prev).max(0.0);
        let price_abs = snapshot.yes_price - snapshot.yes_price_prev;
        let price_pct = if snapshot.yes_price_prev > 0.0 {
            price_abs.abs() / snapshot.yes_price_prev * 100.0
        } else {
            0.0
        };

        let tier = classify_tier(vol_delta, price_pct, snapshot.liquidity, &self.thresholds)?;
        let direction = if price_abs >= 0.0 {
            Direction::YesUp
        } else {
            Direction::YesDown
        };

        Some(MarketSignal {
            market_id: snapshot.id.clone(),
            title: snapshot.title.clone(),
            url: snapshot.url.clone(),
            yes_price: snapshot.yes_price,
            no_price: snapshot.no_price,
            liquidity: snapshot.liquidity,
            volume: snapshot.volume,
            vol_delta,
            price_pct,
            price_abs,
            direction,
            score: score_signal(vol_delta, price_pct, snapshot.liquidity),
            tier,
        })
    }

    /// Build signals sorted strongest first: ACTION before WATCH, then by
    /// descending score.
    pub fn build(&self, snapshots: &[MarketSnapshot], now: DateTime<Utc>) -> Vec<MarketSignal> {
        let mut signals: Vec<MarketSignal> = snapshots
            .iter()
            .filter_map(|snapshot| self.evaluate(snapshot, now))
            .collect();

        signals.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        });
        signals
    }

    /// Normalise raw feed records and build signals from them. Records
    /// without an id are dropped.
    pub fn build_from_json(
        &self,
        records: &[Value],
        now: DateTime<Utc>,
    ) -> Vec<MarketSignal> {
        let snapshots: Vec<MarketSnapshot> = records
            .iter()
            .filter_map(MarketSnapshot::from_json)
            .collect();

        if snapshots.len() < records.len() {
            debug!(
                dropped = records.len() - snapshots.len(),
                "Dropped market records without an id"
            );
        }

        self.build(&snapshots, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn watch_market(id: &str) -> MarketSnapshot {
        // +2% move on 200 traded, 10k liquidity: WATCH only
        MarketSnapshot::new(id, 0.51)
            .with_previous_price(0.50)
            .with_volume(1_200.0, 1_000.0)
            .with_liquidity(10_000.0)
    }

    fn action_market(id: &str) -> MarketSnapshot {
        // +10% move on 1000 traded, 50k liquidity: ACTION
        MarketSnapshot::new(id, 0.55)
            .with_previous_price(0.50)
            .with_volume(6_000.0, 5_000.0)
            .with_liquidity(50_000.0)
    }

    #[test]
    fn test_score_signal_components() {
        // All components at their floor.
        assert_eq!(score_signal(0.0, 0.0, 0.0), 0.0);

        // 1000 traded (3*1.2), 5% move (1*2), 10k liquidity (4/2).
        let score = score_signal(1_000.0, 5.0, 10_000.0);
        assert!((score - (3.6 + 2.0 + 2.0)).abs() < 1e-9);

        // Price contribution caps at 3 (=6 points), liquidity at 3.5.
        let capped = score_signal(1.0, 500.0, 1e12);
        assert!((capped - (6.0 + 3.5)).abs() < 1e-9);
    }

    #[test]
    fn test_classify_tier() {
        let t = Thresholds::default();
        assert_eq!(classify_tier(600.0, 3.0, 20_000.0, &t), Some(Tier::Action));
        assert_eq!(classify_tier(150.0, 1.2, 8_000.0, &t), Some(Tier::Watch));
        assert_eq!(classify_tier(5_000.0, 10.0, 19_999.0, &t), Some(Tier::Watch));
        assert_eq!(classify_tier(149.0, 50.0, 1e6, &t), None);
        assert_eq!(classify_tier(1e6, 1.1, 1e6, &t), None);
    }

    #[test]
    fn test_price_filter_bounds() {
        let builder = SignalBuilder::default();
        let cheap = watch_market("cheap").with_previous_price(0.01);
        let cheap = MarketSnapshot { yes_price: 0.015, ..cheap };
        assert!(builder.evaluate(&cheap, now()).is_none());

        let certain = MarketSnapshot {
            yes_price: 0.99,
            ..watch_market("certain")
        };
        assert!(builder.evaluate(&certain, now()).is_none());

        let edge = MarketSnapshot {
            yes_price: 0.98,
            yes_price_prev: 0.90,
            ..watch_market("edge")
        };
        assert!(builder.evaluate(&edge, now()).is_some());
    }

    #[test]
    fn test_evaluate_computes_move() {
        let builder = SignalBuilder::default();
        let signal = builder.evaluate(&action_market("a"), now()).unwrap();

        assert_eq!(signal.tier, Tier::Action);
        assert_eq!(signal.direction, Direction::YesUp);
        assert_eq!(signal.vol_delta, 1_000.0);
        assert!((signal.price_pct - 10.0).abs() < 1e-9);
        assert!((signal.price_abs - 0.05).abs() < 1e-9);
        let expected = score_signal(1_000.0, signal.price_pct, 50_000.0);
        assert!((signal.score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_downward_move() {
        let builder = SignalBuilder::default();
        let snapshot = action_market("down").with_previous_price(0.62);
        let signal = builder.evaluate(&snapshot, now()).unwrap();
        assert_eq!(signal.direction, Direction::YesDown);
        assert!(signal.price_abs < 0.0);
        assert!(signal.price_pct > 0.0);
    }

    #[test]
    fn test_volume_drop_is_not_a_delta() {
        let builder = SignalBuilder::default();
        let snapshot = action_market("shrinking").with_volume(1_000.0, 5_000.0);
        assert!(builder.evaluate(&snapshot, now()).is_none());
    }

    #[test]
    fn test_zero_previous_price_has_no_move() {
        let builder = SignalBuilder::default();
        let snapshot = action_market("fresh").with_previous_price(0.0);
        assert!(builder.evaluate(&snapshot, now()).is_none());
    }

    #[test]
    fn test_minimum_market_age() {
        let filter = MarketFilter::new().with_min_market_age_hours(24.0);
        let builder = SignalBuilder::new(Thresholds::default(), filter);

        let young = action_market("young").with_created_at(now() - Duration::hours(2));
        assert!(builder.evaluate(&young, now()).is_none());

        let old = action_market("old").with_created_at(now() - Duration::hours(48));
        assert!(builder.evaluate(&old, now()).is_some());

        let unknown = action_market("unknown");
        assert!(builder.evaluate(&unknown, now()).is_some());
    }

    #[test]
    fn test_build_sorts_action_first_then_score() {
        let builder = SignalBuilder::default();
        let strong_watch = MarketSnapshot {
            liquidity: 19_000.0,
            ..action_market("strong-watch").with_volume(100_000.0, 0.0)
        };
        let snapshots = vec![
            watch_market("w1"),
            strong_watch,
            action_market("a1"),
            MarketSnapshot::new("flat", 0.5),
        ];

        let signals = builder.build(&snapshots, now());
        let ids: Vec<&str> = signals.iter().map(|s| s.market_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "strong-watch", "w1"]);
        assert!(signals[1].score > signals[2].score);
    }

    #[test]
    fn test_build_from_json() {
        let builder = SignalBuilder::default();
        let records = vec![
            json!({
                "id": "json-1",
                "title": "JSON market",
                "yes_price": 0.55,
                "yes_price_1h_ago": 0.50,
                "volume": 6000,
                "volume_1h_ago": 5000,
                "liquidity": 50000,
            }),
            json!({"title": "no id", "yes_price": 0.5}),
        ];

        let signals = builder.build_from_json(&records, now());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].market_id, "json-1");
        assert_eq!(signals[0].title, "JSON market");
        assert_eq!(signals[0].tier, Tier::Action);
    }
}
