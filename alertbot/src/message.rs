//! Plain-text chat messages. Telegram renders these without a parse mode,
//! so no markup is interpreted.

use scanner::{Direction, MarketSignal, Tier};

const ERROR_DETAIL_LIMIT: usize = 180;

pub fn recommendation_text(tier: Tier) -> &'static str {
    match tier {
        Tier::Action => "✅ ACTION: consider entry now",
        Tier::Watch => "👀 WATCH: monitor (possible entry)",
    }
}

pub fn side_text(direction: Direction) -> &'static str {
    match direction {
        Direction::YesUp => "Momentum: YES moving up (market getting more confident).",
        Direction::YesDown => "Momentum: YES moving down (market getting less confident).",
    }
}

fn suggested_side(direction: Direction) -> &'static str {
    match direction {
        Direction::YesUp => "Suggested side (momentum): **YES** (market confidence increasing).",
        Direction::YesDown => {
            "Suggested side (momentum): **NO** / avoid YES (market confidence decreasing)."
        }
    }
}

fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::YesUp => "⬆️",
        Direction::YesDown => "⬇️",
    }
}

pub fn format_alert(signal: &MarketSignal) -> String {
    let msg = format!(
        "🚨 {tier} | Momentum {arrow}\n\
         🎯 {rec}\n\
         {action}\n\
         🧠 Reason: VolΔ={vol} | PriceMove={pct:.2}% | Liq={liq} | Score={score:.2}\n\
         📌 {side}\n\
         📝 {title}\n\
         {url}",
        tier = signal.tier,
        arrow = arrow(signal.direction),
        rec = recommendation_text(signal.tier),
        action = suggested_side(signal.direction),
        vol = signal.vol_delta.trunc() as i64,
        pct = signal.price_pct,
        liq = signal.liquidity.trunc() as i64,
        score = signal.score,
        side = side_text(signal.direction),
        title = signal.title,
        url = signal.url,
    );
    msg.trim().to_string()
}

pub fn startup_text() -> String {
    "🤖 Bot online (AGGRESSIVE): more alerts + WATCH/ACTION tiers + anti-spam.".to_string()
}

pub fn heartbeat_text(signals: usize, sent: usize) -> String {
    format!("🟢 Scan ok. Signals this scan: {} (sent {}).", signals, sent)
}

pub fn error_text(kind: &str, detail: &str) -> String {
    let detail: String = detail.chars().take(ERROR_DETAIL_LIMIT).collect();
    format!("⚠️ Bot error: {}: {}", kind, detail)
}
