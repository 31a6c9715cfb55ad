use alertbot::{BotSettings, Scanner, TelegramConfig, TelegramNotifier};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use mockito::Matcher;
use scanner::{HttpMarketSource, SourceConfig};
use serde_json::json;
use std::time::Duration;

const TOKEN: &str = "42:test-token";
const SEND_PATH: &str = "/bot42:test-token/sendMessage";

fn feed_body() -> String {
    json!({
        "markets": [
            {
                "id": "election",
                "question": "Will the incumbent win?",
                "url": "https://polymarket.com/event/election",
                "yes_price": 0.62,
                "yes_price_1h_ago": 0.55,
                "volume": 250000,
                "volume_1h_ago": 240000,
                "liquidity": 180000
            },
            {
                "id": "weather",
                "title": "Snow in July?",
                "yes_price": "0.30",
                "yes_prev": "0.295",
                "vol": 5000,
                "vol_1h_ago": 4800,
                "liq": 9000
            },
            {
                "id": "noise",
                "title": "Penny market",
                "yes_price": 0.01,
                "yes_price_1h_ago": 0.005,
                "volume": 90000,
                "volume_1h_ago": 0,
                "liquidity": 90000
            },
            { "title": "record without id", "yes_price": 0.5 }
        ]
    })
    .to_string()
}

fn build_scanner(feed_url: String, telegram_url: String) -> Scanner {
    let telegram = TelegramConfig::new(TOKEN, "-100200").with_api_base(telegram_url);
    let settings = BotSettings::new(telegram)
        .with_source(
            SourceConfig::new()
                .with_endpoint(format!("{}/markets", feed_url))
                .with_timeout(Duration::from_secs(5)),
        )
        .with_heartbeat_every(None);
    settings.validate().expect("settings should be valid");

    let source = HttpMarketSource::new(settings.source.clone()).expect("source creation");
    let notifier = TelegramNotifier::new(settings.telegram.clone()).expect("notifier creation");
    Scanner::new(settings, Box::new(source), Box::new(notifier))
}

#[tokio::test]
async fn test_feed_to_telegram_end_to_end() {
    let mut feed = mockito::Server::new_async().await;
    let mut telegram = mockito::Server::new_async().await;

    let _feed_mock = feed
        .mock("GET", "/markets")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(feed_body())
        .expect(2)
        .create_async()
        .await;

    let action_mock = telegram
        .mock("POST", SEND_PATH)
        .match_body(Matcher::Regex("🚨 ACTION".to_string()))
        .with_status(200)
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;
    let watch_mock = telegram
        .mock("POST", SEND_PATH)
        .match_body(Matcher::Regex("🚨 WATCH".to_string()))
        .with_status(200)
        .with_body(r#"{"ok": true}"#)
        .expect(1)
        .create_async()
        .await;

    let mut scanner = build_scanner(feed.url(), telegram.url());
    let t0 = Utc.with_ymd_and_hms(2024, 11, 5, 20, 0, 0).unwrap();

    let report = scanner.scan_once(t0).await.unwrap();
    assert_eq!(report.signals, 2);
    assert_eq!(report.sent, 2);
    assert!(report.alerts[0].contains("Will the incumbent win?"));
    assert!(report.alerts[1].contains("Snow in July?"));

    // Same data five minutes later: both markets are cooling down.
    let report = scanner
        .scan_once(t0 + ChronoDuration::minutes(5))
        .await
        .unwrap();
    assert_eq!(report.signals, 2);
    assert_eq!(report.sent, 0);

    action_mock.assert_async().await;
    watch_mock.assert_async().await;
}

#[tokio::test]
async fn test_feed_outage_sends_error_notice() {
    let mut feed = mockito::Server::new_async().await;
    let mut telegram = mockito::Server::new_async().await;

    let _feed_mock = feed
        .mock("GET", "/markets")
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let notice_mock = telegram
        .mock("POST", SEND_PATH)
        .match_body(Matcher::Regex("Bot error: Http".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut scanner = build_scanner(feed.url(), telegram.url());
    assert!(scanner.tick(Utc::now()).await.is_none());

    notice_mock.assert_async().await;
}
