//! The polling loop.
//!
//! ```text
//! startup message
//!   └─> loop:
//!         fetch markets ─> build signals ─> for each (strongest first):
//!                                             cooldown ok? ─> send ─> remember
//!         heartbeat due? ─> send heartbeat
//!         on error ─> log + best-effort error message
//!         sleep poll interval (or exit on shutdown)
//! ```

use crate::cooldown::AlertLedger;
use crate::message::{error_text, format_alert, heartbeat_text, startup_text};
use crate::notifier::{Notifier, NotifyError};
use crate::settings::BotSettings;
use chrono::{DateTime, Utc};
use scanner::{MarketSignal, MarketSource, SignalBuilder, SourceError};
use std::future::Future;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Market source error: {0}")]
    Source(#[from] SourceError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

impl ScanError {
    /// Short name used in the chat error notice.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Source(err) => err.kind(),
            ScanError::Notify(NotifyError::Network(_)) => "Network",
            ScanError::Notify(NotifyError::Rejected { .. }) => "Rejected",
            ScanError::Notify(NotifyError::InvalidConfig { .. }) => "InvalidConfig",
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Signals that cleared the WATCH tier this scan.
    pub signals: usize,
    /// Alerts actually delivered (or, in a dry run, that would have been).
    pub sent: usize,
    pub alerts: Vec<String>,
}

pub struct Scanner {
    source: Box<dyn MarketSource>,
    notifier: Box<dyn Notifier>,
    builder: SignalBuilder,
    ledger: AlertLedger,
    settings: BotSettings,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl Scanner {
    pub fn new(
        settings: BotSettings,
        source: Box<dyn MarketSource>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            notifier,
            builder: SignalBuilder::new(settings.thresholds.clone(), settings.filter.clone()),
            ledger: AlertLedger::new(settings.policy.clone()),
            settings,
            last_heartbeat: None,
        }
    }

    pub fn ledger(&self) -> &AlertLedger {
        &self.ledger
    }

    async fn collect_signals(&self, now: DateTime<Utc>) -> ScanResult<Vec<MarketSignal>> {
        let records = self.source.fetch_markets().await?;
        let signals = self.builder.build_from_json(&records, now);
        debug!(
            markets = records.len(),
            signals = signals.len(),
            source = self.source.source_name(),
            "Built signals"
        );
        Ok(signals)
    }

    /// Run one scan: fetch, score, and deliver alerts that pass the
    /// cooldown, up to the per-scan cap. A failed delivery aborts the scan.
    pub async fn scan_once(&mut self, now: DateTime<Utc>) -> ScanResult<ScanReport> {
        let signals = self.collect_signals(now).await?;
        let mut report = ScanReport {
            signals: signals.len(),
            ..ScanReport::default()
        };

        for signal in &signals {
            if report.sent >= self.settings.max_alerts_per_scan {
                break;
            }

            if !self.ledger.should_alert(&signal.market_id, signal.score, now) {
                debug!(
                    market_id = %signal.market_id,
                    score = signal.score,
                    "Suppressed by cooldown"
                );
                continue;
            }

            let text = format_alert(signal);
            self.notifier.send(&text).await?;
            self.ledger.remember(signal.market_id.clone(), signal.score, now);
            info!(
                market_id = %signal.market_id,
                tier = %signal.tier,
                score = signal.score,
                "Alert sent"
            );
            report.sent += 1;
            report.alerts.push(text);
        }

        self.maybe_heartbeat(&report, now).await?;
        self.ledger.prune(now);

        info!(signals = report.signals, sent = report.sent, "Scan complete");
        Ok(report)
    }

    async fn maybe_heartbeat(&mut self, report: &ScanReport, now: DateTime<Utc>) -> ScanResult<()> {
        let Some(every) = self.settings.heartbeat_every else {
            return Ok(());
        };

        let due = match self.last_heartbeat {
            None => true,
            Some(last) => (now - last).to_std().map(|age| age >= every).unwrap_or(false),
        };

        if due {
            self.notifier
                .send(&heartbeat_text(report.signals, report.sent))
                .await?;
            self.last_heartbeat = Some(now);
        }

        Ok(())
    }

    /// Compute what a scan would send without notifying or touching the
    /// cooldown ledger.
    pub async fn dry_run(&self, now: DateTime<Utc>) -> ScanResult<ScanReport> {
        let signals = self.collect_signals(now).await?;
        let alerts: Vec<String> = signals
            .iter()
            .filter(|s| self.ledger.should_alert(&s.market_id, s.score, now))
            .take(self.settings.max_alerts_per_scan)
            .map(format_alert)
            .collect();

        Ok(ScanReport {
            signals: signals.len(),
            sent: alerts.len(),
            alerts,
        })
    }

    fn scan_span() -> Span {
        info_span!("scan", scan_id = %Uuid::new_v4())
    }

    /// A single scan on demand, under its own scan id. With `dry_run` set
    /// nothing is sent and the ledger is left alone.
    pub async fn scan(&mut self, now: DateTime<Utc>, dry_run: bool) -> ScanResult<ScanReport> {
        let span = Self::scan_span();
        if dry_run {
            self.dry_run(now).instrument(span).await
        } else {
            self.scan_once(now).instrument(span).await
        }
    }

    /// One loop iteration. Errors are logged and reported to the chat on a
    /// best-effort basis; they never escape.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Option<ScanReport> {
        let span = Self::scan_span();
        async {
            match self.scan_once(now).await {
                Ok(report) => Some(report),
                Err(err) => {
                    error!("Scan failed: {}", err);
                    let notice = error_text(err.kind(), &err.to_string());
                    if let Err(notify_err) = self.notifier.send(&notice).await {
                        warn!("Failed to deliver error notice: {}", notify_err);
                    }
                    None
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Announce startup, then scan every poll interval until `shutdown`
    /// resolves. Only the startup message is allowed to fail the loop.
    pub async fn run<F>(&mut self, shutdown: F) -> ScanResult<()>
    where
        F: Future<Output = ()>,
    {
        self.notifier.send(&startup_text()).await?;
        info!(
            interval_secs = self.settings.poll_interval.as_secs(),
            source = self.source.source_name(),
            notifier = self.notifier.notifier_name(),
            "Bot online"
        );

        tokio::pin!(shutdown);
        loop {
            self.tick(Utc::now()).await;

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scanner");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }
}
