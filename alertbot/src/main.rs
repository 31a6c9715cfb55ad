use alertbot::{BotSettings, Scanner, TelegramNotifier};
use chrono::Utc;
use clap::{Parser, Subcommand};
use scanner::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "alertbot")]
#[command(about = "Scan prediction markets for momentum and push tiered alerts to Telegram")]
struct Cli {
    /// Optional TOML file; environment variables take precedence over it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the market feed forever and send alerts (default)
    Run,
    /// Run a single scan
    Scan {
        /// Print the alerts that would be sent instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate settings and check the market feed is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let settings = BotSettings::load(cli.config.as_deref())?;
    let source = HttpMarketSource::new(settings.source.clone())?;
    settings.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let notifier = TelegramNotifier::new(settings.telegram.clone())?;
            let mut scanner = Scanner::new(settings, Box::new(source), Box::new(notifier));
            scanner.run(shutdown_signal()).await?;
        }
        Commands::Scan { dry_run } => {
            let notifier = TelegramNotifier::new(settings.telegram.clone())?;
            let mut scanner = Scanner::new(settings, Box::new(source), Box::new(notifier));
            single_scan(&mut scanner, dry_run).await?;
        }
        Commands::Check => {
            health_check(&source).await?;
        }
    }

    Ok(())
}

async fn single_scan(
    scanner: &mut Scanner,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = scanner.scan(Utc::now(), dry_run).await?;

    println!(
        "Signals: {} | {}: {}",
        report.signals,
        if dry_run { "would send" } else { "sent" },
        report.sent
    );
    for alert in &report.alerts {
        println!("\n{}", alert);
    }

    Ok(())
}

async fn health_check(source: &HttpMarketSource) -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking market feed at {}...", source.endpoint());

    match source.health_check().await {
        Ok(()) => {
            println!("✓ Settings valid and market feed reachable.");
            info!("Health check successful");
        }
        Err(e) => {
            println!("✗ Health check failed: {}", e);
            error!("Health check failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
