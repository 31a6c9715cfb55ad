pub mod cooldown;
pub mod message;
pub mod notifier;
pub mod scan;
pub mod settings;

pub use cooldown::{AlertLedger, AlertPolicy, AlertRecord};
pub use message::{
    error_text, format_alert, heartbeat_text, recommendation_text, side_text, startup_text,
};
pub use notifier::{Notifier, NotifyError, NotifyResult, TelegramConfig, TelegramNotifier};
pub use scan::{ScanError, ScanReport, ScanResult, Scanner};
pub use settings::{BotSettings, SettingsError, SettingsResult};
