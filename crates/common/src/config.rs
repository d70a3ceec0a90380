use std::time::Duration;

use crate::CandleInterval;

/// SBER on MOEX.
pub const DEFAULT_INSTRUMENT: &str = "BBG004730N88";

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Market data
    pub tinkoff_api_token: String,
    pub instrument: String,
    pub candle_interval: CandleInterval,
    pub lookback_hours: i64,

    // Telegram
    pub telegram_token: String,
    /// Empty means every user may issue commands.
    pub telegram_allowed_user_ids: Vec<i64>,

    // Scheduling
    pub tick_interval: Duration,
    pub fetch_timeout: Duration,
    pub notify_timeout: Duration,

    // Database
    pub database_url: String,

    // Strategy config file path
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let candle_interval = optional_env("CANDLE_INTERVAL")
            .map(|v| {
                v.parse::<CandleInterval>()
                    .unwrap_or_else(|e| panic!("ERROR: CANDLE_INTERVAL: {e}"))
            })
            .unwrap_or_default();

        Config {
            tinkoff_api_token: required_env("TINKOFF_API_TOKEN"),
            instrument: optional_env("INSTRUMENT_FIGI")
                .unwrap_or_else(|| DEFAULT_INSTRUMENT.to_string()),
            candle_interval,
            lookback_hours: optional_env("LOOKBACK_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_allowed_user_ids: optional_env("TELEGRAM_ALLOWED_USER_IDS")
                .map(|v| parse_user_ids(&v))
                .unwrap_or_default(),
            tick_interval: secs_env("TICK_INTERVAL_SECS", 15 * 60),
            fetch_timeout: secs_env("FETCH_TIMEOUT_SECS", 30),
            notify_timeout: secs_env("NOTIFY_TIMEOUT_SECS", 10),
            database_url: optional_env("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://trailbot.db?mode=rwc".to_string()),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
        }
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.lookback_hours)
    }
}

/// Parse a comma-separated list of Telegram user ids. Blank entries are skipped.
pub fn parse_user_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().unwrap_or_else(|_| {
                panic!("TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{s}'")
            })
        })
        .collect()
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn secs_env(key: &str, default: u64) -> Duration {
    let secs = optional_env(key)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&s| s > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
