//! Environment-driven configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Deployment environment name, used by logging to pick a formatter.
pub fn get_environment() -> String {
    env::var("CROSSWATCH_ENV").unwrap_or_else(|_| "development".to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the task store file.
    pub data_dir: PathBuf,
    /// Base polling cadence for minute timeframes, seconds.
    pub poll_interval_secs: u64,
    /// Polling cadence for the daily timeframe, seconds. Whether "daily"
    /// means calendar or trading day is the data provider's semantics; the
    /// engine only controls how often it asks.
    pub daily_poll_interval_secs: u64,
    /// Bars requested per provider fetch.
    pub fetch_count: usize,
    /// HTTP timeout for provider and channel calls, seconds.
    pub fetch_timeout_secs: u64,
    /// Cooldown before a failed task is retried, seconds.
    pub failure_cooldown_secs: u64,
    /// Retry attempts after the first failed notification delivery.
    pub notify_max_retries: usize,
    pub market_data_url: String,
    pub telegram_token: String,
    pub telegram_api_url: String,
    /// Futures contracts backing minute bars for the spot metal symbols.
    pub gold_futures_contract: String,
    pub silver_futures_contract: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let telegram_token =
            env::var("TELEGRAM_BOT_TOKEN").map_err(|_| "TELEGRAM_BOT_TOKEN missing from env")?;
        let market_data_url =
            env::var("MARKET_DATA_URL").map_err(|_| "MARKET_DATA_URL missing from env")?;

        Ok(Self {
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            poll_interval_secs: env_parse("POLL_INTERVAL", 60),
            daily_poll_interval_secs: env_parse("DAILY_POLL_INTERVAL", 3600),
            fetch_count: env_parse("FETCH_COUNT", 250),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT", 10),
            failure_cooldown_secs: env_parse("FAILURE_COOLDOWN", 300),
            notify_max_retries: env_parse("NOTIFY_MAX_RETRIES", 3),
            market_data_url,
            telegram_token,
            telegram_api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            gold_futures_contract: env::var("GOLD_FUTURES_CONTRACT")
                .unwrap_or_else(|_| "AU2606".to_string()),
            silver_futures_contract: env::var("SILVER_FUTURES_CONTRACT")
                .unwrap_or_else(|_| "AG2606".to_string()),
        })
    }
}
