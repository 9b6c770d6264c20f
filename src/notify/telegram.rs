//! Telegram Bot API notification channel

use crate::config::Config;
use crate::error::EngineError;
use crate::notify::NotificationChannel;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl TelegramChannel {
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| EngineError::Dispatch(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.telegram_api_url.trim_end_matches('/'),
                config.telegram_token
            ),
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "chat_id": user_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .map_err(|e| EngineError::Dispatch(format!("channel unreachable: {}", e)))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                Err(EngineError::Dispatch("channel rate limited".to_string()))
            }
            status if !status.is_success() => Err(EngineError::Dispatch(format!(
                "channel rejected message: {}",
                status
            ))),
            _ => Ok(()),
        }
    }
}
