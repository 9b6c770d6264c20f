//! HTTP market data provider.
//!
//! Routes by symbol class the way the upstream data service expects:
//! precious-metal spot symbols (Au99.99 / Ag99.99) take minute bars from the
//! configured futures contract (spot quotes only cover the current day) and
//! daily bars from spot history; everything else is treated as an equity
//! code.

use crate::config::Config;
use crate::error::ProviderError;
use crate::market::MarketDataProvider;
use crate::models::{Bar, Timeframe};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct HttpMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
    gold_contract: String,
    silver_contract: String,
}

impl HttpMarketDataProvider {
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.market_data_url.trim_end_matches('/').to_string(),
            gold_contract: config.gold_futures_contract.clone(),
            silver_contract: config.silver_futures_contract.clone(),
        })
    }

    fn is_metal(symbol: &str) -> bool {
        let upper = symbol.to_ascii_uppercase();
        upper.starts_with("AU") || upper.starts_with("AG")
    }

    /// Endpoint path + query symbol for a (symbol, timeframe) request.
    fn route(&self, symbol: &str, timeframe: Timeframe) -> (String, String) {
        if Self::is_metal(symbol) {
            if timeframe == Timeframe::Daily {
                ("spot/daily".to_string(), symbol.to_string())
            } else {
                let contract = if symbol.to_ascii_uppercase().starts_with("AU") {
                    &self.gold_contract
                } else {
                    &self.silver_contract
                };
                ("futures/minute".to_string(), contract.clone())
            }
        } else if timeframe == Timeframe::Daily {
            ("stock/daily".to_string(), symbol.to_string())
        } else {
            ("stock/minute".to_string(), symbol.to_string())
        }
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, ProviderError> {
        let (path, query_symbol) = self.route(symbol, timeframe);
        let url = format!("{}/{}", self.base_url, path);
        let period = timeframe.minutes().to_string();
        let count = count.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", query_symbol.as_str()),
                ("period", period.as_str()),
                ("count", count.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound {
                    symbol: symbol.to_string(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status if !status.is_success() => {
                return Err(ProviderError::Transport(format!(
                    "unexpected status {} from {}",
                    status, url
                )))
            }
            _ => {}
        }

        let mut bars: Vec<Bar> = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        // The series contract is strictly increasing timestamps; normalize
        // in case the upstream feed delivers duplicates or out of order.
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        debug!(
            symbol = %symbol,
            timeframe = %timeframe,
            count = bars.len(),
            "HttpMarketDataProvider: fetched {} bars for {}",
            bars.len(),
            symbol
        );

        Ok(bars)
    }
}
