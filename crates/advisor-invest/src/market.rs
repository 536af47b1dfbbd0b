//! EODHD market data client

use crate::error::{AdvisorError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::{Map, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://eodhd.com/api";

/// Conservative dividend screen: large caps yielding over 2%
const SCREEN_FILTERS: &str = "market_cap~more~10000,dividend_yield~more~2";
const SCREEN_LIMIT: u32 = 200;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Market data the advisor consumes
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Raw fundamentals map for a ticker, empty object when unavailable
    async fn get_fundamentals(&self, ticker: &str) -> Result<Value>;
    /// Recent news articles for a ticker within the lookback window
    async fn get_news(&self, ticker: &str, lookback_days: i64) -> Result<Vec<Value>>;
    /// Screener hits for dividend-paying large caps on an exchange
    async fn screen_dividend_large_caps(&self, exchange: &str) -> Result<Vec<Value>>;
}

/// EODHD API client
#[derive(Debug, Clone)]
pub struct EodhdClient {
    client: Client,
    api_token: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl EodhdClient {
    /// Create a new EODHD client with API token and rate limit
    ///
    /// # Arguments
    /// * `api_token` - EODHD API token
    /// * `rate_limit` - Maximum requests per minute
    pub fn new(api_token: impl Into<String>, rate_limit: u32) -> Self {
        // Create rate limiter quota (requests per minute)
        let quota =
            Quota::per_minute(NonZeroU32::new(rate_limit.max(1)).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client: Client::new(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limiter,
        }
    }

    /// Override the API base URL, trimming any trailing slash
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        self.base_url = base.trim_end_matches('/').to_string();
        self
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        debug!(%url, "Requesting market data");
        let mut query: Vec<(&str, String)> = vec![
            ("api_token", self.api_token.clone()),
            ("fmt", "json".to_string()),
        ];
        query.extend(params.iter().cloned());

        let response = self.client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(AdvisorError::MarketData(format!(
                "HTTP {} from {endpoint}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;

        // Error responses still come back as 200 with a code field
        if let Some(code) = payload.get("code").filter(|c| !c.is_null()) {
            let code = match code.as_str() {
                Some(s) => s.to_string(),
                None => code.to_string(),
            };
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(AdvisorError::MarketData(format!(
                "EODHD error {code}: {message}"
            )));
        }

        Ok(payload)
    }
}

#[async_trait]
impl MarketData for EodhdClient {
    async fn get_fundamentals(&self, ticker: &str) -> Result<Value> {
        let payload = self.request(&format!("fundamentals/{ticker}"), &[]).await?;
        if payload.is_object() {
            Ok(payload)
        } else {
            Ok(Value::Object(Map::new()))
        }
    }

    async fn get_news(&self, ticker: &str, lookback_days: i64) -> Result<Vec<Value>> {
        let now = Utc::now();
        let since = now - Duration::days(lookback_days);
        let params = [
            ("s", ticker.to_string()),
            ("from", since.format("%Y-%m-%d").to_string()),
            ("to", now.format("%Y-%m-%d").to_string()),
        ];
        let payload = self.request("news", &params).await?;
        match payload {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    async fn screen_dividend_large_caps(&self, exchange: &str) -> Result<Vec<Value>> {
        let params = [
            ("screener", "most_traded".to_string()),
            ("filters", SCREEN_FILTERS.to_string()),
            ("exchange", exchange.to_string()),
            ("limit", SCREEN_LIMIT.to_string()),
        ];
        let payload = self.request("screener", &params).await?;
        match payload {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }
}
