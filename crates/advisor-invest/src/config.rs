//! Configuration for the advisor
//!
//! One explicit [`Settings`] value is constructed at process start and passed
//! to every component that needs it. There is no ambient global.

use crate::error::{AdvisorError, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Aggregate configuration for agent runs and daily screening
#[derive(Debug, Clone)]
pub struct Settings {
    /// Anthropic API key for the model provider
    pub anthropic_api_key: String,

    /// Model identifier used for both the agent loop and news summaries
    pub model: String,

    /// Max tokens per agent completion
    pub agent_max_tokens: usize,

    /// EODHD API token
    pub market_api_key: String,

    /// EODHD API base URL
    pub market_base_url: String,

    /// Market data requests per minute
    pub market_rate_limit: u32,

    /// Brokerage username, unused by the mock broker
    pub broker_username: String,

    /// Brokerage password, unused by the mock broker
    pub broker_password: String,

    /// Append-only thesis log path
    pub thesis_log_path: PathBuf,

    /// Append-only approval decision log path
    pub decision_log_path: PathBuf,

    /// Shortlist cache file path
    pub shortlist_cache_path: PathBuf,

    /// Number of candidates to keep on the shortlist
    pub shortlist_target_size: usize,

    /// Days between shortlist refreshes
    pub shortlist_refresh_days: i64,

    /// Exchange code passed to the screener
    pub default_exchange: String,

    /// Iteration cap for one agent run
    pub agent_max_iterations: usize,

    /// Recipient label attached to delivered reports
    pub report_recipient: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            model: "claude-3-5-sonnet-latest".to_string(),
            agent_max_tokens: 4096,
            market_api_key: String::new(),
            market_base_url: "https://eodhd.com/api".to_string(),
            market_rate_limit: 60,
            broker_username: String::new(),
            broker_password: String::new(),
            thesis_log_path: PathBuf::from("data/thesis_log.jsonl"),
            decision_log_path: PathBuf::from("data/decision_log.jsonl"),
            shortlist_cache_path: PathBuf::from("data/shortlist.json"),
            shortlist_target_size: 20,
            shortlist_refresh_days: 7,
            default_exchange: "US".to_string(),
            agent_max_iterations: 25,
            report_recipient: String::new(),
        }
    }
}

impl Settings {
    /// Create a new settings builder
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Read settings from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            anthropic_api_key: env_or("ANTHROPIC_API_KEY", &defaults.anthropic_api_key),
            model: env_or("ADVISOR_MODEL", &defaults.model),
            agent_max_tokens: env_parse("ADVISOR_MAX_TOKENS", defaults.agent_max_tokens),
            market_api_key: env_or("EODHD_API_KEY", &defaults.market_api_key),
            market_base_url: env_or("EODHD_BASE_URL", &defaults.market_base_url),
            market_rate_limit: env_parse("EODHD_RATE_LIMIT", defaults.market_rate_limit),
            broker_username: env_or("BROKER_USERNAME", &defaults.broker_username),
            broker_password: env_or("BROKER_PASSWORD", &defaults.broker_password),
            thesis_log_path: env_path("ADVISOR_THESIS_LOG", &defaults.thesis_log_path),
            decision_log_path: env_path("ADVISOR_DECISION_LOG", &defaults.decision_log_path),
            shortlist_cache_path: env_path(
                "ADVISOR_SHORTLIST_CACHE",
                &defaults.shortlist_cache_path,
            ),
            shortlist_target_size: env_parse(
                "ADVISOR_SHORTLIST_SIZE",
                defaults.shortlist_target_size,
            ),
            shortlist_refresh_days: env_parse(
                "ADVISOR_SHORTLIST_REFRESH_DAYS",
                defaults.shortlist_refresh_days,
            ),
            default_exchange: env_or("ADVISOR_EXCHANGE", &defaults.default_exchange),
            agent_max_iterations: env_parse(
                "ADVISOR_MAX_ITERATIONS",
                defaults.agent_max_iterations,
            ),
            report_recipient: env_or("REPORT_RECIPIENT", &defaults.report_recipient),
        }
    }

    /// Validate the fields an agent run requires
    pub fn validate_for_agent(&self) -> Result<()> {
        if self.anthropic_api_key.trim().is_empty() {
            return Err(AdvisorError::Config(
                "ANTHROPIC_API_KEY is required for agent runs".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the fields market data access requires
    pub fn validate_for_market(&self) -> Result<()> {
        if self.market_api_key.trim().is_empty() {
            return Err(AdvisorError::Config(
                "EODHD_API_KEY is required for market data access".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str, default: &PathBuf) -> PathBuf {
    match std::env::var(key) {
        Ok(raw) => PathBuf::from(raw),
        Err(_) => default.clone(),
    }
}

/// Builder for Settings
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    anthropic_api_key: Option<String>,
    model: Option<String>,
    agent_max_tokens: Option<usize>,
    market_api_key: Option<String>,
    market_base_url: Option<String>,
    market_rate_limit: Option<u32>,
    broker_username: Option<String>,
    broker_password: Option<String>,
    thesis_log_path: Option<PathBuf>,
    decision_log_path: Option<PathBuf>,
    shortlist_cache_path: Option<PathBuf>,
    shortlist_target_size: Option<usize>,
    shortlist_refresh_days: Option<i64>,
    default_exchange: Option<String>,
    agent_max_iterations: Option<usize>,
    report_recipient: Option<String>,
}

impl SettingsBuilder {
    /// Set the Anthropic API key
    pub fn anthropic_api_key(mut self, key: impl Into<String>) -> Self {
        self.anthropic_api_key = Some(key.into());
        self
    }

    /// Set the model identifier
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the max tokens per agent completion
    pub fn agent_max_tokens(mut self, max_tokens: usize) -> Self {
        self.agent_max_tokens = Some(max_tokens);
        self
    }

    /// Set the brokerage username
    pub fn broker_username(mut self, username: impl Into<String>) -> Self {
        self.broker_username = Some(username.into());
        self
    }

    /// Set the brokerage password
    pub fn broker_password(mut self, password: impl Into<String>) -> Self {
        self.broker_password = Some(password.into());
        self
    }

    /// Set the market data API token
    pub fn market_api_key(mut self, key: impl Into<String>) -> Self {
        self.market_api_key = Some(key.into());
        self
    }

    /// Set the market data base URL
    pub fn market_base_url(mut self, url: impl Into<String>) -> Self {
        self.market_base_url = Some(url.into());
        self
    }

    /// Set the market data rate limit (requests per minute)
    pub fn market_rate_limit(mut self, limit: u32) -> Self {
        self.market_rate_limit = Some(limit);
        self
    }

    /// Set the thesis log path
    pub fn thesis_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.thesis_log_path = Some(path.into());
        self
    }

    /// Set the decision log path
    pub fn decision_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.decision_log_path = Some(path.into());
        self
    }

    /// Set the shortlist cache path
    pub fn shortlist_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.shortlist_cache_path = Some(path.into());
        self
    }

    /// Set the shortlist target size
    pub fn shortlist_target_size(mut self, size: usize) -> Self {
        self.shortlist_target_size = Some(size);
        self
    }

    /// Set the shortlist refresh cadence in days
    pub fn shortlist_refresh_days(mut self, days: i64) -> Self {
        self.shortlist_refresh_days = Some(days);
        self
    }

    /// Set the screener exchange code
    pub fn default_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.default_exchange = Some(exchange.into());
        self
    }

    /// Set the agent iteration cap
    pub fn agent_max_iterations(mut self, iterations: usize) -> Self {
        self.agent_max_iterations = Some(iterations);
        self
    }

    /// Set the report recipient label
    pub fn report_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.report_recipient = Some(recipient.into());
        self
    }

    /// Build the settings
    pub fn build(self) -> Settings {
        let defaults = Settings::default();
        Settings {
            anthropic_api_key: self.anthropic_api_key.unwrap_or(defaults.anthropic_api_key),
            model: self.model.unwrap_or(defaults.model),
            agent_max_tokens: self.agent_max_tokens.unwrap_or(defaults.agent_max_tokens),
            market_api_key: self.market_api_key.unwrap_or(defaults.market_api_key),
            market_base_url: self.market_base_url.unwrap_or(defaults.market_base_url),
            market_rate_limit: self.market_rate_limit.unwrap_or(defaults.market_rate_limit),
            broker_username: self.broker_username.unwrap_or(defaults.broker_username),
            broker_password: self.broker_password.unwrap_or(defaults.broker_password),
            thesis_log_path: self.thesis_log_path.unwrap_or(defaults.thesis_log_path),
            decision_log_path: self.decision_log_path.unwrap_or(defaults.decision_log_path),
            shortlist_cache_path: self
                .shortlist_cache_path
                .unwrap_or(defaults.shortlist_cache_path),
            shortlist_target_size: self
                .shortlist_target_size
                .unwrap_or(defaults.shortlist_target_size),
            shortlist_refresh_days: self
                .shortlist_refresh_days
                .unwrap_or(defaults.shortlist_refresh_days),
            default_exchange: self.default_exchange.unwrap_or(defaults.default_exchange),
            agent_max_iterations: self
                .agent_max_iterations
                .unwrap_or(defaults.agent_max_iterations),
            report_recipient: self.report_recipient.unwrap_or(defaults.report_recipient),
        }
    }
}
