//! Candidate shortlist maintenance
//!
//! Keeps a small cached universe of dividend large caps so a run does not
//! re-screen the whole exchange every day. The cache is a JSON file with a
//! refresh timestamp; anything unreadable is treated as absent.

use crate::error::{AdvisorError, Result};
use crate::market::MarketData;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cached screener output plus its refresh timestamp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shortlist {
    #[serde(default)]
    pub tickers: Vec<Value>,
    #[serde(default)]
    pub last_refresh: Option<String>,
}

/// Refreshes and persists the candidate shortlist
pub struct ShortlistPipeline {
    cache_path: PathBuf,
    target_size: usize,
    refresh_days: i64,
    exchange: String,
}

impl ShortlistPipeline {
    pub fn new(
        cache_path: impl Into<PathBuf>,
        target_size: usize,
        refresh_days: i64,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            cache_path: cache_path.into(),
            target_size,
            refresh_days,
            exchange: exchange.into(),
        }
    }

    /// Read the cached shortlist, falling back to an empty one
    pub fn load(&self) -> Shortlist {
        let raw = match fs::read_to_string(&self.cache_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Shortlist::default(),
            Err(e) => {
                warn!(
                    path = %self.cache_path.display(),
                    error = %e,
                    "Failed to read shortlist cache"
                );
                return Shortlist::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(shortlist) => shortlist,
            Err(_) => {
                warn!("Shortlist cache corrupted; starting fresh");
                Shortlist::default()
            }
        }
    }

    /// Persist a shortlist with a fresh refresh timestamp
    pub fn save(&self, tickers: Vec<Value>) -> Result<Shortlist> {
        let shortlist = Shortlist {
            tickers,
            last_refresh: Some(Utc::now().to_rfc3339()),
        };
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| cache_error("create cache directory for", &self.cache_path, &e))?;
            }
        }
        let body = serde_json::to_string_pretty(&shortlist)?;
        fs::write(&self.cache_path, body)
            .map_err(|e| cache_error("write", &self.cache_path, &e))?;
        Ok(shortlist)
    }

    pub fn needs_refresh(&self, cache: &Shortlist) -> bool {
        let Some(last_refresh) = cache.last_refresh.as_deref().filter(|s| !s.is_empty()) else {
            return true;
        };
        let Ok(refreshed_at) = DateTime::parse_from_rfc3339(last_refresh) else {
            return true;
        };
        Utc::now() - refreshed_at.with_timezone(&Utc) >= Duration::days(self.refresh_days)
    }

    /// Re-screen the exchange and persist the strongest candidates
    pub async fn refresh(&self, market: &dyn MarketData) -> Result<Shortlist> {
        info!(exchange = %self.exchange, "Refreshing shortlist");
        let mut universe = market.screen_dividend_large_caps(&self.exchange).await?;
        universe.sort_by(|a, b| {
            entry_metric(b, "avg_volume")
                .total_cmp(&entry_metric(a, "avg_volume"))
                .then_with(|| {
                    entry_metric(b, "market_cap").total_cmp(&entry_metric(a, "market_cap"))
                })
        });
        universe.truncate(self.target_size);
        self.save(universe)
    }

    /// Return the cached shortlist, refreshing it first when stale
    pub async fn ensure_shortlist(&self, market: &dyn MarketData) -> Result<Shortlist> {
        let cache = self.load();
        if self.needs_refresh(&cache) {
            return self.refresh(market).await;
        }
        debug!("Using cached shortlist");
        Ok(cache)
    }
}

/// Ticker symbol of a screener entry, whichever key the vendor used
pub fn entry_symbol(entry: &Value) -> Option<String> {
    ["code", "ticker", "symbol"].iter().find_map(|key| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn entry_metric(entry: &Value, key: &str) -> f64 {
    entry.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn cache_error(action: &str, path: &Path, source: &io::Error) -> AdvisorError {
    AdvisorError::Cache(format!("{action} {}: {source}", path.display()))
}
