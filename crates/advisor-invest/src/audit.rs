//! Append-only JSONL audit logs
//!
//! Both the thesis log (evaluations) and the decision log (approval
//! outcomes) are instances of the same store: one JSON object per line, a
//! fresh UTC timestamp injected on every append, never rewritten or
//! compacted. Readers tolerate malformed lines so a partially-written tail
//! cannot poison holding-period lookups.

use crate::error::{AdvisorError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Append-only JSONL record store
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

/// Lenient view of one persisted line, enough for holding-period lookups
#[derive(Debug, Deserialize)]
struct ScanRecord {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    recommendation: String,
    #[serde(default)]
    ts: Option<String>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, stamping a fresh UTC timestamp
    ///
    /// Creates the parent directory on first use. I/O failures surface to
    /// the caller; a silently dropped audit record would corrupt
    /// holding-period tracking.
    pub fn append(&self, record: &Value) -> Result<()> {
        let mut enriched = match record {
            Value::Object(map) => map.clone(),
            other => {
                return Err(AdvisorError::InvalidInput(format!(
                    "audit record must be a JSON object, got {other}"
                )));
            }
        };
        enriched.insert("ts".to_string(), Value::String(Utc::now().to_rfc3339()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error("create parent", &e))?;
            }
        }
        let line = serde_json::to_string(&Value::Object(enriched))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error("open", &e))?;
        writeln!(file, "{line}").map_err(|e| self.io_error("write", &e))?;
        debug!(path = %self.path.display(), "Audit record appended");
        Ok(())
    }

    /// Timestamp of the first buy recommendation for `ticker`, in file order
    ///
    /// File order defines "first"; record timestamps are not compared.
    /// Missing store, malformed lines, and unparseable timestamps all
    /// degrade to skipping, never to an error.
    pub fn find_first_buy(&self, ticker: &str) -> Option<DateTime<Utc>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to open audit log");
                return None;
            }
        };
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Failed to read audit log line");
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let record: ScanRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping malformed audit log line");
                    continue;
                }
            };
            if record.ticker != ticker || record.recommendation != "buy" {
                continue;
            }
            let Some(ts) = record.ts.as_deref() else {
                continue;
            };
            match DateTime::parse_from_rfc3339(ts) {
                Ok(parsed) => return Some(parsed.with_timezone(&Utc)),
                Err(e) => {
                    warn!(line = index + 1, ticker, error = %e, "Skipping buy record with unparseable timestamp");
                }
            }
        }
        None
    }

    /// All parseable records in file order
    ///
    /// Missing store yields an empty list; malformed lines are skipped with
    /// a warning.
    pub fn records(&self) -> Vec<Value> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to open audit log");
                return Vec::new();
            }
        };
        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let Ok(line) = line else {
                warn!(path = %self.path.display(), "Failed to read audit log line");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(value) => records.push(value),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping malformed audit log line");
                }
            }
        }
        records
    }

    fn io_error(&self, action: &str, source: &std::io::Error) -> AdvisorError {
        AdvisorError::AuditLog(format!("{action} {}: {source}", self.path.display()))
    }
}
