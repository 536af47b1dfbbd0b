//! Data models for theses, positions, and orders

use crate::error::{AdvisorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action recommended for one ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Hold,
    Trim,
    Exit,
}

impl Recommendation {
    /// Wire-format label, matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Hold => "hold",
            Self::Trim => "trim",
            Self::Exit => "exit",
        }
    }
}

/// One narrative insight distilled from recent news
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeInsight {
    pub headline: String,
    #[serde(default = "neutral_sentiment")]
    pub sentiment: String,
    pub summary: String,
}

pub(crate) fn neutral_sentiment() -> String {
    "neutral".to_string()
}

/// Explainable output of one evaluation for one ticker
///
/// `conviction` is always the fixed-weight blend of the three component
/// scores; it is never set independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub ticker: String,
    pub recommendation: Recommendation,
    pub conviction: f64,
    pub quantitative_score: f64,
    pub qualitative_score: f64,
    pub stability_score: f64,
    pub rationale: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub catalysts: Vec<String>,
    #[serde(default)]
    pub insights: Vec<NarrativeInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// One held position as reported by the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub name: String,
    pub quantity: u32,
    pub average_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
}

/// Cash and account value snapshot from the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFunds {
    pub currency: String,
    pub available_cash: f64,
    pub total_value: f64,
    pub invested_value: f64,
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order proposal sent to the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub price: f64,
}

impl OrderTicket {
    /// Reject tickets a broker could never fill
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(AdvisorError::InvalidInput(
                "order ticker must not be empty".to_string(),
            ));
        }
        if self.quantity < 1 {
            return Err(AdvisorError::InvalidInput(
                "order quantity must be at least 1".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AdvisorError::InvalidInput(
                "order price must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Notional value of the ticket
    pub fn total_value(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

/// Simulated fill details echoed back by the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub price: f64,
    pub total_value: f64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Human decision on one proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    Skipped,
}

impl ApprovalDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of one approval gate interaction
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub thesis: Thesis,
    pub approved: bool,
    pub decision: ApprovalDecision,
}
