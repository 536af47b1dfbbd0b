//! Error types for the investing domain

use thiserror::Error;

/// Investing domain errors
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Malformed caller input, rejected before any collaborator call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Broker collaborator failure
    #[error("Broker error: {0}")]
    Broker(String),

    /// Market data vendor failure
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Audit log read or write failure
    #[error("Audit log error: {0}")]
    AuditLog(String),

    /// Shortlist cache read or write failure
    #[error("Shortlist cache error: {0}")]
    Cache(String),

    /// Model collaborator failure
    #[error("Model error: {0}")]
    Llm(#[from] advisor_llm::LLMError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report delivery failure
    #[error("Report delivery error: {0}")]
    Delivery(String),
}

/// Result type alias for investing operations
pub type Result<T> = std::result::Result<T, AdvisorError>;
