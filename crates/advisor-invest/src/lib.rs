//! Long-term investment advisor
//!
//! This crate implements a dividend-focused equity advisor built around
//! deterministic scoring and auditable decision records. It includes:
//!
//! - Fundamentals-driven scoring (yield, profitability, balance-sheet stability)
//! - News summarization into sentiment-tagged narrative insights
//! - A recommendation engine with a minimum holding period for exits
//! - Append-only JSONL audit logs for theses and approval decisions
//! - A cached shortlist of dividend-paying large caps
//! - A closed tool registry the agent loop drives
//! - A manual approval gate in front of every mock trade
//!
//! # Architecture
//!
//! Two orchestrators share the same engine and logs:
//! - `AgentOrchestrator`: hands the toolbox to the model for a bounded
//!   analysis session
//! - `DailyScreening`: walks the cached shortlist mechanically and gates
//!   every proposed trade through manual approval
//!
//! # Example
//!
//! ```rust,ignore
//! use advisor_invest::{AgentOrchestrator, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env();
//!     let orchestrator = AgentOrchestrator::from_settings(&settings)?;
//!
//!     let report = orchestrator.run().await?;
//!     println!("{}", advisor_invest::report::render_agent_report(&report));
//!
//!     Ok(())
//! }
//! ```

pub mod approval;
pub mod audit;
pub mod broker;
pub mod config;
pub mod engine;
pub mod error;
pub mod market;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod scoring;
pub mod shortlist;
pub mod summarizer;
pub mod tools;

// Re-export main types for convenience
pub use approval::ApprovalGate;
pub use audit::AuditLog;
pub use broker::{Broker, MockBroker};
pub use config::Settings;
pub use engine::DecisionEngine;
pub use error::{AdvisorError, Result};
pub use market::{EodhdClient, MarketData};
pub use model::{
    AccountFunds, ApprovalDecision, ApprovalOutcome, NarrativeInsight, OrderConfirmation,
    OrderSide, OrderTicket, Position, Recommendation, Thesis,
};
pub use orchestrator::{AgentOrchestrator, DailyScreening};
pub use report::{ConsoleSink, ReportSink};
pub use shortlist::{Shortlist, ShortlistPipeline};
pub use summarizer::{InsightPayload, LlmNewsSummarizer, NewsSummarizer};
pub use tools::{InvestmentToolbox, ToolRequest};
