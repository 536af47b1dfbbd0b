//! Bounded tool-use conversation driver
//!
//! This crate owns the agent loop: send the conversation to the model, detect
//! tool-use requests, dispatch them to the host, feed results back, and stop
//! on a final text answer, a model transport failure, or the iteration cap.
//! Tool failures never abort the loop; they are surfaced to the model as
//! error-flagged tool results.

pub mod dispatch;
pub mod driver;
pub mod report;

pub use dispatch::{DispatchError, ToolDispatcher};
pub use driver::{AgentDriver, AgentDriverBuilder, DriverConfig};
pub use report::{AgentRunReport, RunOutcome, ToolCallRecord};
