//! Tool dispatch seam between the loop driver and its host

use advisor_llm::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a tool dispatcher
///
/// Both variants are recoverable from the loop's point of view: the display
/// text is fed back to the model as an error-flagged tool result.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The model asked for a tool outside the registered set
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The model supplied arguments the tool could not accept
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments {
        /// Tool that rejected the arguments
        tool: String,
        /// What was wrong with them
        message: String,
    },

    /// The tool ran and failed
    #[error("{0}")]
    ExecutionFailed(String),
}

/// Host-side executor for model-requested tool calls
///
/// Implementations expose the schemas the model may call and execute one call
/// at a time. The driver never inspects results; it serializes whatever comes
/// back into the conversation.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Schemas for every tool this dispatcher accepts
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute one tool call by name with the model-supplied input
    async fn dispatch(&self, name: &str, input: &Value) -> Result<Value, DispatchError>;
}
