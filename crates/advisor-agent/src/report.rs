//! Run report types for the agent loop

use advisor_llm::StopReason;
use serde::Serialize;
use serde_json::Value;

/// Bookkeeping entry for one tool invocation, success or failure
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Tool name as requested by the model
    pub tool: String,

    /// Model-supplied input arguments
    pub input: Value,

    /// Whether the call succeeded
    pub success: bool,

    /// Truncated serialized result (successful calls only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_preview: Option<String>,

    /// Error text (failed calls only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallRecord {
    /// Record a successful call
    pub fn success(tool: impl Into<String>, input: Value, result_preview: String) -> Self {
        Self {
            tool: tool.into(),
            input,
            success: true,
            result_preview: Some(result_preview),
            error: None,
        }
    }

    /// Record a failed call
    pub fn failure(tool: impl Into<String>, input: Value, error: String) -> Self {
        Self {
            tool: tool.into(),
            input,
            success: false,
            result_preview: None,
            error: Some(error),
        }
    }
}

/// Terminal outcome of one agent run
///
/// All three are valid ends of a run; callers must present them distinctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model produced a final text answer
    Done {
        /// Stop reason reported by the provider on the final turn
        stop_reason: StopReason,
    },

    /// The model round-trip itself failed; the run holds partial bookkeeping
    Errored {
        /// Transport/provider error text
        error: String,
    },

    /// The iteration cap was reached before a final answer
    MaxIterations,
}

impl RunOutcome {
    /// Short label for reports and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Done { .. } => "done",
            Self::Errored { .. } => "errored",
            Self::MaxIterations => "max_iterations",
        }
    }
}

/// Result of one bounded agent run
#[derive(Debug, Clone, Serialize)]
pub struct AgentRunReport {
    /// Final content: the model's answer, an error note, or the cap sentinel
    pub content: String,

    /// Number of model round-trips performed
    pub iterations: usize,

    /// Every tool invocation in call order
    pub tool_calls: Vec<ToolCallRecord>,

    /// How the run ended
    pub outcome: RunOutcome,
}

impl AgentRunReport {
    /// Whether the run reached a final answer
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, RunOutcome::Done { .. })
    }

    /// Failed tool invocations, in call order
    pub fn failed_calls(&self) -> Vec<&ToolCallRecord> {
        self.tool_calls.iter().filter(|c| !c.success).collect()
    }
}
