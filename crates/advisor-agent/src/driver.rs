//! Agent loop driver
//!
//! One driver run is a bounded conversation:
//! 1. Send the conversation with tool schemas to the model
//! 2. Zero tool-use blocks in the reply means the answer is final
//! 3. Otherwise dispatch every requested tool, append the results in request
//!    order, and loop
//!
//! Tool failures become error-flagged tool results the model can react to on
//! its next turn; only a failed model round-trip ends the run early.

use crate::dispatch::ToolDispatcher;
use crate::report::{AgentRunReport, RunOutcome, ToolCallRecord};
use advisor_llm::{CompletionRequest, ContentBlock, LLMProvider, Message};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Characters of serialized tool output kept in bookkeeping records
const RESULT_PREVIEW_CHARS: usize = 200;

/// Characters of tool input echoed into logs
const INPUT_LOG_CHARS: usize = 100;

/// Configuration for one agent driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum number of model round-trips (prevents runaway loops)
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt sent with every request
    pub system_prompt: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "claude-3-5-sonnet-latest".to_string(),
            system_prompt: String::new(),
            max_tokens: 4096,
            temperature: None,
        }
    }
}

/// Drives a bounded tool-use conversation against one provider and dispatcher
pub struct AgentDriver {
    provider: Arc<dyn LLMProvider>,
    dispatcher: Arc<dyn ToolDispatcher>,
    config: DriverConfig,
}

impl AgentDriver {
    /// Create a driver with an explicit configuration
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: DriverConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            config,
        }
    }

    /// Create a builder over the given provider and dispatcher
    pub fn builder(
        provider: Arc<dyn LLMProvider>,
        dispatcher: Arc<dyn ToolDispatcher>,
    ) -> AgentDriverBuilder {
        AgentDriverBuilder {
            provider,
            dispatcher,
            config: DriverConfig::default(),
        }
    }

    /// Run the loop from an initial user message until a terminal outcome
    ///
    /// Never fails: transport errors and iteration exhaustion are reported in
    /// the returned [`AgentRunReport`], alongside partial tool bookkeeping.
    pub async fn run(&self, initial_message: impl Into<String>) -> AgentRunReport {
        let mut conversation = vec![Message::user(initial_message)];
        let mut tool_calls: Vec<ToolCallRecord> = Vec::new();
        let mut iteration = 0;

        let tools = self.dispatcher.definitions();
        info!(
            tool_count = tools.len(),
            max_iterations = self.config.max_iterations,
            model = %self.config.model,
            "Starting agent loop"
        );

        while iteration < self.config.max_iterations {
            iteration += 1;
            debug!(
                iteration,
                max_iterations = self.config.max_iterations,
                "Agent iteration"
            );

            let mut builder = CompletionRequest::builder(&self.config.model)
                .messages(conversation.clone())
                .system(self.config.system_prompt.clone())
                .max_tokens(self.config.max_tokens);
            if let Some(temperature) = self.config.temperature {
                builder = builder.temperature(temperature);
            }
            if !tools.is_empty() {
                builder = builder.tools(tools.clone());
            }

            let response = match self.provider.complete(builder.build()).await {
                Ok(response) => response,
                Err(e) => {
                    error!(iteration, error = %e, "Model round-trip failed");
                    return AgentRunReport {
                        content: format!("Agent encountered an error: {e}"),
                        iterations: iteration,
                        tool_calls,
                        outcome: RunOutcome::Errored {
                            error: e.to_string(),
                        },
                    };
                }
            };

            info!(
                iteration,
                stop_reason = response.stop_reason.as_str(),
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model response received"
            );

            let requested: Vec<(String, String, Value)> = response
                .message
                .tool_uses()
                .into_iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            conversation.push(response.message.clone());

            if requested.is_empty() {
                let content = response.message.text_blocks().join("\n");
                info!(
                    iteration,
                    tool_call_count = tool_calls.len(),
                    "Agent completed with a final answer"
                );
                return AgentRunReport {
                    content,
                    iterations: iteration,
                    tool_calls,
                    outcome: RunOutcome::Done {
                        stop_reason: response.stop_reason,
                    },
                };
            }

            let mut results = Vec::with_capacity(requested.len());
            for (id, name, input) in requested {
                let input_preview: String =
                    input.to_string().chars().take(INPUT_LOG_CHARS).collect();
                info!(tool = %name, input_preview = %input_preview, "Executing tool");

                match self.dispatcher.dispatch(&name, &input).await {
                    Ok(value) => {
                        let serialized = value.to_string();
                        let preview: String =
                            serialized.chars().take(RESULT_PREVIEW_CHARS).collect();
                        debug!(
                            tool = %name,
                            result_length = serialized.len(),
                            "Tool execution succeeded"
                        );
                        tool_calls.push(ToolCallRecord::success(&name, input, preview));
                        results.push(ContentBlock::tool_result(id, serialized));
                    }
                    Err(e) => {
                        warn!(tool = %name, error = %e, "Tool execution failed");
                        let error_text = e.to_string();
                        results.push(ContentBlock::tool_error(
                            id,
                            json!({ "error": error_text }).to_string(),
                        ));
                        tool_calls.push(ToolCallRecord::failure(&name, input, error_text));
                    }
                }
            }

            // One user message carries all results, in request order
            conversation.push(Message::tool_results(results));
        }

        warn!(
            max_iterations = self.config.max_iterations,
            tool_call_count = tool_calls.len(),
            "Agent reached iteration cap without completing"
        );
        AgentRunReport {
            content: "Agent reached maximum iterations without completing.".to_string(),
            iterations: iteration,
            tool_calls,
            outcome: RunOutcome::MaxIterations,
        }
    }
}

/// Builder for [`AgentDriver`]
pub struct AgentDriverBuilder {
    provider: Arc<dyn LLMProvider>,
    dispatcher: Arc<dyn ToolDispatcher>,
    config: DriverConfig,
}

impl AgentDriverBuilder {
    /// Set maximum iterations
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set max tokens per completion
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Build the driver
    pub fn build(self) -> AgentDriver {
        AgentDriver::new(self.provider, self.dispatcher, self.config)
    }
}
