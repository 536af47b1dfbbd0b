//! LLM provider abstraction for the advisor workspace
//!
//! This crate provides the provider-agnostic pieces of the model interface:
//!
//! - Message and content-block types for tool-using conversations
//! - Completion request/response types
//! - Tool definitions in JSON Schema form
//! - The [`LLMProvider`] trait and the Anthropic implementation

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use providers::AnthropicProvider;
pub use tools::ToolDefinition;
