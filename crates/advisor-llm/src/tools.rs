//! Tool definition types for LLM tool use

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition for LLM provider
///
/// This describes a tool that the LLM can use, including its name,
/// description, and input schema in JSON Schema format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the name the dispatcher accepts)
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Helper module to build JSON schemas for tools
pub mod schema {
    use serde_json::{Value, json};

    /// Create a JSON schema for an object with properties
    ///
    /// # Example
    ///
    /// ```
    /// use advisor_llm::tools::schema;
    /// use serde_json::json;
    ///
    /// let schema = schema::object(
    ///     json!({
    ///         "ticker": schema::string("Stock ticker symbol"),
    ///     }),
    ///     vec!["ticker"],
    /// );
    /// ```
    pub fn object(properties: Value, required: Vec<&str>) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// String property schema
    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }

    /// String property constrained to a fixed set of values
    pub fn string_enum(description: &str, values: &[&str]) -> Value {
        json!({
            "type": "string",
            "description": description,
            "enum": values,
        })
    }

    /// Number property schema
    pub fn number(description: &str) -> Value {
        json!({
            "type": "number",
            "description": description,
        })
    }

    /// Number property with a lower bound
    pub fn number_min(description: &str, minimum: f64) -> Value {
        json!({
            "type": "number",
            "description": description,
            "minimum": minimum,
        })
    }

    /// Integer property schema
    pub fn integer(description: &str) -> Value {
        json!({
            "type": "integer",
            "description": description,
        })
    }

    /// Integer property with a lower bound
    pub fn integer_min(description: &str, minimum: i64) -> Value {
        json!({
            "type": "integer",
            "description": description,
            "minimum": minimum,
        })
    }

    /// Integer property with a default value
    pub fn integer_default(description: &str, default: i64) -> Value {
        json!({
            "type": "integer",
            "description": description,
            "default": default,
        })
    }

    /// Boolean property schema
    pub fn boolean(description: &str) -> Value {
        json!({
            "type": "boolean",
            "description": description,
        })
    }

    /// Array property schema
    pub fn array(description: &str, items: Value) -> Value {
        json!({
            "type": "array",
            "description": description,
            "items": items,
        })
    }

    /// Free-form object property schema
    pub fn object_property(description: &str) -> Value {
        json!({
            "type": "object",
            "description": description,
        })
    }
}
