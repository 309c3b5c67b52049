//! Tools the model can call

pub mod csv;
pub mod markdown;
pub mod registry;

pub use self::csv::CsvTool;
pub use markdown::MarkdownTool;
pub use registry::{ToolFactory, ToolRegistry, ToolSet};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smartagent_provider::ToolDescriptor;
use std::sync::Arc;
use thiserror::Error;

/// Contract violations raised by a tool.
///
/// Expected failures such as a missing file are not errors; they are
/// reported through [`ToolResult::error`].
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{tool}' failed: {message}")]
    Execution { tool: String, message: String },
}

/// Output of a tool run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub data: Value,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ToolResult {
    pub fn new(data: impl Into<Value>, meta: Map<String, Value>) -> Self {
        Self {
            data: data.into(),
            meta,
        }
    }

    /// Recoverable failure: empty payload with `meta.error` set
    pub fn error(message: impl Into<String>) -> Self {
        let mut meta = Map::new();
        meta.insert("error".to_string(), Value::String(message.into()));
        Self {
            data: Value::String(String::new()),
            meta,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.meta.get("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.meta.contains_key("error")
    }

    /// Plain-text rendering fed back to the model as a tool message
    pub fn to_message_content(&self, tool_name: &str) -> String {
        let data = match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!(
            "Tool '{}' returned: {}\nMetadata: {}",
            tool_name,
            data,
            Value::Object(self.meta.clone())
        )
    }
}

/// A named capability the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    /// Schema sent to the model; must match what `execute` accepts
    fn describe(&self) -> ToolDescriptor;
    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError>;
}

/// Deserialize model-supplied arguments into a tool's argument struct
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

/// Factories for the tools shipped with this crate
pub fn builtin_tools() -> Vec<ToolFactory> {
    vec![
        Box::new(|| Arc::new(CsvTool::new()) as Arc<dyn Tool>),
        Box::new(|| Arc::new(MarkdownTool::new()) as Arc<dyn Tool>),
    ]
}
