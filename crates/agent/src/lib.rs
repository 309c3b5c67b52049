//! SmartAgent core
//!
//! Tool abstraction and built-in tools, the tool registry, the
//! tool-augmented chat loop and the `SmartAgent` facade on top of it.

use thiserror::Error;

pub mod agent;
pub mod chat_loop;
pub mod context;
pub mod tools;

pub use agent::{AgentResponse, AgentSettings, SmartAgent};
pub use chat_loop::{ChatLoop, LoopOutcome, LoopSettings, ToolInvocation};
pub use context::{ContextBuilder, Conversation};
pub use smartagent_config::UnknownToolPolicy;
pub use tools::{Tool, ToolError, ToolRegistry, ToolResult, ToolSet};

use smartagent_provider::ProviderError;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("model requested unknown tool '{0}'")]
    ToolNotFound(String),
}

impl AgentError {
    /// True when the chat endpoint (or its model) is not ready
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, AgentError::Provider(e) if e.is_upstream_unavailable())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
