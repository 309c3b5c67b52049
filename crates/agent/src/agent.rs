//! SmartAgent facade

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use smartagent_config::{Config, UnknownToolPolicy};
use smartagent_provider::Provider;

use crate::chat_loop::{ChatLoop, LoopOutcome, LoopSettings};
use crate::context::ContextBuilder;
use crate::tools::{ToolRegistry, ToolSet};
use crate::Result;

/// Settings the facade needs from configuration
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Empty means the provider's default model
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// `None` disables the system message
    pub system_prompt: Option<String>,
    pub fallback_response: String,
    pub unknown_tool: UnknownToolPolicy,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model_name(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            system_prompt: config.system_prompt().map(str::to_string),
            fallback_response: config.agent.fallback_response.clone(),
            unknown_tool: config.agent.unknown_tool,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Answer plus what it took to produce it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub tools_used: Vec<String>,
    pub duration_ms: u64,
}

impl From<LoopOutcome> for AgentResponse {
    fn from(outcome: LoopOutcome) -> Self {
        Self {
            tools_used: outcome.tools_used(),
            duration_ms: outcome.duration.as_millis() as u64,
            content: outcome.answer,
        }
    }
}

/// Tool-augmented assistant over a chat provider.
///
/// Holds only immutable state after construction, so one instance can be
/// shared behind an `Arc` by concurrent callers.
pub struct SmartAgent<P: Provider> {
    provider: Arc<P>,
    tools: Arc<ToolSet>,
    system_prompt: Option<String>,
    chat_loop: ChatLoop<P>,
}

impl<P: Provider> SmartAgent<P> {
    pub fn new(provider: P, registry: &ToolRegistry, settings: AgentSettings) -> Self {
        let provider = Arc::new(provider);
        let tools = registry.load();

        let system_prompt = ContextBuilder::new(settings.system_prompt.as_deref())
            .build_system_prompt(&tools);

        let model = if settings.model.trim().is_empty() {
            provider.default_model()
        } else {
            settings.model
        };
        debug!("SmartAgent using model '{}' with {} tool(s)", model, tools.len());

        let chat_loop = ChatLoop::new(
            provider.clone(),
            tools.clone(),
            LoopSettings {
                model,
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
                fallback_response: settings.fallback_response,
                unknown_tool: settings.unknown_tool,
            },
        );

        Self {
            provider,
            tools,
            system_prompt,
            chat_loop,
        }
    }

    /// Answer a query
    pub async fn run(&self, query: &str) -> Result<String> {
        self.chat_loop.run(self.system_prompt.as_deref(), query).await
    }

    /// Answer a query with timing and tool usage
    pub async fn respond(&self, query: &str) -> Result<AgentResponse> {
        let outcome = self
            .chat_loop
            .execute(self.system_prompt.as_deref(), query)
            .await?;
        info!(
            "Query answered in {}ms using {} tool call(s)",
            outcome.duration.as_millis(),
            outcome.invocations.len()
        );
        Ok(outcome.into())
    }

    /// Full loop record, for callers that need every invocation
    pub async fn execute(&self, query: &str) -> Result<LoopOutcome> {
        self.chat_loop
            .execute(self.system_prompt.as_deref(), query)
            .await
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.chat_loop.settings().model
    }

    /// Ask the provider whether the configured model can be served
    pub async fn check_ready(&self) -> Result<()> {
        Ok(self.provider.check_ready(self.model()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.model.name = "mistral:7b".to_string();
        config.model.temperature = Some(0.2);
        config.agent.system_prompt = String::new();
        config.agent.unknown_tool = UnknownToolPolicy::Abort;

        let settings = AgentSettings::from_config(&config);
        assert_eq!(settings.model, "mistral:7b");
        assert_eq!(settings.temperature, Some(0.2));
        assert_eq!(settings.system_prompt, None);
        assert_eq!(settings.unknown_tool, UnknownToolPolicy::Abort);
        assert_eq!(settings.fallback_response, "No response from model.");
    }

    #[test]
    fn test_default_settings_have_prompt() {
        let settings = AgentSettings::default();
        assert!(settings.system_prompt.is_some());
        assert_eq!(settings.model, "llama3.1:8b");
    }

    #[test]
    fn test_response_from_outcome() {
        let outcome = LoopOutcome {
            answer: "done".to_string(),
            invocations: Vec::new(),
            model_calls: 1,
            duration: std::time::Duration::from_millis(1500),
        };
        let response = AgentResponse::from(outcome);
        assert_eq!(response.content, "done");
        assert_eq!(response.duration_ms, 1500);
        assert!(response.tools_used.is_empty());
    }
}
