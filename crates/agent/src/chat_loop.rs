//! Tool-augmented chat loop
//!
//! One query runs through at most two model calls: the first offers the
//! tool descriptors, and if the model asks for tools they are executed in
//! order and the results go back in a second call without tools.

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use smartagent_config::{UnknownToolPolicy, DEFAULT_FALLBACK_RESPONSE};
use smartagent_provider::{ChatParams, ChatResponse, Provider, ToolCall, ToolDescriptor};

use crate::context::Conversation;
use crate::tools::{ToolResult, ToolSet};
use crate::{AgentError, Result};

/// Per-loop request settings
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Answer used when the model returns no usable text
    pub fallback_response: String,
    pub unknown_tool: UnknownToolPolicy,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: None,
            max_tokens: None,
            fallback_response: DEFAULT_FALLBACK_RESPONSE.to_string(),
            unknown_tool: UnknownToolPolicy::default(),
        }
    }
}

/// One executed (or rejected) tool call
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub result: ToolResult,
}

/// Structured record of a finished query
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub answer: String,
    pub invocations: Vec<ToolInvocation>,
    pub model_calls: u32,
    pub duration: Duration,
}

impl LoopOutcome {
    pub fn tools_used(&self) -> Vec<String> {
        self.invocations.iter().map(|i| i.name.clone()).collect()
    }
}

pub struct ChatLoop<P: Provider> {
    provider: Arc<P>,
    tools: Arc<ToolSet>,
    settings: LoopSettings,
}

impl<P: Provider> ChatLoop<P> {
    pub fn new(provider: Arc<P>, tools: Arc<ToolSet>, settings: LoopSettings) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Answer `query`, returning only the final text
    pub async fn run(&self, system_prompt: Option<&str>, query: &str) -> Result<String> {
        Ok(self.execute(system_prompt, query).await?.answer)
    }

    pub async fn execute(&self, system_prompt: Option<&str>, query: &str) -> Result<LoopOutcome> {
        let started = Instant::now();
        let mut conversation = Conversation::new(system_prompt, query);
        let descriptors = self.tools.descriptors();

        debug!(
            "Sending query with {} tool(s) to model '{}'",
            descriptors.len(),
            self.settings.model
        );
        let first = self.call(&conversation, descriptors).await?;

        if !first.has_tool_calls() {
            debug!("Model answered directly");
            return Ok(LoopOutcome {
                answer: self.finalize(&first),
                invocations: Vec::new(),
                model_calls: 1,
                duration: started.elapsed(),
            });
        }

        let calls = first.tool_calls.clone();
        conversation.push_assistant(first.message);

        let mut invocations = Vec::with_capacity(calls.len());
        for call in &calls {
            let result = self.dispatch(call).await?;
            conversation.push_tool_result(&call.name, &result);
            invocations.push(ToolInvocation {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                result,
            });
        }

        let last = self.call(&conversation, Vec::new()).await?;
        if last.has_tool_calls() {
            warn!(
                "Ignoring {} tool call(s) in the final response",
                last.tool_calls.len()
            );
        }

        Ok(LoopOutcome {
            answer: self.finalize(&last),
            invocations,
            model_calls: 2,
            duration: started.elapsed(),
        })
    }

    async fn call(
        &self,
        conversation: &Conversation,
        tools: Vec<ToolDescriptor>,
    ) -> Result<ChatResponse> {
        let params = ChatParams {
            model: self.settings.model.clone(),
            messages: conversation.to_vec(),
            tools,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        Ok(self.provider.chat(params).await?)
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult> {
        let Some(tool) = self.tools.get(&call.name) else {
            return match self.settings.unknown_tool {
                UnknownToolPolicy::Abort => Err(AgentError::ToolNotFound(call.name.clone())),
                UnknownToolPolicy::Report => {
                    warn!("Model requested unknown tool '{}'", call.name);
                    Ok(ToolResult::error(format!(
                        "Tool '{}' is not available.",
                        call.name
                    )))
                }
            };
        };

        info!("Calling tool: {}", call.name);
        debug!("Arguments: {}", call.arguments);

        let result = tool.execute(call.arguments.clone()).await?;
        match result.error_message() {
            Some(message) => warn!("Tool '{}' reported an error: {}", call.name, message),
            None => debug!("Tool '{}' completed", call.name),
        }
        Ok(result)
    }

    fn finalize(&self, response: &ChatResponse) -> String {
        match response.content() {
            Some(content) if !content.trim().is_empty() => content.to_string(),
            _ => self.settings.fallback_response.clone(),
        }
    }
}
