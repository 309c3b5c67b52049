//! Prompt and conversation assembly

use smartagent_provider::Message;

use crate::tools::{ToolResult, ToolSet};

/// Builds the system prompt from a base prompt and the loaded tools
pub struct ContextBuilder {
    base_prompt: Option<String>,
}

impl ContextBuilder {
    /// `None` or a blank prompt disables the system message entirely
    pub fn new(base_prompt: Option<&str>) -> Self {
        Self {
            base_prompt: base_prompt
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    pub fn build_system_prompt(&self, tools: &ToolSet) -> Option<String> {
        let base = self.base_prompt.as_ref()?;
        if tools.is_empty() {
            return Some(base.clone());
        }

        let listing: Vec<String> = tools
            .descriptors()
            .iter()
            .map(|d| format!("- {}: {}", d.function.name, d.function.description))
            .collect();

        Some(format!("{}\n\nAvailable tools:\n{}", base, listing.join("\n")))
    }
}

/// Message history for a single query
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: Option<&str>, query: &str) -> Self {
        let mut messages = Vec::with_capacity(4);
        if let Some(prompt) = system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.push(Message::user(query));
        Self { messages }
    }

    /// Append the assistant turn exactly as the model produced it
    pub fn push_assistant(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_tool_result(&mut self, tool_name: &str, result: &ToolResult) {
        self.messages
            .push(Message::tool(tool_name, result.to_message_content(tool_name)));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
