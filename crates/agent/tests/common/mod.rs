//! Shared test helpers

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use smartagent_provider::{ChatParams, ChatResponse, Provider, ProviderError, ToolCall};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Provider that replays scripted responses and records every request
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    responses: Arc<Mutex<VecDeque<Result<ChatResponse, ProviderError>>>>,
    calls: Arc<Mutex<Vec<ChatParams>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, response: Result<ChatResponse, ProviderError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn then_text(self, content: &str) -> Self {
        self.then(Ok(ChatResponse::text(content)))
    }

    pub fn then_tools(self, calls: Vec<ToolCall>) -> Self {
        self.then(Ok(ChatResponse::with_tool_calls(None, calls)))
    }

    /// Requests seen so far
    pub fn calls(&self) -> Vec<ChatParams> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.calls.lock().unwrap().push(params);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Api("script exhausted".to_string())))
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }

    async fn check_ready(&self, _model: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

/// Temporary directory holding data files for tool calls
pub struct Fixtures {
    pub dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> String {
        let path: PathBuf = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write fixture");
        path.to_string_lossy().into_owned()
    }
}
