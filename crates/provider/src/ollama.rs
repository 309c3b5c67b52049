//! Ollama chat client
//!
//! Talks to a local Ollama daemon over its native `/api/chat` endpoint.

use crate::*;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Ollama provider
pub struct OllamaProvider {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    default_model: String,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>, default_model: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, default_model)
    }

    /// Provider whose chat requests give up after `timeout`
    pub fn with_timeout(
        base_url: Option<String>,
        default_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, default_model))
    }

    fn with_client(client: Client, base_url: Option<String>, default_model: Option<String>) -> Self {
        let base_url = base_url
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let default_model = default_model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            client,
            base_url,
            default_model,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a transport failure while sending or reading a body; unreachable
    /// or unresponsive daemons get remediation text
    pub(crate) fn map_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_connect() || err.is_timeout() {
            ProviderError::Unavailable(service_unavailable_message(&self.base_url))
        } else {
            ProviderError::Request(err)
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let mut body = json!({
            "model": model,
            "messages": params.messages,
            "stream": false,
        });

        if !params.tools.is_empty() {
            body["tools"] = json!(params.tools);
        }

        let mut options = serde_json::Map::new();
        if let Some(temperature) = params.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = params.max_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if !options.is_empty() {
            body["options"] = serde_json::Value::Object(options);
        }

        body
    }

    fn parse_response(&self, mut json: serde_json::Value) -> Result<ChatResponse> {
        let raw_message = json
            .get_mut("message")
            .map(serde_json::Value::take)
            .filter(|m| m.is_object())
            .ok_or_else(|| ProviderError::InvalidResponse("missing 'message'".to_string()))?;
        let message: Message = serde_json::from_value(raw_message)?;

        let mut tool_calls = Vec::new();
        if let Some(defs) = &message.tool_calls {
            for (index, def) in defs.iter().enumerate() {
                if def.function.name.trim().is_empty() {
                    return Err(ProviderError::InvalidResponse(format!(
                        "tool call #{} has no function name",
                        index
                    )));
                }
                tool_calls.push(ToolCall {
                    id: def
                        .id
                        .clone()
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                    name: def.function.name.clone(),
                    arguments: normalize_arguments(&def.function.arguments),
                });
            }
        }

        let finish_reason = json["done_reason"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| {
                if tool_calls.is_empty() {
                    "stop".to_string()
                } else {
                    "tool_calls".to_string()
                }
            });

        let prompt_tokens = json["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = json["eval_count"].as_u64().unwrap_or(0) as u32;

        Ok(ChatResponse {
            message,
            tool_calls,
            finish_reason,
            usage: Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }
}

/// Arguments arrive as an object, or as a JSON-encoded string from some models
fn normalize_arguments(arguments: &serde_json::Value) -> serde_json::Value {
    match arguments {
        serde_json::Value::String(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| arguments.clone())
        }
        serde_json::Value::Null => json!({}),
        other => other.clone(),
    }
}

pub(crate) fn service_unavailable_message(base_url: &str) -> String {
    format!(
        "Ollama service is not running or not accessible at {base}.\n\
         Please ensure Ollama is installed and running:\n  \
         1. Install Ollama: https://ollama.ai/\n  \
         2. Start Ollama service: 'ollama serve'\n  \
         3. Or use Docker: 'docker run -d -p 11434:11434 ollama/ollama:latest'\n  \
         4. Verify service: 'curl {base}/api/version'",
        base = base_url
    )
}

#[async_trait::async_trait]
impl Provider for OllamaProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        trace!("Sending chat request to {}", self.base_url);

        let body = self.build_request(&params);
        let model = body["model"].as_str().unwrap_or_default().to_string();

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let error = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));

            if status == StatusCode::NOT_FOUND && error.contains("not found") {
                let available = self.list_models().await.unwrap_or_default();
                return Err(ProviderError::ModelNotFound { model, available });
            }
            return Err(ProviderError::Api(error));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        let response = self.parse_response(json)?;

        debug!(
            "Chat response: {} tool call(s), finish_reason={}",
            response.tool_calls.len(),
            response.finish_reason
        );

        Ok(response)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    async fn check_ready(&self, model: &str) -> Result<()> {
        self.validate_setup(model).await
    }
}
