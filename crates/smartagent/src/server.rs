//! HTTP API

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use smartagent_agent::SmartAgent;
use smartagent_provider::Provider;

type SharedAgent<P> = Arc<SmartAgent<P>>;

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Serialize)]
struct AnswerResponse {
    answer: String,
}

pub fn build_app<P: Provider + 'static>(agent: SharedAgent<P>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/answer", post(answer::<P>))
        .layer(TraceLayer::new_for_http())
        .with_state(agent)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn answer<P: Provider + 'static>(
    State(agent): State<SharedAgent<P>>,
    Json(request): Json<AnswerRequest>,
) -> Response {
    match agent.run(&request.query).await {
        Ok(answer) => Json(AnswerResponse { answer }).into_response(),
        Err(e) if e.is_upstream_unavailable() => {
            warn!("Model not ready: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            error!("Query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use smartagent_agent::{AgentSettings, ToolRegistry};
    use smartagent_provider::{ChatParams, ChatResponse, ProviderError};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct StubProvider {
        outcome: fn() -> Result<ChatResponse, ProviderError>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError> {
            if let Some(text) = params.messages.last().and_then(|m| m.text()) {
                self.queries.lock().unwrap().push(text.to_string());
            }
            (self.outcome)()
        }

        fn default_model(&self) -> String {
            "stub".to_string()
        }

        async fn check_ready(&self, _model: &str) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn app_with(outcome: fn() -> Result<ChatResponse, ProviderError>) -> (Router, Arc<Mutex<Vec<String>>>) {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let provider = StubProvider {
            outcome,
            queries: queries.clone(),
        };
        let agent = SmartAgent::new(provider, &ToolRegistry::builtin(), AgentSettings::default());
        (build_app(Arc::new(agent)), queries)
    }

    fn post_answer(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/answer")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _) = app_with(|| Ok(ChatResponse::text("unused")));
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_answer_returns_model_text() {
        let (app, queries) = app_with(|| Ok(ChatResponse::text("4")));
        let response = app.oneshot(post_answer(r#"{"query": "what is 2+2"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"answer": "4"}));
        assert_eq!(queries.lock().unwrap().as_slice(), ["what is 2+2".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_query_is_empty_string() {
        let (app, queries) = app_with(|| Ok(ChatResponse::text("Ask me something.")));
        let response = app.oneshot(post_answer("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(queries.lock().unwrap().as_slice(), [String::new()]);
    }

    #[tokio::test]
    async fn test_unavailable_model_is_503() {
        let (app, _) = app_with(|| {
            Err(ProviderError::ModelNotFound {
                model: "llama3.1:8b".to_string(),
                available: vec![],
            })
        });
        let response = app.oneshot(post_answer(r#"{"query": "hi"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("ollama pull llama3.1:8b"));
    }

    #[tokio::test]
    async fn test_other_failure_is_500() {
        let (app, _) = app_with(|| Err(ProviderError::Api("boom".to_string())));
        let response = app.oneshot(post_answer(r#"{"query": "hi"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({"error": "model endpoint rejected the request: boom"}));
    }
}
