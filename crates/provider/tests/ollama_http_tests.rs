//! Ollama client tests against a mock HTTP server

use mockito::Matcher;
use serde_json::json;
use smartagent_provider::{
    ChatParams, Message, OllamaProvider, ParameterSchema, PropertySchema, Provider,
    ProviderError, ServiceState, ToolDescriptor,
};

fn provider_for(server: &mockito::ServerGuard) -> OllamaProvider {
    OllamaProvider::new(Some(server.url()), Some("llama3.1:8b".to_string()))
}

fn csv_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        "CSV Tool",
        "Retrieves CSV data and metadata from a file.",
        ParameterSchema::object().property("file_path", PropertySchema::string("Path"), true),
    )
}

#[tokio::test]
async fn test_chat_posts_tools_and_parses_tool_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "llama3.1:8b", "stream": false})),
            Matcher::Regex(r#""tools":\["#.to_string()),
            Matcher::Regex(r#""name":"CSV Tool""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "model": "llama3.1:8b",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{"function": {"name": "CSV Tool", "arguments": {"file_path": "test.csv"}}}]
                },
                "done": true
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let provider = provider_for(&server);
    let response = provider
        .chat(ChatParams {
            model: "llama3.1:8b".to_string(),
            messages: vec![Message::user("give me information about test.csv")],
            tools: vec![csv_descriptor()],
            ..Default::default()
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].arguments, json!({"file_path": "test.csv"}));
}

#[tokio::test]
async fn test_chat_plain_answer() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(r#"{"message": {"role": "assistant", "content": "4"}, "done": true}"#)
        .create_async()
        .await;

    let response = provider_for(&server)
        .chat(ChatParams {
            messages: vec![Message::user("what is 2+2")],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.content(), Some("4"));
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn test_chat_model_missing_maps_to_model_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error": "model \"llama3.1:8b\" not found, try pulling it first"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models": [{"name": "mistral:7b", "model": "mistral:7b"}]}"#)
        .create_async()
        .await;

    let err = provider_for(&server)
        .chat(ChatParams {
            model: "llama3.1:8b".to_string(),
            messages: vec![Message::user("hi")],
            ..Default::default()
        })
        .await
        .unwrap_err();

    match &err {
        ProviderError::ModelNotFound { model, available } => {
            assert_eq!(model, "llama3.1:8b");
            assert_eq!(available, &vec!["mistral:7b".to_string()]);
        }
        other => panic!("Expected ModelNotFound, got {:?}", other),
    }
    assert!(err.is_upstream_unavailable());
}

#[tokio::test]
async fn test_chat_server_error_maps_to_api() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body(r#"{"error": "out of memory"}"#)
        .create_async()
        .await;

    let err = provider_for(&server)
        .chat(ChatParams::default())
        .await
        .unwrap_err();

    match err {
        ProviderError::Api(msg) => assert_eq!(msg, "out of memory"),
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_connection_refused_is_unavailable() {
    let provider = OllamaProvider::new(Some("http://127.0.0.1:9".to_string()), None);
    let err = provider.chat(ChatParams::default()).await.unwrap_err();

    assert!(err.is_upstream_unavailable(), "got {:?}", err);
    assert!(err.to_string().contains("ollama serve"));
}

#[tokio::test]
async fn test_chat_client_timeout_is_unavailable() {
    // Accepted by the kernel backlog, never answered
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let provider =
        OllamaProvider::with_timeout(Some(url), None, std::time::Duration::from_millis(200))
            .unwrap();

    let err = provider.chat(ChatParams::default()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)), "got {:?}", err);
    drop(listener);
}

#[tokio::test]
async fn test_chat_stalled_body_is_unavailable() {
    use std::io::{Read, Write};

    // Sends headers and part of the body, then goes quiet
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let stalled = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf);
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"model\"",
        );
        let _ = stream.flush();
        std::thread::sleep(std::time::Duration::from_secs(2));
    });

    let provider =
        OllamaProvider::with_timeout(Some(url), None, std::time::Duration::from_millis(500))
            .unwrap();
    let err = provider.chat(ChatParams::default()).await.unwrap_err();

    assert!(err.is_upstream_unavailable(), "got {:?}", err);
    assert!(err.to_string().contains("ollama serve"));
    stalled.join().unwrap();
}

#[tokio::test]
async fn test_validate_setup_and_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/version")
        .with_status(200)
        .with_body(r#"{"version": "0.5.7"}"#)
        .expect_at_least(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(
            r#"{"models": [{"model": "llama3.1:8b"}, {"model": "mistral:7b"}]}"#,
        )
        .expect_at_least(1)
        .create_async()
        .await;

    let provider = provider_for(&server);

    assert_eq!(provider.version().await.unwrap(), "0.5.7");
    assert!(provider.model_available("llama3.1:8b").await);
    assert!(provider.check_ready("llama3.1:8b").await.is_ok());

    let err = provider.validate_setup("phi3:mini").await.unwrap_err();
    assert!(matches!(err, ProviderError::ModelNotFound { .. }));
    assert!(err.to_string().contains("ollama pull phi3:mini"));
    assert!(err.to_string().contains("llama3.1:8b, mistral:7b"));

    let status = provider.status("phi3:mini").await;
    assert_eq!(status.status, ServiceState::ModelNotAvailable);
    assert!(status.service_running);
    assert_eq!(status.available_models.len(), 2);

    let status = provider.status("llama3.1:8b").await;
    assert_eq!(status.status, ServiceState::Healthy);
}
