use recap_llm::{ChatClient, ChatOptions, ChatRequest, Message, OpenAIClient};

#[tokio::test]
async fn test_chat_parses_openrouter_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": "gen-1",
                "model": "openai/gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "{\"overview\":\"hi\"}"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 42, "completion_tokens": 8, "total_tokens": 50}
            }"#,
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("sk-test").unwrap().with_base_url(server.url());
    let request = ChatRequest::new("openai/gpt-4o-mini", vec![Message::user("Hi")])
        .with_options(ChatOptions::new().max_tokens(64));

    let response = client.chat(request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("{\"overview\":\"hi\"}"));
    assert_eq!(response.model.as_deref(), Some("openai/gpt-4o-mini"));
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 42);
    assert_eq!(usage.output_tokens, 8);
}

#[tokio::test]
async fn test_chat_fills_missing_total_tokens() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}],
                "usage": {"input_tokens": 10, "output_tokens": 5}
            }"#,
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("sk-test").unwrap().with_base_url(server.url());
    let response = client
        .chat(ChatRequest::new("any", vec![Message::user("Hi")]))
        .await
        .unwrap();

    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn test_chat_http_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let client = OpenAIClient::new("sk-test").unwrap().with_base_url(server.url());
    let err = client
        .chat(ChatRequest::new("any", vec![Message::user("Hi")]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn test_chat_provider_error_in_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"message": "model overloaded", "code": 502}}"#)
        .create_async()
        .await;

    let client = OpenAIClient::new("sk-test").unwrap().with_base_url(server.url());
    let err = client
        .chat(ChatRequest::new("any", vec![Message::user("Hi")]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("model overloaded"));
}
