//! Blocking client tests.

#![cfg(feature = "blocking")]

use std::time::Duration;

use pixigpt::{
    BlockingClient, BlockingConfig, ChatCompletionRequest, ChatMessage, ErrorKind, RetryConfig,
    RunStatus, WaitOptions,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, retry: RetryConfig) -> BlockingClient {
    BlockingClient::new(BlockingConfig {
        base_url: Some(server.uri()),
        api_key: Some("sk-test".to_string()),
        retry: Some(retry),
        ..Default::default()
    })
    .expect("client creation should succeed")
}

#[test]
fn blocking_chat_completion_sends_request_and_parses_response() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime should start");

    let server = rt.block_on(async { MockServer::start().await });

    rt.block_on(async {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl_1",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hi!" } }],
                "usage": { "prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4 }
            })))
            .expect(1)
            .mount(&server)
            .await;
    });

    let client = client_for(&server, RetryConfig::default());
    let resp = client
        .create_chat_completion(&ChatCompletionRequest::new(vec![ChatMessage::user("Hello")]))
        .expect("chat request should succeed");
    assert_eq!(resp.text(), Some("Hi!"));
}

#[test]
fn blocking_retries_then_reports_server_error() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime should start");

    let server = rt.block_on(async { MockServer::start().await });

    rt.block_on(async {
        Mock::given(method("POST"))
            .and(path("/threads"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;
    });

    let client = client_for(
        &server,
        RetryConfig {
            max_attempts: 2,
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(10),
        },
    );
    let err = client.create_thread().expect_err("503 should fail");
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.retries().map(|r| r.attempts), Some(2));
}

#[test]
fn blocking_wait_for_run_polls_until_terminal() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime should start");

    let server = rt.block_on(async { MockServer::start().await });

    rt.block_on(async {
        Mock::given(method("GET"))
            .and(path("/threads/thread_1/runs/run_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "run_1",
                "thread_id": "thread_1",
                "assistant_id": "asst_1",
                "status": "expired"
            })))
            .expect(1)
            .mount(&server)
            .await;
    });

    let client = client_for(&server, RetryConfig::disabled());
    let run = client
        .wait_for_run_with(
            "thread_1",
            "run_1",
            WaitOptions::default().poll_interval(Duration::from_millis(10)),
        )
        .expect("wait should succeed");
    assert_eq!(run.status, RunStatus::Expired);
}
