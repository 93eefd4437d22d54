//! Embedding and rerank tests: response ordering and integrity checks.

use pixigpt::{Client, Config, EmbeddingRequest, ErrorKind, RerankRequest, RetryConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for_server(server: &MockServer) -> Client {
    Client::new(Config {
        api_key: Some("sk-test".into()),
        base_url: Some(server.uri()),
        retry: Some(RetryConfig::disabled()),
        ..Default::default()
    })
    .expect("client creation should succeed")
}

#[tokio::test]
async fn batch_embeddings_are_ordered_by_input_position() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_json(json!({ "input": ["alpha", "beta", "gamma"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "model": "pixi-embed",
            "data": [
                { "object": "embedding", "index": 2, "embedding": [0.3, 0.3] },
                { "object": "embedding", "index": 0, "embedding": [0.1, 0.1] },
                { "object": "embedding", "index": 1, "embedding": [0.2, 0.2] }
            ],
            "usage": { "prompt_tokens": 6, "total_tokens": 6 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let resp = client
        .create_embedding(&EmbeddingRequest::new(vec!["alpha", "beta", "gamma"]))
        .await
        .expect("embedding should succeed");

    assert_eq!(resp.data.len(), 3);
    for (i, datum) in resp.data.iter().enumerate() {
        assert_eq!(datum.index, i);
    }
    assert_eq!(resp.data[0].embedding, vec![0.1, 0.1]);
    assert_eq!(resp.model.as_deref(), Some("pixi-embed"));
}

#[tokio::test]
async fn missing_embedding_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "index": 0, "embedding": [0.1] }],
            "usage": { "total_tokens": 4 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let err = client
        .create_embedding(&EmbeddingRequest::new(vec!["a", "b"]))
        .await
        .expect_err("two inputs, one embedding");
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn rerank_returns_top_k_in_descending_relevance() {
    let server = MockServer::start().await;

    let documents: Vec<String> = [
        "The capital of France is Paris.",
        "Bananas are yellow.",
        "Paris hosts the Louvre.",
        "Rust has no garbage collector.",
        "France borders Spain.",
        "The Eiffel Tower is in Paris.",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    Mock::given(method("POST"))
        .and(path("/rerank"))
        .and(body_json(json!({
            "query": "What is in Paris?",
            "documents": documents,
            "top_k": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "document": documents[2], "relevance_score": 0.81, "index": 2 },
                { "document": documents[5], "relevance_score": 0.93, "index": 5 },
                { "document": documents[1], "relevance_score": 0.01, "index": 1 },
                { "document": documents[0], "relevance_score": 0.77, "index": 0 }
            ],
            "usage": { "total_tokens": 40 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let resp = client
        .rerank(&RerankRequest::new("What is in Paris?", documents.clone()).top_k(3))
        .await
        .expect("rerank should succeed");

    assert_eq!(resp.results.len(), 3);
    assert!(resp
        .results
        .windows(2)
        .all(|pair| pair[0].relevance_score >= pair[1].relevance_score));
    assert_eq!(resp.results[0].document, "The Eiffel Tower is in Paris.");
    assert_eq!(resp.results[0].index, Some(5));
    assert_eq!(resp.usage.total_tokens, 40);
}

#[tokio::test]
async fn empty_rerank_documents_are_rejected_locally() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let err = client
        .rerank(&RerankRequest::new("anything", vec![]))
        .await
        .expect_err("no documents");
    assert_eq!(err.kind(), ErrorKind::Validation);
}
