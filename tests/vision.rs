//! Vision and moderation endpoint tests.

use pixigpt::{
    Client, Config, ErrorKind, ModerationMediaRequest, ModerationTextRequest, RetryConfig,
    VisionAnalyzeRequest, VisionOcrRequest, VisionTagsRequest, VisionVideoRequest,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IMAGE_URL: &str = "https://pixigpt.com/static/sample.webp";

fn client_for_server(server: &MockServer) -> Client {
    Client::new(Config {
        api_key: Some("sk-test".into()),
        base_url: Some(server.uri()),
        retry: Some(RetryConfig::disabled()),
        ..Default::default()
    })
    .expect("client creation should succeed")
}

fn vision_body(result: &str) -> serde_json::Value {
    json!({
        "result": result,
        "usage": { "prompt_tokens": 900, "completion_tokens": 20, "total_tokens": 920 }
    })
}

#[tokio::test]
async fn vision_endpoints_post_their_payloads() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vision/analyze"))
        .and(body_json(json!({ "image_url": IMAGE_URL, "user_prompt": "What is shown?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vision_body("A cat on a sofa.")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vision/tags"))
        .and(body_json(json!({ "image_url": IMAGE_URL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vision_body("cat, sofa, indoor")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vision/ocr"))
        .and(body_json(json!({ "image_url": IMAGE_URL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vision_body("")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vision/video"))
        .and(body_json(json!({ "video_url": "https://pixigpt.com/static/clip.mp4" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vision_body("A dog running.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let analysis = client
        .analyze_image(&VisionAnalyzeRequest::new(IMAGE_URL).user_prompt("What is shown?"))
        .await
        .expect("analyze");
    assert_eq!(analysis.result, "A cat on a sofa.");
    assert_eq!(analysis.usage.total_tokens, 920);

    let tags = client
        .analyze_image_for_tags(&VisionTagsRequest::new(IMAGE_URL))
        .await
        .expect("tags");
    assert_eq!(tags.result, "cat, sofa, indoor");

    let ocr = client
        .extract_text(&VisionOcrRequest::new(IMAGE_URL))
        .await
        .expect("ocr");
    assert!(ocr.result.is_empty());

    let video = client
        .analyze_video(&VisionVideoRequest::new("https://pixigpt.com/static/clip.mp4"))
        .await
        .expect("video");
    assert_eq!(video.result, "A dog running.");
}

#[tokio::test]
async fn moderation_returns_category_and_score() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/moderation/text"))
        .and(body_json(json!({ "prompt": "hello there" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category": "safe",
            "score": 0.02,
            "usage": { "total_tokens": 8 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/moderation/media"))
        .and(body_json(json!({
            "media_url": "https://pixigpt.com/static/clip.mp4",
            "is_video": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "category": "violence",
            "score": 0.91,
            "usage": { "total_tokens": 300 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let text = client
        .moderate_text(&ModerationTextRequest::new("hello there"))
        .await
        .expect("text moderation");
    assert_eq!(text.category, "safe");

    let media = client
        .moderate_media(&ModerationMediaRequest::video(
            "https://pixigpt.com/static/clip.mp4",
        ))
        .await
        .expect("media moderation");
    assert_eq!(media.category, "violence");
    assert!(media.score > 0.9);
}

#[tokio::test]
async fn non_http_urls_are_rejected_before_sending() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for_server(&server);
    let err = client
        .analyze_image(&VisionAnalyzeRequest::new("ftp://example.com/a.png"))
        .await
        .expect_err("ftp is not allowed");
    assert_eq!(err.kind(), ErrorKind::Validation);
}
