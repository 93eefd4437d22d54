//! Vision analysis and moderation.
//!
//! Run with:
//! ```bash
//! PIXIGPT_API_KEY=sk-... PIXIGPT_BASE_URL=https://pixigpt.com/v1 cargo run --example vision
//! ```

use pixigpt::{
    Client, ModerationMediaRequest, ModerationTextRequest, VisionAnalyzeRequest, VisionOcrRequest,
    VisionTagsRequest, VisionVideoRequest,
};
use std::error::Error;

const IMAGE_URL: &str = "https://rub.soulkyn.com/b6e4b172-b8d8-4552-9361-abd56a1e84ee.webp";
const VIDEO_URL: &str = "https://rub.soulkyn.com/d8d917b0-bb37-43d6-9d3f-19eee1547065.mp4";
const TEXT_IMAGE_URL: &str =
    "https://qianwen-res.oss-accelerate.aliyuncs.com/Qwen3-VL/qwen3vl_4b_8b_text_instruct.jpg";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("PIXIGPT_API_KEY")?;
    let base_url = std::env::var("PIXIGPT_BASE_URL")?;
    let client = Client::with_credentials(base_url, api_key)?;

    println!("=== Image Analysis ===");
    let resp = client
        .analyze_image(
            &VisionAnalyzeRequest::new(IMAGE_URL).user_prompt("Describe this image in detail."),
        )
        .await?;
    println!("Analysis: {}", resp.result);
    println!("Tokens: {}\n", resp.usage.total());

    println!("=== Tag Generation ===");
    let resp = client
        .analyze_image_for_tags(&VisionTagsRequest::new(IMAGE_URL))
        .await?;
    println!("Tags: {}", resp.result);
    println!("Tokens: {}\n", resp.usage.total());

    println!("=== OCR Text Extraction ===");
    let resp = client
        .extract_text(&VisionOcrRequest::new(TEXT_IMAGE_URL))
        .await?;
    println!("Extracted text: {}", resp.result);
    println!("Tokens: {}\n", resp.usage.total());

    println!("=== Video Analysis ===");
    let resp = client
        .analyze_video(
            &VisionVideoRequest::new(VIDEO_URL).user_prompt("Describe what happens in this video."),
        )
        .await?;
    println!("Video analysis: {}", resp.result);
    println!("Tokens: {}\n", resp.usage.total());

    println!("=== Text Moderation ===");
    let resp = client
        .moderate_text(&ModerationTextRequest::new(
            "Generate a beautiful landscape with mountains and sunset",
        ))
        .await?;
    println!("Category: {} (score: {})", resp.category, resp.score);
    println!("Tokens: {}\n", resp.usage.total());

    for (label, req) in [
        ("Image", ModerationMediaRequest::image(IMAGE_URL)),
        ("Video", ModerationMediaRequest::video(VIDEO_URL)),
    ] {
        println!("=== {label} Moderation ===");
        let resp = client.moderate_media(&req).await?;
        println!("Category: {} (score: {})", resp.category, resp.score);
        println!("Tokens: {}\n", resp.usage.total());
    }
    Ok(())
}
