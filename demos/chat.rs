//! Single chat completion against an assistant.
//!
//! Run with:
//! ```bash
//! PIXIGPT_API_KEY=sk-... PIXIGPT_BASE_URL=https://pixigpt.com/v1 DEFAULT_ASSISTANT_ID=asst_... \
//!     cargo run --example chat
//! ```

use pixigpt::{ChatCompletionRequest, ChatMessage, Client};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("PIXIGPT_API_KEY")?;
    let base_url = std::env::var("PIXIGPT_BASE_URL")?;
    let assistant_id = std::env::var("DEFAULT_ASSISTANT_ID")?;

    let client = Client::with_credentials(base_url, api_key)?;

    let request = ChatCompletionRequest::new(vec![ChatMessage::user("Hello! What's your name?")])
        .assistant_id(assistant_id)
        .temperature(0.7)
        .max_tokens(2000);
    let response = client.create_chat_completion(&request).await?;

    let choice = &response.choices[0];
    println!("Assistant: {}", choice.message.content);
    if let Some(reasoning) = &choice.reasoning_content {
        let preview: String = reasoning.chars().take(200).collect();
        println!("\nReasoning: {preview}...");
    }

    println!(
        "\nUsage: {} input + {} output = {} total",
        response.usage.prompt(),
        response.usage.completion(),
        response.usage.total()
    );
    Ok(())
}
