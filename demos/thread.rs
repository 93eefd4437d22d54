//! Thread workflow: create a thread, add a message, run an assistant and
//! read back the conversation.
//!
//! Run with:
//! ```bash
//! PIXIGPT_API_KEY=sk-... PIXIGPT_BASE_URL=https://pixigpt.com/v1 DEFAULT_ASSISTANT_ID=asst_... \
//!     cargo run --example thread
//! ```

use pixigpt::{Client, Role};
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

    let thread = client.create_thread().await?;
    println!("Created thread: {}", thread.id);

    let msg = client
        .create_message(
            &thread.id,
            Role::User,
            "What's the capital of France? Answer in one word.",
        )
        .await?;
    println!("Added message: {}", msg.id);

    let run = client.create_run(&thread.id, &assistant_id, Some(true)).await?;
    println!("Created run: {} (status: {})", run.id, run.status);

    println!("Waiting for run to complete...");
    let finished = client.wait_for_run(&thread.id, &run.id).await?;
    println!("Run finished: {}", finished.status);

    // Newest first; print oldest first.
    let messages = client.list_messages(&thread.id, 10).await?;
    println!("\n=== Conversation ===");
    for msg in messages.iter().rev() {
        let text = msg.text();
        if text.is_empty() {
            continue;
        }
        println!("{}: {}", msg.role, text);
        if let Some(reasoning) = &msg.reasoning_content {
            let preview: String = reasoning.chars().take(100).collect();
            println!("  [Reasoning: {preview}...]");
        }
    }
    Ok(())
}
