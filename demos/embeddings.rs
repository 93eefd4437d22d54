//! Embeddings and rerank.
//!
//! Run with:
//! ```bash
//! PIXIGPT_API_KEY=sk-... PIXIGPT_BASE_URL=https://pixigpt.com/v1 cargo run --example embeddings
//! ```

use pixigpt::{Client, EmbeddingRequest, RerankRequest};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let api_key = std::env::var("PIXIGPT_API_KEY")?;
    let base_url = std::env::var("PIXIGPT_BASE_URL")?;
    let client = Client::with_credentials(base_url, api_key)?;

    let single = client
        .create_embedding(&EmbeddingRequest::new(
            "The quick brown fox jumps over the lazy dog",
        ))
        .await?;
    let first = &single.data[0].embedding;
    println!("Embedding dimensions: {}", first.len());
    println!("First 5 values: {:?}", &first[..first.len().min(5)]);

    let texts = vec![
        "Artificial intelligence is transforming technology",
        "Machine learning models process vast amounts of data",
        "Neural networks are inspired by biological neurons",
        "Deep learning requires significant computational resources",
    ];
    let batch = client.create_embedding(&EmbeddingRequest::new(texts)).await?;
    println!(
        "Generated {} embeddings ({} total tokens)",
        batch.data.len(),
        batch.usage.total()
    );

    let documents = [
        "Machine learning is a subset of artificial intelligence that focuses on data-driven predictions",
        "Cats are popular pets known for their independence and playful nature",
        "Supervised learning algorithms learn from labeled training data to make predictions",
        "The weather forecast predicts rain tomorrow afternoon",
        "Neural networks use layers of interconnected nodes to process information",
        "Pizza is a traditional Italian dish with cheese and tomato sauce",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let ranked = client
        .rerank(&RerankRequest::new("machine learning algorithms", documents).top_k(3))
        .await?;
    println!("Top {} results:", ranked.results.len());
    for (i, result) in ranked.results.iter().enumerate() {
        println!("  {}. [{:.3}] {}", i + 1, result.relevance_score, result.document);
    }
    Ok(())
}
