//! Rust SDK for the PixiGPT API.
//!
//! ```no_run
//! # async fn demo() -> pixigpt::Result<()> {
//! use pixigpt::{ChatCompletionRequest, ChatMessage, Client};
//!
//! let client = Client::with_credentials("https://pixigpt.com/v1", "sk-...")?;
//! let resp = client
//!     .create_chat_completion(&ChatCompletionRequest::new(vec![ChatMessage::user("Hello!")]))
//!     .await?;
//! println!("{}", resp.text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! Every call goes through one dispatcher that authenticates, retries
//! transient failures (network errors, 429, 5xx) with capped exponential
//! backoff, and decodes into a typed response or a typed [`Error`].
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::result_large_err)]

/// Default User-Agent header value.
pub(crate) const DEFAULT_CLIENT_HEADER: &str = concat!("pixigpt-rust/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Default per-call budget (60 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// HTTP header name for request ID tracing.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

mod chat;
pub mod classify;
mod client;
mod core;
mod embeddings;
mod errors;
mod http;
pub mod operations;
mod runs;
mod telemetry;
mod threads;
mod types;
mod vision;

#[cfg(feature = "blocking")]
mod blocking;

pub use chat::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, ChoiceMessage,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use client::{Client, Config};
pub use embeddings::{
    EmbeddingDatum, EmbeddingInput, EmbeddingRequest, EmbeddingResponse, RerankRequest,
    RerankResponse, RerankResult,
};
pub use errors::{
    APIError, DecodeError, Error, ErrorKind, PollTimeoutError, Result, RetryMetadata,
    TransportError, TransportErrorKind, ValidationError,
};
pub use http::{HeaderEntry, HeaderList, RequestOptions, RetryConfig};
pub use operations::Operation;
pub use runs::WaitOptions;
pub use telemetry::{HttpRequestMetrics, MetricsCallbacks, RequestContext, RunPollMetrics};
pub use threads::{
    ContentPart, MessageList, Run, RunError, RunStatus, TextContent, Thread, ThreadMessage,
};
pub use types::{Role, Usage};
pub use vision::{
    ModerationMediaRequest, ModerationResponse, ModerationTextRequest, VisionAnalyzeRequest,
    VisionOcrRequest, VisionResponse, VisionTagsRequest, VisionVideoRequest,
};

#[cfg(feature = "blocking")]
pub use blocking::{BlockingClient, BlockingConfig};
