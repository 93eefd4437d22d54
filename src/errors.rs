use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::threads::RunStatus;

/// Retry metadata surfaced on transport/API errors when retries were attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryMetadata {
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Client-side validation error raised before a request is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}: {}", field, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Error envelope returned by the API for a non-success status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct APIError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<RetryMetadata>,
    /// Server-supplied `Retry-After` hint (only meaningful for 429).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
    /// Raw response body for debugging (when available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
}

impl APIError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            request_id: None,
            retries: None,
            retry_after: None,
            raw_body: None,
        }
    }
}

impl fmt::Display for APIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "{} ({}): {}", code, self.status, self.message)
        } else {
            write!(f, "{}: {}", self.status, self.message)
        }
    }
}

impl std::error::Error for APIError {}

/// Convenience alias for fallible SDK results.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Transport-level error (timeouts, DNS/TLS/connectivity).
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
    pub retries: Option<RetryMetadata>,
}

/// Broad transport error kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Other => "transport",
        };
        write!(f, "{label}")
    }
}

/// Response body that does not match the declared schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("decode error (status {status}): {message}")]
pub struct DecodeError {
    pub status: u16,
    pub message: String,
    /// Leading bytes of the offending body.
    pub body_excerpt: Option<String>,
}

/// The run poller gave up before the run reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTimeoutError {
    pub thread_id: String,
    pub run_id: String,
    pub waited: Duration,
    pub polls: u32,
    pub last_status: Option<RunStatus>,
}

impl fmt::Display for PollTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .last_status
            .map(|s| s.as_str())
            .unwrap_or("unobserved");
        write!(
            f,
            "run {} on thread {} still {} after {:?} ({} polls)",
            self.run_id, self.thread_id, status, self.waited, self.polls
        )
    }
}

impl std::error::Error for PollTimeoutError {}

/// Classification shared by every error the SDK returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Auth,
    RateLimit,
    Validation,
    Server,
    Decode,
    PollTimeout,
}

impl ErrorKind {
    /// Whether the dispatcher may retry an outcome of this kind.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::RateLimit | ErrorKind::Server
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
            ErrorKind::Decode => "decode",
            ErrorKind::PollTimeout => "poll_timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type surfaced by the SDK.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("network error: {0}")]
    Network(#[from] TransportError),

    #[error("authentication rejected: {0}")]
    Auth(APIError),

    #[error("rate limited: {0}")]
    RateLimit(APIError),

    #[error("request rejected: {0}")]
    Validation(APIError),

    #[error("server error: {0}")]
    Server(APIError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("poll timeout: {0}")]
    PollTimeout(#[from] PollTimeoutError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::InvalidRequest(_) | Error::Validation(_) => {
                ErrorKind::Validation
            }
            Error::Network(_) => ErrorKind::Network,
            Error::Auth(_) => ErrorKind::Auth,
            Error::RateLimit(_) => ErrorKind::RateLimit,
            Error::Server(_) => ErrorKind::Server,
            Error::Decode(_) => ErrorKind::Decode,
            Error::PollTimeout(_) => ErrorKind::PollTimeout,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// HTTP status associated with the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Auth(e) | Error::RateLimit(e) | Error::Validation(e) | Error::Server(e) => {
                Some(e.status)
            }
            Error::Decode(e) => Some(e.status),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&APIError> {
        match self {
            Error::Auth(e) | Error::RateLimit(e) | Error::Validation(e) | Error::Server(e) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// Retry metadata, present when more than one attempt was made.
    pub fn retries(&self) -> Option<&RetryMetadata> {
        match self {
            Error::Network(e) => e.retries.as_ref(),
            other => other.api_error().and_then(|e| e.retries.as_ref()),
        }
    }

    pub(crate) fn with_retries(mut self, retries: Option<RetryMetadata>) -> Self {
        match &mut self {
            Error::Network(e) => e.retries = retries,
            Error::Auth(e) | Error::RateLimit(e) | Error::Validation(e) | Error::Server(e) => {
                e.retries = retries
            }
            _ => {}
        }
        self
    }

    pub(crate) fn is_transport_timeout(&self) -> bool {
        matches!(self, Error::Network(e) if e.kind == TransportErrorKind::Timeout)
    }
}
