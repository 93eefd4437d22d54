use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    chat::{ChatCompletionRequest, ChatCompletionResponse},
    classify,
    core::{budget_exhausted, decode_response, join_url, remaining, request_headers, RetryState},
    embeddings::{EmbeddingRequest, EmbeddingResponse, RerankRequest, RerankResponse},
    errors::{Error, Result, TransportError, TransportErrorKind},
    http::{request_id_from_headers, HeaderList, RequestOptions, RetryConfig},
    operations::{self, Operation},
    telemetry::{HttpRequestMetrics, MetricsCallbacks, RequestContext, Telemetry},
    threads::{Run, Thread, ThreadMessage},
    types::Role,
    vision::{
        ModerationMediaRequest, ModerationResponse, ModerationTextRequest, VisionAnalyzeRequest,
        VisionOcrRequest, VisionResponse, VisionTagsRequest, VisionVideoRequest,
    },
    DEFAULT_CLIENT_HEADER, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};

#[derive(Clone, Debug, Default)]
pub struct Config {
    /// API root including any version prefix, e.g. `https://pixigpt.com/v1`. Required.
    pub base_url: Option<String>,
    /// Bearer credential. Required.
    pub api_key: Option<String>,
    /// Override the User-Agent (defaults to `pixigpt-rust/<version>`).
    pub client_header: Option<String>,
    pub http_client: Option<reqwest::Client>,
    /// Override the connect timeout (defaults to 5s).
    pub connect_timeout: Option<Duration>,
    /// Default budget for a single call, retries included (defaults to 60s).
    pub timeout: Option<Duration>,
    /// Retry/backoff policy (defaults to 3 attempts, exponential backoff + jitter).
    pub retry: Option<RetryConfig>,
    /// Default extra headers applied to all requests.
    pub default_headers: Option<HeaderList>,
    /// Optional metrics callbacks (HTTP latency, run polling).
    pub metrics: Option<MetricsCallbacks>,
}

/// Async PixiGPT client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    base_url: Url,
    api_key: String,
    client_header: String,
    http: reqwest::Client,
    pub(crate) request_timeout: Duration,
    retry: RetryConfig,
    default_headers: Option<HeaderList>,
    pub(crate) telemetry: Telemetry,
}

/// Validate the required connection settings shared by both clients.
pub(crate) fn required_settings(
    base_url: Option<&str>,
    api_key: Option<&str>,
) -> Result<(Url, String)> {
    let base = base_url
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Config("base url is required".to_string()))?;
    let base_url = Url::parse(base.trim_end_matches('/'))
        .map_err(|err| Error::Config(format!("invalid base url: {err}")))?;
    let api_key = api_key
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Config("api key is required".to_string()))?;
    Ok((base_url, api_key.to_string()))
}

impl Client {
    pub fn new(cfg: Config) -> Result<Self> {
        let (base_url, api_key) =
            required_settings(cfg.base_url.as_deref(), cfg.api_key.as_deref())?;

        let connect_timeout = cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let request_timeout = cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let retry = cfg.retry.unwrap_or_default();

        let http = match cfg.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .build()
                .map_err(|err| TransportError {
                    kind: TransportErrorKind::Connect,
                    message: "failed to build http client".to_string(),
                    source: Some(err),
                    retries: None,
                })?,
        };

        let client_header = cfg
            .client_header
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_HEADER.to_string());

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url,
                api_key,
                client_header,
                http,
                request_timeout,
                retry,
                default_headers: cfg.default_headers,
                telemetry: Telemetry::new(cfg.metrics),
            }),
        })
    }

    /// Shorthand for a client with default settings.
    pub fn with_credentials(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Self::new(Config {
            base_url: Some(base_url.into()),
            api_key: Some(api_key.into()),
            ..Default::default()
        })
    }

    /// Dispatch an operation descriptor with the client defaults.
    pub async fn execute<T: DeserializeOwned>(&self, op: Operation<T>) -> Result<T> {
        self.inner.dispatch(op, RequestOptions::default()).await
    }

    /// Dispatch an operation descriptor with per-call overrides.
    pub async fn execute_with<T: DeserializeOwned>(
        &self,
        op: Operation<T>,
        options: RequestOptions,
    ) -> Result<T> {
        self.inner.dispatch(op, options).await
    }

    pub async fn create_chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.execute(operations::create_chat_completion(req)?).await
    }

    pub async fn create_thread(&self) -> Result<Thread> {
        self.execute(operations::create_thread()?).await
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.execute(operations::create_message(thread_id, role, content)?)
            .await
    }

    /// Up to `limit` messages, newest first.
    pub async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        let list = self
            .execute(operations::list_messages(thread_id, limit)?)
            .await?;
        Ok(list.data)
    }

    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        enable_thinking: Option<bool>,
    ) -> Result<Run> {
        self.execute(operations::create_run(thread_id, assistant_id, enable_thinking)?)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.execute(operations::get_run(thread_id, run_id)?).await
    }

    pub async fn analyze_image(&self, req: &VisionAnalyzeRequest) -> Result<VisionResponse> {
        self.execute(operations::analyze_image(req)?).await
    }

    pub async fn analyze_image_for_tags(&self, req: &VisionTagsRequest) -> Result<VisionResponse> {
        self.execute(operations::analyze_image_for_tags(req)?).await
    }

    pub async fn extract_text(&self, req: &VisionOcrRequest) -> Result<VisionResponse> {
        self.execute(operations::extract_text(req)?).await
    }

    pub async fn analyze_video(&self, req: &VisionVideoRequest) -> Result<VisionResponse> {
        self.execute(operations::analyze_video(req)?).await
    }

    pub async fn moderate_text(&self, req: &ModerationTextRequest) -> Result<ModerationResponse> {
        self.execute(operations::moderate_text(req)?).await
    }

    pub async fn moderate_media(&self, req: &ModerationMediaRequest) -> Result<ModerationResponse> {
        self.execute(operations::moderate_media(req)?).await
    }

    pub async fn create_embedding(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.execute(operations::create_embedding(req)?).await
    }

    pub async fn rerank(&self, req: &RerankRequest) -> Result<RerankResponse> {
        self.execute(operations::rerank(req)?).await
    }
}

impl ClientInner {
    async fn dispatch<T: DeserializeOwned>(
        &self,
        op: Operation<T>,
        options: RequestOptions,
    ) -> Result<T> {
        let Operation {
            method,
            template,
            path,
            query,
            body,
            timeout,
            mut check,
        } = op;
        let url = join_url(&self.base_url, &path)?;
        let headers = request_headers(
            &self.api_key,
            &self.client_header,
            options.request_id.as_deref(),
            self.default_headers.as_ref(),
            &options.headers,
        )?;
        let retry = options.retry.unwrap_or_else(|| self.retry.clone());
        let max_attempts = retry.max_attempts.max(1);
        let budget = options
            .timeout
            .or(timeout)
            .unwrap_or(self.request_timeout);
        let start = Instant::now();
        let deadline = start + budget;
        let ctx =
            RequestContext::new(method.as_str(), template).with_request_id(options.request_id);
        let mut state = RetryState::new();

        for attempt in 1..=max_attempts {
            let Some(attempt_timeout) = remaining(deadline, Instant::now()) else {
                break;
            };
            state.record_attempt(attempt);

            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .headers(headers.clone())
                .timeout(attempt_timeout);
            if !query.is_empty() {
                builder = builder.query(&query);
            }
            if let Some(body) = &body {
                builder = builder.json(body);
            }

            let send = builder.send();
            #[cfg(feature = "tracing")]
            let send = tracing::Instrument::instrument(
                send,
                tracing::debug_span!(
                    "pixigpt.http",
                    method = %method,
                    path = %template,
                    attempt,
                    max_attempts
                ),
            );

            let outcome = match send.await {
                Ok(resp) => {
                    let status = resp.status();
                    state.record_status(status);
                    let request_id = request_id_from_headers(resp.headers());
                    if status.is_success() {
                        match resp.bytes().await {
                            Ok(bytes) => {
                                let result = decode_response(status, &bytes, check.take());
                                #[cfg(feature = "tracing")]
                                tracing::debug!(
                                    status = %status,
                                    attempt,
                                    elapsed_ms = start.elapsed().as_millis() as u64,
                                    "request completed"
                                );
                                self.record(&ctx, request_id, start, attempt, &state, &result);
                                return result;
                            }
                            Err(err) => {
                                state.record_error(&err);
                                classify::transport_error(err, None)
                            }
                        }
                    } else {
                        let headers = resp.headers().clone();
                        let body = resp.text().await.unwrap_or_default();
                        classify::status_error(status, &headers, body, None)
                    }
                }
                Err(err) => {
                    state.record_error(&err);
                    classify::transport_error(err, None)
                }
            };

            if retry.should_retry(outcome.kind()) && attempt < max_attempts {
                let hint = outcome.api_error().and_then(|api| api.retry_after);
                let delay = retry.delay_for(attempt, hint);
                if remaining(deadline, Instant::now()).is_some_and(|left| delay < left) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        attempt,
                        kind = %outcome.kind(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying request"
                    );
                    sleep(delay).await;
                    continue;
                }
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempt,
                kind = %outcome.kind(),
                error = %outcome,
                "request failed; returning error"
            );
            let result: Result<T> = Err(outcome.with_retries(state.metadata()));
            self.record(&ctx, None, start, attempt, &state, &result);
            return result;
        }

        let result: Result<T> = Err(budget_exhausted(budget, state.metadata()));
        self.record(&ctx, None, start, state.attempts, &state, &result);
        result
    }

    fn record<T>(
        &self,
        ctx: &RequestContext,
        request_id: Option<String>,
        start: Instant,
        attempts: u32,
        state: &RetryState,
        result: &Result<T>,
    ) {
        if !self.telemetry.http_enabled() {
            return;
        }
        let mut context = ctx.clone();
        if context.request_id.is_none() {
            context.request_id = request_id;
        }
        self.telemetry.record_http(HttpRequestMetrics {
            latency: start.elapsed(),
            attempts,
            status: match result {
                Ok(_) => state.last_status,
                Err(err) => err.status(),
            },
            error: result.as_ref().err().map(Error::kind),
            retries: state.metadata(),
            context,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_are_config_errors() {
        assert!(matches!(
            Client::new(Config::default()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Client::with_credentials("https://pixigpt.com/v1", "   "),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Client::with_credentials("not a url", "sk"),
            Err(Error::Config(_))
        ));
        assert!(Client::with_credentials("https://pixigpt.com/v1/", "sk").is_ok());
    }
}
