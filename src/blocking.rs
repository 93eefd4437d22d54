use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use reqwest::{blocking::Client as HttpClient, Url};
use serde::de::DeserializeOwned;

use crate::{
    chat::{ChatCompletionRequest, ChatCompletionResponse},
    classify,
    client::required_settings,
    core::{
        budget_exhausted, decode_response, join_url, remaining, request_headers, PollSchedule,
        RetryState,
    },
    embeddings::{EmbeddingRequest, EmbeddingResponse, RerankRequest, RerankResponse},
    errors::{Result, TransportError, TransportErrorKind},
    http::{HeaderList, RequestOptions, RetryConfig},
    operations::{self, Operation},
    runs::WaitOptions,
    threads::{Run, Thread, ThreadMessage},
    types::Role,
    vision::{
        ModerationMediaRequest, ModerationResponse, ModerationTextRequest, VisionAnalyzeRequest,
        VisionOcrRequest, VisionResponse, VisionTagsRequest, VisionVideoRequest,
    },
    DEFAULT_CLIENT_HEADER, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};

#[derive(Clone, Debug, Default)]
pub struct BlockingConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub client_header: Option<String>,
    pub http_client: Option<HttpClient>,
    /// Override the connect timeout (defaults to 5s).
    pub connect_timeout: Option<Duration>,
    /// Default budget for a single call, retries included (defaults to 60s).
    pub timeout: Option<Duration>,
    /// Retry/backoff policy (defaults to 3 attempts, exponential backoff + jitter).
    pub retry: Option<RetryConfig>,
    pub default_headers: Option<HeaderList>,
}

/// Thread-blocking twin of [`crate::Client`].
#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: Url,
    api_key: String,
    client_header: String,
    http: HttpClient,
    request_timeout: Duration,
    retry: RetryConfig,
    default_headers: Option<HeaderList>,
}

impl BlockingClient {
    pub fn new(cfg: BlockingConfig) -> Result<Self> {
        let (base_url, api_key) =
            required_settings(cfg.base_url.as_deref(), cfg.api_key.as_deref())?;

        let connect_timeout = cfg.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let request_timeout = cfg.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let retry = cfg.retry.unwrap_or_default();

        let http = match cfg.http_client {
            Some(client) => client,
            None => HttpClient::builder()
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
            }),
        })
    }

    pub fn execute<T: DeserializeOwned>(&self, op: Operation<T>) -> Result<T> {
        self.inner.dispatch(op, RequestOptions::default())
    }

    pub fn execute_with<T: DeserializeOwned>(
        &self,
        op: Operation<T>,
        options: RequestOptions,
    ) -> Result<T> {
        self.inner.dispatch(op, options)
    }

    pub fn create_chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.execute(operations::create_chat_completion(req)?)
    }

    pub fn create_thread(&self) -> Result<Thread> {
        self.execute(operations::create_thread()?)
    }

    pub fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.execute(operations::create_message(thread_id, role, content)?)
    }

    /// Up to `limit` messages, newest first.
    pub fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        Ok(self
            .execute(operations::list_messages(thread_id, limit)?)?
            .data)
    }

    pub fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        enable_thinking: Option<bool>,
    ) -> Result<Run> {
        self.execute(operations::create_run(thread_id, assistant_id, enable_thinking)?)
    }

    pub fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.execute(operations::get_run(thread_id, run_id)?)
    }

    pub fn analyze_image(&self, req: &VisionAnalyzeRequest) -> Result<VisionResponse> {
        self.execute(operations::analyze_image(req)?)
    }

    pub fn analyze_image_for_tags(&self, req: &VisionTagsRequest) -> Result<VisionResponse> {
        self.execute(operations::analyze_image_for_tags(req)?)
    }

    pub fn extract_text(&self, req: &VisionOcrRequest) -> Result<VisionResponse> {
        self.execute(operations::extract_text(req)?)
    }

    pub fn analyze_video(&self, req: &VisionVideoRequest) -> Result<VisionResponse> {
        self.execute(operations::analyze_video(req)?)
    }

    pub fn moderate_text(&self, req: &ModerationTextRequest) -> Result<ModerationResponse> {
        self.execute(operations::moderate_text(req)?)
    }

    pub fn moderate_media(&self, req: &ModerationMediaRequest) -> Result<ModerationResponse> {
        self.execute(operations::moderate_media(req)?)
    }

    pub fn create_embedding(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        self.execute(operations::create_embedding(req)?)
    }

    pub fn rerank(&self, req: &RerankRequest) -> Result<RerankResponse> {
        self.execute(operations::rerank(req)?)
    }

    pub fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.wait_for_run_with(thread_id, run_id, WaitOptions::default())
    }

    /// Blocks the calling thread between polls. See [`crate::Client::wait_for_run_with`].
    pub fn wait_for_run_with(
        &self,
        thread_id: &str,
        run_id: &str,
        opts: WaitOptions,
    ) -> Result<Run> {
        let mut schedule = PollSchedule::new(&opts, Instant::now());
        loop {
            let call_timeout = schedule.call_timeout(self.inner.request_timeout, Instant::now());
            let op = operations::get_run(thread_id, run_id)?.with_timeout(call_timeout);
            let run = match self.execute(op) {
                Ok(run) => run,
                Err(err) if err.is_transport_timeout() && schedule.expired(Instant::now()) => {
                    return Err(schedule
                        .timeout_error(thread_id, run_id, Instant::now())
                        .into());
                }
                Err(err) => return Err(err),
            };
            schedule.record(run.status);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                thread_id,
                run_id,
                poll = schedule.polls(),
                status = %run.status,
                "run polled"
            );
            if run.is_terminal() {
                return Ok(run);
            }

            let Some(delay) = schedule.next_delay(Instant::now()) else {
                return Err(schedule
                    .timeout_error(thread_id, run_id, Instant::now())
                    .into());
            };
            thread::sleep(delay);
            if schedule.expired(Instant::now()) {
                return Err(schedule
                    .timeout_error(thread_id, run_id, Instant::now())
                    .into());
            }
        }
    }
}

impl ClientInner {
    fn dispatch<T: DeserializeOwned>(
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
        let deadline = Instant::now() + budget;
        let mut state = RetryState::new();

        for attempt in 1..=max_attempts {
            let Some(attempt_timeout) = remaining(deadline, Instant::now()) else {
                break;
            };
            state.record_attempt(attempt);
            #[cfg(feature = "tracing")]
            let span = tracing::debug_span!(
                "pixigpt.http",
                method = %method,
                path = %template,
                attempt,
                max_attempts
            );
            #[cfg(feature = "tracing")]
            let _guard = span.enter();

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

            let outcome = match builder.send() {
                Ok(resp) => {
                    let status = resp.status();
                    state.record_status(status);
                    if status.is_success() {
                        match resp.bytes() {
                            Ok(bytes) => {
                                #[cfg(feature = "tracing")]
                                tracing::debug!(status = %status, "request completed");
                                return decode_response(status, &bytes, check.take());
                            }
                            Err(err) => {
                                state.record_error(&err);
                                classify::transport_error(err, None)
                            }
                        }
                    } else {
                        let headers = resp.headers().clone();
                        let body = resp.text().unwrap_or_default();
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
                    thread::sleep(delay);
                    continue;
                }
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(
                kind = %outcome.kind(),
                error = %outcome,
                "request failed; returning error"
            );
            return Err(outcome.with_retries(state.metadata()));
        }

        Err(budget_exhausted(budget, state.metadata()))
    }
}
