//! Shared runtime-agnostic logic for async and blocking clients.
//!
//! ## Contents
//!
//! - **Retry State**: [`RetryState`] for tracking HTTP retry attempts
//! - **Decoding**: [`decode_response`] turns a success body into the declared type
//! - **Poll Schedule**: [`PollSchedule`] decides how long the run poller sleeps and when it
//!   gives up

use std::time::{Duration, Instant};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    StatusCode, Url,
};
use serde::de::DeserializeOwned;

use crate::{
    classify::excerpt,
    errors::{
        DecodeError, Error, PollTimeoutError, Result, RetryMetadata, TransportError,
        TransportErrorKind,
    },
    http::HeaderList,
    operations::Check,
    runs::WaitOptions,
    threads::RunStatus,
    REQUEST_ID_HEADER,
};

/// Tracks retry state across attempts for both async and blocking clients.
#[derive(Default)]
pub(crate) struct RetryState {
    pub(crate) attempts: u32,
    pub(crate) last_status: Option<u16>,
    pub(crate) last_error: Option<String>,
}

impl RetryState {
    pub(crate) fn new() -> Self {
        Self {
            attempts: 0,
            last_status: None,
            last_error: None,
        }
    }

    pub(crate) fn record_attempt(&mut self, attempt: u32) {
        self.attempts = attempt;
    }

    pub(crate) fn record_status(&mut self, status: StatusCode) {
        self.last_status = Some(status.as_u16());
    }

    pub(crate) fn record_error(&mut self, err: &reqwest::Error) {
        self.last_error = Some(err.to_string());
    }

    pub(crate) fn metadata(&self) -> Option<RetryMetadata> {
        if self.attempts <= 1 {
            None
        } else {
            Some(RetryMetadata {
                attempts: self.attempts,
                last_status: self.last_status,
                last_error: self.last_error.clone(),
            })
        }
    }
}

/// Resolve an operation path against the base URL, keeping any version prefix.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|err| Error::Config(format!("invalid path {path}: {err}")))
}

/// Headers attached to every attempt: auth, client identity, request id and
/// caller extras (later entries override earlier ones).
pub(crate) fn request_headers(
    api_key: &str,
    client_header: &str,
    request_id: Option<&str>,
    defaults: Option<&HeaderList>,
    extra: &HeaderList,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
        .map_err(|err| Error::Config(format!("invalid api key: {err}")))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(client_header) {
        headers.insert(USER_AGENT, value);
    }
    if let Some(id) = request_id.map(str::trim).filter(|id| !id.is_empty()) {
        let value = HeaderValue::from_str(id)
            .map_err(|err| Error::Config(format!("invalid request id: {err}")))?;
        headers.insert(REQUEST_ID_HEADER, value);
    }
    for entry in defaults.into_iter().flat_map(HeaderList::iter).chain(extra.iter()) {
        if !entry.is_valid() {
            continue;
        }
        let name = HeaderName::from_bytes(entry.key.trim().as_bytes())
            .map_err(|err| Error::Config(format!("invalid header name: {err}")))?;
        let value = HeaderValue::from_str(entry.value.trim())
            .map_err(|err| Error::Config(format!("invalid header value: {err}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Error surfaced when the call budget runs out before any attempt produced an outcome.
pub(crate) fn budget_exhausted(budget: Duration, retries: Option<RetryMetadata>) -> Error {
    TransportError {
        kind: TransportErrorKind::Timeout,
        message: format!("call budget of {budget:?} exhausted"),
        source: None,
        retries,
    }
    .into()
}

/// Time left before `deadline`, or `None` once it has passed.
pub(crate) fn remaining(deadline: Instant, now: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(now);
    if left.is_zero() {
        None
    } else {
        Some(left)
    }
}

/// Decode a success body and run the operation's post-decode check.
///
/// A body that does not match `T`, or fails the check, is a [`DecodeError`].
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
    check: Option<Check<T>>,
) -> Result<T> {
    let decode_error = |message: String| {
        Error::Decode(DecodeError {
            status: status.as_u16(),
            message,
            body_excerpt: Some(excerpt(&String::from_utf8_lossy(bytes))),
        })
    };
    let mut value: T =
        serde_json::from_slice(bytes).map_err(|err| decode_error(err.to_string()))?;
    if let Some(check) = check {
        check(&mut value).map_err(decode_error)?;
    }
    Ok(value)
}

/// Pacing and deadline bookkeeping for one `wait_for_run` call.
#[derive(Debug, Clone)]
pub(crate) struct PollSchedule {
    started: Instant,
    deadline: Option<Instant>,
    interval: Duration,
    backoff_factor: f64,
    max_interval: Duration,
    polls: u32,
    last_status: Option<RunStatus>,
}

impl PollSchedule {
    pub(crate) fn new(opts: &WaitOptions, now: Instant) -> Self {
        let interval = if opts.poll_interval.is_zero() {
            Duration::from_millis(1)
        } else {
            opts.poll_interval
        };
        Self {
            started: now,
            deadline: opts.max_wait.map(|wait| now + wait),
            interval,
            backoff_factor: if opts.backoff_factor.is_finite() && opts.backoff_factor > 1.0 {
                opts.backoff_factor
            } else {
                1.0
            },
            max_interval: opts.max_interval.max(interval),
            polls: 0,
            last_status: None,
        }
    }

    pub(crate) fn record(&mut self, status: RunStatus) {
        self.polls += 1;
        self.last_status = Some(status);
    }

    pub(crate) fn polls(&self) -> u32 {
        self.polls
    }

    pub(crate) fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub(crate) fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Dispatcher budget for the next `get_run`: never past the poll deadline.
    pub(crate) fn call_timeout(&self, default: Duration, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => default.min(deadline.saturating_duration_since(now)),
            None => default,
        }
    }

    /// Sleep before the next poll, clamped to the deadline. `None` once the
    /// deadline has passed.
    pub(crate) fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        let delay = match self.deadline {
            Some(deadline) => self.interval.min(remaining(deadline, now)?),
            None => self.interval,
        };
        if self.backoff_factor > 1.0 {
            let grown = self.interval.mul_f64(self.backoff_factor);
            self.interval = grown.min(self.max_interval);
        }
        Some(delay)
    }

    pub(crate) fn timeout_error(
        &self,
        thread_id: &str,
        run_id: &str,
        now: Instant,
    ) -> PollTimeoutError {
        PollTimeoutError {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
            waited: self.elapsed(now),
            polls: self.polls,
            last_status: self.last_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::ErrorKind, types::Usage};

    fn opts(interval_ms: u64, factor: f64, max_ms: u64, wait_ms: Option<u64>) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_millis(interval_ms),
            backoff_factor: factor,
            max_interval: Duration::from_millis(max_ms),
            max_wait: wait_ms.map(Duration::from_millis),
        }
    }

    #[test]
    fn retry_metadata_only_after_multiple_attempts() {
        let mut state = RetryState::new();
        state.record_attempt(1);
        assert!(state.metadata().is_none());
        state.record_attempt(3);
        state.record_status(StatusCode::BAD_GATEWAY);
        let meta = state.metadata().expect("metadata");
        assert_eq!(meta.attempts, 3);
        assert_eq!(meta.last_status, Some(502));
    }

    #[test]
    fn join_keeps_version_prefix() {
        let base = Url::parse("https://pixigpt.com/v1/").unwrap();
        let url = join_url(&base, "/threads/t1/runs").unwrap();
        assert_eq!(url.as_str(), "https://pixigpt.com/v1/threads/t1/runs");
    }

    #[test]
    fn headers_carry_bearer_and_overrides() {
        let mut defaults = HeaderList::new();
        defaults.push(crate::http::HeaderEntry::new("X-Team".into(), "a".into()));
        let mut extra = HeaderList::new();
        extra.push(crate::http::HeaderEntry::new("X-Team".into(), "b".into()));
        let headers =
            request_headers("sk-test", "pixigpt-rust/test", Some("req-9"), Some(&defaults), &extra)
                .unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers[USER_AGENT], "pixigpt-rust/test");
        assert_eq!(headers[REQUEST_ID_HEADER], "req-9");
        assert_eq!(headers["X-Team"], "b");
    }

    #[test]
    fn fixed_interval_is_clamped_to_deadline() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::new(&opts(400, 1.0, 400, Some(1000)), t0);
        assert_eq!(
            schedule.next_delay(t0),
            Some(Duration::from_millis(400))
        );
        assert_eq!(
            schedule.next_delay(t0 + Duration::from_millis(800)),
            Some(Duration::from_millis(200))
        );
        assert_eq!(schedule.next_delay(t0 + Duration::from_millis(1000)), None);
        assert!(schedule.expired(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn backoff_interval_grows_to_cap() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::new(&opts(100, 2.0, 350, None), t0);
        let delays: Vec<_> = (0..4).filter_map(|_| schedule.next_delay(t0)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
        assert!(!schedule.expired(t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn call_timeout_never_exceeds_remaining_wait() {
        let t0 = Instant::now();
        let schedule = PollSchedule::new(&opts(100, 1.0, 100, Some(500)), t0);
        assert_eq!(
            schedule.call_timeout(Duration::from_secs(60), t0 + Duration::from_millis(200)),
            Duration::from_millis(300)
        );
        let unbounded = PollSchedule::new(&opts(100, 1.0, 100, None), t0);
        assert_eq!(
            unbounded.call_timeout(Duration::from_secs(60), t0),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn timeout_error_reports_progress() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::new(&opts(100, 1.0, 100, Some(250)), t0);
        schedule.record(RunStatus::Queued);
        schedule.record(RunStatus::InProgress);
        let err = schedule.timeout_error("thread_1", "run_1", t0 + Duration::from_millis(300));
        assert_eq!(err.polls, 2);
        assert_eq!(err.last_status, Some(RunStatus::InProgress));
        assert_eq!(err.waited, Duration::from_millis(300));
    }

    #[test]
    fn decode_failures_are_typed() {
        let err = decode_response::<Usage>(StatusCode::OK, br#"{"prompt_tokens": 1}"#, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.status(), Some(200));

        let check: Check<Usage> = Box::new(|u: &mut Usage| u.check());
        let err = decode_response::<Usage>(
            StatusCode::OK,
            br#"{"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 5}"#,
            Some(check),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
