use std::{fmt, sync::Arc, time::Duration};

use crate::{errors::ErrorKind, threads::RunStatus, RetryMetadata};

/// User-provided callbacks for emitting metrics without taking on a tracing dependency.
#[derive(Clone, Default)]
pub struct MetricsCallbacks {
    /// Fired once per dispatched operation, after the final attempt.
    pub http_request: Option<Arc<dyn Fn(HttpRequestMetrics) + Send + Sync>>,
    /// Fired for every status observation made while waiting on a run.
    pub run_poll: Option<Arc<dyn Fn(RunPollMetrics) + Send + Sync>>,
}

impl fmt::Debug for MetricsCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsCallbacks")
            .field(
                "http_request",
                &self.http_request.as_ref().map(|_| "callback"),
            )
            .field("run_poll", &self.run_poll.as_ref().map(|_| "callback"))
            .finish()
    }
}

/// Common request metadata shared by all telemetry events.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub method: String,
    /// Path template, e.g. `/threads/{thread_id}/runs`, so ids do not explode cardinality.
    pub path: String,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        if let Some(id) = request_id {
            if !id.trim().is_empty() {
                self.request_id = Some(id);
            }
        }
        self
    }
}

/// HTTP request latency and outcome.
#[derive(Clone, Debug)]
pub struct HttpRequestMetrics {
    pub latency: Duration,
    pub attempts: u32,
    pub status: Option<u16>,
    pub error: Option<ErrorKind>,
    pub retries: Option<RetryMetadata>,
    pub context: RequestContext,
}

/// A single observation made by the run poller.
#[derive(Clone, Debug)]
pub struct RunPollMetrics {
    pub thread_id: String,
    pub run_id: String,
    /// 1-based poll number.
    pub poll: u32,
    pub status: RunStatus,
    pub elapsed: Duration,
}

/// Internal helper that owns the registered callbacks (if any).
#[derive(Clone, Default)]
pub(crate) struct Telemetry {
    callbacks: MetricsCallbacks,
}

impl Telemetry {
    pub fn new(callbacks: Option<MetricsCallbacks>) -> Self {
        Self {
            callbacks: callbacks.unwrap_or_default(),
        }
    }

    pub fn http_enabled(&self) -> bool {
        self.callbacks.http_request.is_some()
    }

    pub fn record_http(&self, metrics: HttpRequestMetrics) {
        if let Some(cb) = &self.callbacks.http_request {
            cb(metrics);
        }
    }

    pub fn record_poll(&self, metrics: RunPollMetrics) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            thread_id = %metrics.thread_id,
            run_id = %metrics.run_id,
            poll = metrics.poll,
            status = %metrics.status,
            elapsed_ms = metrics.elapsed.as_millis() as u64,
            "run polled"
        );
        if let Some(cb) = &self.callbacks.run_poll {
            cb(metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn callbacks_receive_events() {
        let http_calls = Arc::new(Mutex::new(Vec::new()));
        let poll_calls = Arc::new(Mutex::new(Vec::new()));
        let callbacks = MetricsCallbacks {
            http_request: Some({
                let calls = http_calls.clone();
                Arc::new(move |metrics| calls.lock().unwrap().push(metrics))
            }),
            run_poll: Some({
                let calls = poll_calls.clone();
                Arc::new(move |metrics| calls.lock().unwrap().push(metrics))
            }),
        };
        let telemetry = Telemetry::new(Some(callbacks));
        assert!(telemetry.http_enabled());

        telemetry.record_http(HttpRequestMetrics {
            latency: Duration::from_millis(12),
            attempts: 2,
            status: Some(200),
            error: None,
            retries: None,
            context: RequestContext::new("POST", "/chat/completions")
                .with_request_id(Some("req-1".into())),
        });
        telemetry.record_poll(RunPollMetrics {
            thread_id: "thread_1".into(),
            run_id: "run_1".into(),
            poll: 1,
            status: RunStatus::Queued,
            elapsed: Duration::ZERO,
        });

        let http = http_calls.lock().unwrap();
        assert_eq!(http.len(), 1);
        assert_eq!(http[0].context.request_id.as_deref(), Some("req-1"));
        assert_eq!(poll_calls.lock().unwrap()[0].status, RunStatus::Queued);
    }

    #[test]
    fn blank_request_id_is_ignored() {
        let ctx = RequestContext::new("GET", "/threads").with_request_id(Some("  ".into()));
        assert!(ctx.request_id.is_none());
        assert!(!Telemetry::new(None).http_enabled());
    }
}
