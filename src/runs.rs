//! Waiting for runs to finish.
//!
//! Runs are executed by the service out of band; the only way to learn that
//! one has finished is to poll `GET /threads/{thread_id}/runs/{run_id}`.
//! [`Client::wait_for_run`] does that until the first terminal status and
//! hands the run back, whatever its outcome. Dispatcher errors end the wait
//! immediately and are never retried on top of the dispatcher's own retries.

use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::{
    core::PollSchedule,
    errors::{Error, Result},
    operations,
    telemetry::RunPollMetrics,
    threads::Run,
    Client,
};

/// Polling behaviour for [`Client::wait_for_run_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
    /// Delay between polls (defaults to 1s).
    pub poll_interval: Duration,
    /// Growth applied to the delay after every poll; `1.0` keeps it fixed.
    pub backoff_factor: f64,
    /// Upper bound for a grown delay (defaults to 10s).
    pub max_interval: Duration,
    /// Give up after this long; `None` waits indefinitely (defaults to 300s).
    pub max_wait: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(10),
            max_wait: Some(Duration::from_secs(300)),
        }
    }
}

impl WaitOptions {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_interval = max_interval;
        self
    }

    pub fn max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

impl Client {
    /// Poll a run with [`WaitOptions::default`] until it reaches a terminal status.
    pub async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.wait_for_run_with(thread_id, run_id, WaitOptions::default())
            .await
    }

    /// Poll a run until it reaches a terminal status.
    ///
    /// A `failed`, `cancelled` or `expired` run is returned as `Ok`; inspect
    /// [`Run::status`]. Returns [`Error::PollTimeout`] if `max_wait` elapses first.
    pub async fn wait_for_run_with(
        &self,
        thread_id: &str,
        run_id: &str,
        opts: WaitOptions,
    ) -> Result<Run> {
        let mut schedule = PollSchedule::new(&opts, Instant::now());
        loop {
            let now = Instant::now();
            let call_timeout = schedule.call_timeout(self.inner.request_timeout, now);
            let op = operations::get_run(thread_id, run_id)?.with_timeout(call_timeout);
            let run = match self.execute(op).await {
                Ok(run) => run,
                Err(err) if err.is_transport_timeout() && schedule.expired(Instant::now()) => {
                    return Err(Error::PollTimeout(schedule.timeout_error(
                        thread_id,
                        run_id,
                        Instant::now(),
                    )));
                }
                Err(err) => return Err(err),
            };
            schedule.record(run.status);
            self.inner.telemetry.record_poll(RunPollMetrics {
                thread_id: thread_id.to_string(),
                run_id: run_id.to_string(),
                poll: schedule.polls(),
                status: run.status,
                elapsed: schedule.elapsed(Instant::now()),
            });
            if run.is_terminal() {
                return Ok(run);
            }

            let Some(delay) = schedule.next_delay(Instant::now()) else {
                return Err(Error::PollTimeout(schedule.timeout_error(
                    thread_id,
                    run_id,
                    Instant::now(),
                )));
            };
            sleep(delay).await;
            if schedule.expired(Instant::now()) {
                return Err(Error::PollTimeout(schedule.timeout_error(
                    thread_id,
                    run_id,
                    Instant::now(),
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_poll_every_second_for_five_minutes() {
        let opts = WaitOptions::default();
        assert_eq!(opts.poll_interval, Duration::from_secs(1));
        assert_eq!(opts.backoff_factor, 1.0);
        assert_eq!(opts.max_wait, Some(Duration::from_secs(300)));
    }

    #[test]
    fn builder_overrides() {
        let opts = WaitOptions::default()
            .poll_interval(Duration::from_millis(250))
            .backoff(1.5, Duration::from_secs(2))
            .max_wait(None);
        assert_eq!(opts.poll_interval, Duration::from_millis(250));
        assert_eq!(opts.backoff_factor, 1.5);
        assert_eq!(opts.max_interval, Duration::from_secs(2));
        assert!(opts.max_wait.is_none());
    }
}
