use crate::core::WaitConfig;
use crate::errors::{DriverError, WaitError, WaitResult};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// What a single probe attempt observed.
#[derive(Debug)]
pub enum Probe<T> {
    /// The condition holds; stop polling.
    Ready(T),
    /// Not yet; carries the state observed this attempt, if any.
    Busy(Option<String>),
    /// Abort the poll and surface the error immediately.
    Fatal(WaitError),
}

impl<T> Probe<T> {
    pub fn busy(observed: impl Into<String>) -> Self {
        Probe::Busy(Some(observed.into()))
    }

    pub fn pending() -> Self {
        Probe::Busy(None)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Probe<U> {
        match self {
            Probe::Ready(value) => Probe::Ready(f(value)),
            Probe::Busy(observed) => Probe::Busy(observed),
            Probe::Fatal(err) => Probe::Fatal(err),
        }
    }
}

/// Transient driver errors keep the poll going, anything else ends it.
impl<T> From<DriverError> for Probe<T> {
    fn from(err: DriverError) -> Self {
        if err.is_transient() {
            trace!(error = %err, "absorbing transient driver error");
            Probe::Busy(Some(err.to_string()))
        } else {
            Probe::Fatal(err.into())
        }
    }
}

impl<T> From<WaitError> for Probe<T> {
    fn from(err: WaitError) -> Self {
        Probe::Fatal(err)
    }
}

/// Unwraps a driver or engine result inside a probe closure, returning the
/// matching [`Probe`] from the closure on error.
macro_rules! attempt {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => return $crate::wait::Probe::from(err),
        }
    };
}

/// Result of a bounded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Success(T),
    TimedOut {
        elapsed: Duration,
        last_observed: Option<String>,
        attempts: u32,
    },
}

impl<T> PollOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success(_))
    }

    /// Converts a timeout into the caller's error.
    pub fn or_else_timeout(
        self,
        on_timeout: impl FnOnce(Duration, Option<String>) -> WaitError,
    ) -> WaitResult<T> {
        match self {
            PollOutcome::Success(value) => Ok(value),
            PollOutcome::TimedOut {
                elapsed,
                last_observed,
                ..
            } => Err(on_timeout(elapsed, last_observed)),
        }
    }
}

/// Calls `probe` every `poll_interval` until it is ready, it fails fatally,
/// or `timeout` has elapsed.
///
/// The probe always runs at least once. The last sleep is shortened so the
/// final attempt lands on the deadline, which keeps the reported elapsed
/// time within `[timeout, timeout + poll_interval)`.
pub fn poll<T, F>(config: &WaitConfig, mut probe: F) -> WaitResult<PollOutcome<T>>
where
    F: FnMut() -> Probe<T>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;
    let mut last_observed = None;

    loop {
        attempts += 1;
        match probe() {
            Probe::Ready(value) => {
                trace!(attempts, elapsed = ?started.elapsed(), "poll satisfied");
                return Ok(PollOutcome::Success(value));
            }
            Probe::Busy(observed) => {
                if observed.is_some() {
                    last_observed = observed;
                }
            }
            Probe::Fatal(err) => {
                debug!(attempts, error = %err, "poll aborted");
                return Err(err);
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= config.timeout {
            debug!(attempts, ?elapsed, ?last_observed, "poll timed out");
            return Ok(PollOutcome::TimedOut {
                elapsed,
                last_observed,
                attempts,
            });
        }

        thread::sleep(config.poll_interval.min(config.timeout - elapsed));
    }
}

/// [`poll`] with a timeout reported as [`WaitError::Timeout`].
pub fn poll_until<T, F>(config: &WaitConfig, action: &str, probe: F) -> WaitResult<T>
where
    F: FnMut() -> Probe<T>,
{
    poll(config, probe)?.or_else_timeout(|elapsed, last_observed| WaitError::Timeout {
        action: action.to_string(),
        elapsed,
        last_observed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(timeout_ms: u64) -> WaitConfig {
        WaitConfig::new(Duration::from_millis(timeout_ms))
            .with_poll_interval(Duration::from_millis(100))
    }

    #[test]
    fn test_times_out_within_one_interval_of_deadline() {
        for timeout_ms in [0, 250, 500] {
            let started = Instant::now();
            let mut calls = 0;
            let result: WaitResult<()> = poll_until(&config(timeout_ms), "waiting", || {
                calls += 1;
                Probe::busy("still loading")
            });
            let elapsed = started.elapsed();

            match result {
                Err(WaitError::Timeout { last_observed, .. }) => {
                    assert_eq!(last_observed.as_deref(), Some("still loading"));
                }
                other => panic!("expected timeout, got {:?}", other),
            }
            assert!(elapsed >= Duration::from_millis(timeout_ms));
            assert!(elapsed < Duration::from_millis(timeout_ms + 100));
            assert!(calls >= 1);
        }
    }

    #[test]
    fn test_returns_value_from_nth_attempt() {
        let mut calls = 0;
        let value = poll_until(&config(1000), "counting", || {
            calls += 1;
            if calls == 4 {
                Probe::Ready(calls)
            } else {
                Probe::pending()
            }
        })
        .unwrap();

        assert_eq!(value, 4);
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_transient_errors_look_like_busy() {
        let run = |transient: bool| {
            let mut calls = 0;
            poll(&config(1000), || {
                calls += 1;
                if calls < 3 {
                    if transient {
                        Probe::from(DriverError::StaleReference("node 7".into()))
                    } else {
                        Probe::pending()
                    }
                } else {
                    Probe::Ready("done")
                }
            })
            .unwrap()
        };

        assert_eq!(run(true), PollOutcome::Success("done"));
        assert_eq!(run(false), PollOutcome::Success("done"));
    }

    #[test]
    fn test_fatal_errors_abort_immediately() {
        let started = Instant::now();
        let mut calls = 0;
        let result: WaitResult<PollOutcome<()>> = poll(&config(5000), || {
            calls += 1;
            Probe::from(DriverError::InvalidSelector("[data-".into()))
        });

        assert!(matches!(
            result,
            Err(WaitError::Driver(DriverError::InvalidSelector(_)))
        ));
        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_timeout_reports_attempts_and_last_state() {
        let mut calls = 0;
        let outcome: PollOutcome<()> = poll(&config(300), || {
            calls += 1;
            if calls == 1 {
                Probe::busy("first")
            } else {
                Probe::pending()
            }
        })
        .unwrap();

        match outcome {
            PollOutcome::TimedOut {
                last_observed,
                attempts,
                elapsed,
            } => {
                assert_eq!(last_observed.as_deref(), Some("first"));
                assert_eq!(attempts, calls);
                assert!(elapsed >= Duration::from_millis(300));
            }
            PollOutcome::Success(_) => panic!("probe never succeeds"),
        }
    }
}
