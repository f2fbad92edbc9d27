//! Bounded polling for backing services that take a while to come up.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::StepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_secs(1),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Answer of one probe attempt.
#[derive(Debug)]
pub enum Poll<T> {
    Ready(T),
    /// Not yet available; retry.
    Pending(String),
    /// Unrecoverable; stop waiting.
    Abort(anyhow::Error),
}

/// Probe until ready, aborted, or `policy.timeout` has elapsed.
pub fn wait_until<T, F>(what: &str, policy: WaitPolicy, mut probe: F) -> Result<T, StepError>
where
    F: FnMut() -> Poll<T>,
{
    let start = Instant::now();
    loop {
        match probe() {
            Poll::Ready(value) => return Ok(value),
            Poll::Abort(err) => return Err(StepError::Other(err)),
            Poll::Pending(reason) => {
                let elapsed = start.elapsed();
                if elapsed >= policy.timeout {
                    return Err(StepError::Timeout {
                        what: what.to_string(),
                        waited: elapsed,
                    });
                }
                tracing::info!(%reason, "Waiting for {what}...");
                let remaining = policy.timeout - elapsed;
                thread::sleep(policy.interval.min(remaining));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_once_ready() {
        let mut attempts = 0;
        let value = wait_until(
            "thing",
            WaitPolicy::new(Duration::from_secs(5)).with_interval(Duration::from_millis(1)),
            || {
                attempts += 1;
                if attempts < 3 {
                    Poll::Pending("not yet".to_string())
                } else {
                    Poll::Ready(attempts)
                }
            },
        )
        .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn abort_stops_immediately() {
        let err = wait_until::<(), _>(
            "thing",
            WaitPolicy::new(Duration::from_secs(5)),
            || Poll::Abort(anyhow::anyhow!("Access denied for user 'root'")),
        )
        .unwrap_err();
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn times_out_near_the_bound() {
        let bound = Duration::from_millis(300);
        let start = Instant::now();
        let err = wait_until::<(), _>(
            "database container",
            WaitPolicy::new(bound).with_interval(Duration::from_millis(50)),
            || Poll::Pending("connection refused".to_string()),
        )
        .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= bound);
        assert!(elapsed < bound + Duration::from_secs(2));
    }
}
