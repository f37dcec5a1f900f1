//! Bounded connection retry with exponential backoff.

use crate::error::{ConnectionError, ConnectionErrorKind, Error, Result};
use std::time::Duration;

/// How many times to try opening a connection and how long to wait.
#[derive(Debug, Clone)]
pub struct ConnectPolicy {
    /// Total number of attempts, at least 1.
    pub max_attempts: u32,
    /// Wait after the first failure; doubled after each further failure.
    pub initial_delay: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
        }
    }
}

impl ConnectPolicy {
    /// Create a policy with explicit limits.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// A single attempt with no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Set the number of attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the initial delay in milliseconds.
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay = Duration::from_millis(ms);
        self
    }

    /// The wait before attempt `attempt + 1`, given `attempt` failures.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

/// Call `open` until it succeeds or the policy runs out of attempts.
///
/// Every failure is logged. When all attempts fail the result is a
/// `RetriesExhausted` connection error wrapping the last failure.
pub fn connect_with_retry<T, F>(policy: &ConnectPolicy, mut open: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match open(attempt) {
            Ok(conn) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "Connected after retry");
                }
                return Ok(conn);
            }
            Err(err) => {
                tracing::warn!(attempt, max_attempts = attempts, error = %err, "Connection attempt failed");
                last_error = Some(err);
                if attempt < attempts {
                    std::thread::sleep(policy.delay_after(attempt));
                }
            }
        }
    }

    let message = match &last_error {
        Some(err) => format!("could not connect after {} attempts: {}", attempts, err),
        None => format!("could not connect after {} attempts", attempts),
    };
    Err(Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::RetriesExhausted,
        message,
        source: last_error.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> Error {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Connect,
            message: "refused".to_string(),
            source: None,
        })
    }

    #[test]
    fn test_delay_doubles() {
        let policy = ConnectPolicy::new(4, Duration::from_millis(10));
        assert_eq!(policy.delay_after(1), Duration::from_millis(10));
        assert_eq!(policy.delay_after(2), Duration::from_millis(20));
        assert_eq!(policy.delay_after(3), Duration::from_millis(40));
    }

    #[test]
    fn test_succeeds_after_failures() {
        let policy = ConnectPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let result = connect_with_retry(&policy, |attempt| {
            calls += 1;
            if attempt < 3 { Err(refused()) } else { Ok("conn") }
        });
        assert_eq!(result.unwrap(), "conn");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhaustion_is_fatal() {
        let policy = ConnectPolicy::new(2, Duration::ZERO);
        let mut calls = 0;
        let result: Result<()> = connect_with_retry(&policy, |_| {
            calls += 1;
            Err(refused())
        });
        assert_eq!(calls, 2);
        match result {
            Err(Error::Connection(e)) => {
                assert_eq!(e.kind, ConnectionErrorKind::RetriesExhausted);
                assert!(e.message.contains("2 attempts"));
                assert!(e.source.is_some());
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = ConnectPolicy::new(0, Duration::ZERO);
        let mut calls = 0;
        let _ = connect_with_retry(&policy, |_| {
            calls += 1;
            Ok(())
        });
        assert_eq!(calls, 1);
    }
}
