//! Per-source attempt state machine.
//!
//! ```text
//! Pending(n) -> Running(n) -> Succeeded
//!                          -> Backoff(n, delay) -> Pending(n + 1)
//!                          -> Failed
//! ```
//!
//! A transient failure moves to `Backoff` while retries remain; the collector
//! waits out the delay with a cancellable timer. Permanent failures and
//! exhausted retries move straight to `Failed`.

use std::time::Duration;

use crate::pipeline::ingestion::CollectConfig;
use crate::types::SourceErrorKind;

/// Retry decisions derived from [`CollectConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CollectConfig) -> Self {
        Self {
            enabled: config.retry_failed_sources,
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based),
    /// or `None` when no retry is allowed
    pub fn delay_after(&self, attempt: u32, transient: bool) -> Option<Duration> {
        if !transient || !self.enabled || attempt > self.max_retries {
            return None;
        }
        Some(self.backoff * attempt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Pending { attempt: u32 },
    Running { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Failed { attempts: u32, kind: SourceErrorKind },
}

impl AttemptState {
    pub fn start() -> Self {
        AttemptState::Pending { attempt: 1 }
    }

    /// Number of attempts started so far
    pub fn attempts(&self) -> u32 {
        match self {
            AttemptState::Pending { attempt } => attempt - 1,
            AttemptState::Running { attempt } | AttemptState::Backoff { attempt, .. } => *attempt,
            AttemptState::Succeeded { attempts } | AttemptState::Failed { attempts, .. } => *attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Succeeded { .. } | AttemptState::Failed { .. })
    }

    pub fn run(self) -> Self {
        match self {
            AttemptState::Pending { attempt } => AttemptState::Running { attempt },
            other => other,
        }
    }

    pub fn succeed(self) -> Self {
        match self {
            AttemptState::Running { attempt } => AttemptState::Succeeded { attempts: attempt },
            other => other,
        }
    }

    /// Transition out of `Running` after a failed attempt
    pub fn fail(self, transient: bool, policy: &RetryPolicy) -> Self {
        let AttemptState::Running { attempt } = self else { return self };
        match policy.delay_after(attempt, transient) {
            Some(delay) => AttemptState::Backoff { attempt, delay },
            None => AttemptState::Failed {
                attempts: attempt,
                kind: if transient { SourceErrorKind::Transient } else { SourceErrorKind::Permanent },
            },
        }
    }

    /// A panic is never retried
    pub fn panic(self) -> Self {
        let attempts = self.attempts();
        AttemptState::Failed { attempts, kind: SourceErrorKind::Panicked }
    }

    pub fn cancel(self) -> Self {
        let attempts = self.attempts();
        AttemptState::Failed { attempts, kind: SourceErrorKind::Cancelled }
    }

    /// Backoff elapsed; schedule the next attempt
    pub fn resume(self) -> Self {
        match self {
            AttemptState::Backoff { attempt, .. } => AttemptState::Pending { attempt: attempt + 1 },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy { enabled: true, max_retries, backoff: Duration::from_millis(1500) }
    }

    #[test]
    fn test_linear_backoff() {
        let policy = policy(3);
        assert_eq!(policy.delay_after(1, true), Some(Duration::from_millis(1500)));
        assert_eq!(policy.delay_after(2, true), Some(Duration::from_millis(3000)));
        assert_eq!(policy.delay_after(4, true), None);
        assert_eq!(policy.delay_after(1, false), None);
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let policy = RetryPolicy { enabled: false, ..policy(5) };
        assert_eq!(policy.delay_after(1, true), None);
    }

    #[test]
    fn test_transient_failures_exhaust_retries() {
        let policy = policy(2);
        let mut state = AttemptState::start();
        for expected_attempt in 1..=2 {
            state = state.run().fail(true, &policy);
            assert!(matches!(state, AttemptState::Backoff { attempt, .. } if attempt == expected_attempt));
            state = state.resume();
        }
        state = state.run().fail(true, &policy);
        assert_eq!(state, AttemptState::Failed { attempts: 3, kind: SourceErrorKind::Transient });
    }

    #[test]
    fn test_permanent_failure_stops_immediately() {
        let state = AttemptState::start().run().fail(false, &policy(2));
        assert_eq!(state, AttemptState::Failed { attempts: 1, kind: SourceErrorKind::Permanent });
    }

    #[test]
    fn test_cancel_during_backoff_keeps_attempt_count() {
        let state = AttemptState::start().run().fail(true, &policy(2)).cancel();
        assert_eq!(state, AttemptState::Failed { attempts: 1, kind: SourceErrorKind::Cancelled });
        assert!(state.is_terminal());
    }

    #[test]
    fn test_success_after_retry() {
        let state = AttemptState::start().run().fail(true, &policy(2)).resume().run().succeed();
        assert_eq!(state, AttemptState::Succeeded { attempts: 2 });
    }
}
