//! Bounded retry with linear backoff.

use crate::attempt::{AttemptOutcome, AttemptRunner};
use seatlock_store::ActorId;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Retry policy for one actor's reservation attempts.
///
/// The backoff schedule is deliberately LINEAR: the delay before retry
/// `k + 1` is `backoff_unit * k`. The widening gaps give competing
/// transactions room to finish their own retry cycle instead of
/// re-colliding on the same row.
#[derive(Debug, Clone, Serialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts per actor.
    pub max_attempts: u32,
    /// Base delay unit; retry `k + 1` waits `backoff_unit * k`.
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt cap and the default 200ms
    /// backoff unit.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_unit: Duration::from_millis(200),
        }
    }

    /// Sets the backoff unit.
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Delay to sleep after `completed_attempts` attempts have failed.
    #[must_use]
    pub fn delay_for_attempt(&self, completed_attempts: u32) -> Duration {
        self.backoff_unit * completed_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5)
    }
}

/// Final, non-retried result of one actor's attempt sequence.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalOutcome {
    /// The actor this outcome belongs to.
    pub actor: ActorId,
    /// Whether the actor's reservation committed.
    pub success: bool,
    /// Attempts performed, including the final one.
    pub attempts: u32,
    /// Wall-clock time from the first attempt to resolution, backoff
    /// included.
    pub elapsed: Duration,
    /// Human-readable description of the actor's fate.
    pub message: String,
}

impl TerminalOutcome {
    fn new(actor: ActorId, success: bool, attempts: u32, elapsed: Duration, message: String) -> Self {
        Self {
            actor,
            success,
            attempts,
            elapsed,
            message,
        }
    }
}

impl std::fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.success { "ok" } else { "failed" };
        write!(
            f,
            "actor {}: {} - {} [{} attempt(s), {:.1?}]",
            self.actor.as_u32(),
            verdict,
            self.message,
            self.attempts,
            self.elapsed
        )
    }
}

/// Turns a sequence of attempt executions into one terminal outcome.
///
/// The controller masks transient contention up to the policy's attempt cap
/// and never propagates an error upward; every path resolves to a
/// [`TerminalOutcome`].
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    /// Creates a controller with the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The controller's policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drives the runner until a terminal outcome is reached.
    ///
    /// Latency is measured from the first attempt through final
    /// resolution; retries and backoff sleeps are part of the measured
    /// phenomenon.
    pub fn resolve<R: AttemptRunner>(&self, actor: ActorId, runner: &R) -> TerminalOutcome {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_conflict = String::new();

        for attempt in 1..=max_attempts {
            match runner.attempt() {
                AttemptOutcome::Committed => {
                    return TerminalOutcome::new(
                        actor,
                        true,
                        attempt,
                        start.elapsed(),
                        "reservation confirmed".into(),
                    );
                }
                AttemptOutcome::AlreadyAllocated => {
                    return TerminalOutcome::new(
                        actor,
                        false,
                        attempt,
                        start.elapsed(),
                        "seat already reserved".into(),
                    );
                }
                AttemptOutcome::FatalError(message) => {
                    warn!(%actor, attempt, %message, "fatal store error");
                    return TerminalOutcome::new(
                        actor,
                        false,
                        attempt,
                        start.elapsed(),
                        format!("store error: {message}"),
                    );
                }
                AttemptOutcome::ConflictRetryable(message) => {
                    last_conflict = message;
                    if attempt < max_attempts {
                        let delay = self.policy.delay_for_attempt(attempt);
                        debug!(%actor, attempt, ?delay, "conflict, backing off");
                        thread::sleep(delay);
                    }
                }
            }
        }

        TerminalOutcome::new(
            actor,
            false,
            max_attempts,
            start.elapsed(),
            format!("gave up after {max_attempts} attempts: {last_conflict}"),
        )
    }
}
