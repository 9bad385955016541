//! Trial result aggregation.

use crate::retry::TerminalOutcome;
use seatlock_store::IsolationLevel;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Aggregate result of one (isolation level, actor count) trial.
///
/// Derived from the terminal outcomes at reporting time; nothing here is
/// stored.
#[derive(Debug, Clone, Serialize)]
pub struct TrialSummary {
    /// Number of actors in the trial.
    pub actors: u32,
    /// Isolation level the trial ran under.
    pub isolation: IsolationLevel,
    /// Actors whose reservation committed.
    pub successes: u32,
    /// Actors that resolved without a reservation.
    pub failures: u32,
    /// Mean per-actor latency (total elapsed across actors divided by the
    /// actor count); zero for an empty trial.
    pub mean_latency: Duration,
}

impl TrialSummary {
    /// Reduces a set of terminal outcomes into a summary.
    #[must_use]
    pub fn from_outcomes(isolation: IsolationLevel, outcomes: &[TerminalOutcome]) -> Self {
        let actors = outcomes.len() as u32;
        let successes = outcomes.iter().filter(|o| o.success).count() as u32;
        let total: Duration = outcomes.iter().map(|o| o.elapsed).sum();
        let mean_latency = if actors == 0 {
            Duration::ZERO
        } else {
            total / actors
        };

        Self {
            actors,
            isolation,
            successes,
            failures: actors - successes,
            mean_latency,
        }
    }

    /// Returns true if the trial had no actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors == 0
    }
}

impl fmt::Display for TrialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0 actors @ {}: empty trial", self.isolation);
        }
        write!(
            f,
            "{} actors @ {}: {} succeeded, {} failed, mean latency {:.1?}",
            self.actors, self.isolation, self.successes, self.failures, self.mean_latency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatlock_store::ActorId;
    use proptest::prelude::*;

    fn outcome(actor: u32, success: bool, millis: u64) -> TerminalOutcome {
        TerminalOutcome {
            actor: ActorId::new(actor),
            success,
            attempts: 1,
            elapsed: Duration::from_millis(millis),
            message: String::new(),
        }
    }

    #[test]
    fn counts_and_mean() {
        let outcomes = vec![
            outcome(1, true, 100),
            outcome(2, false, 200),
            outcome(3, false, 300),
        ];
        let summary = TrialSummary::from_outcomes(IsolationLevel::Serializable, &outcomes);

        assert_eq!(summary.actors, 3);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.failures, 2);
        assert_eq!(summary.mean_latency, Duration::from_millis(200));
    }

    #[test]
    fn empty_trial_is_defined() {
        let summary = TrialSummary::from_outcomes(IsolationLevel::ReadCommitted, &[]);
        assert!(summary.is_empty());
        assert_eq!(summary.successes, 0);
        assert_eq!(summary.failures, 0);
        assert_eq!(summary.mean_latency, Duration::ZERO);
        assert!(summary.to_string().contains("empty trial"));
    }

    #[test]
    fn summary_line() {
        let outcomes = vec![outcome(1, true, 150)];
        let summary = TrialSummary::from_outcomes(IsolationLevel::RepeatableRead, &outcomes);
        let line = summary.to_string();
        assert!(line.contains("1 actors @ REPEATABLE READ"));
        assert!(line.contains("1 succeeded, 0 failed"));
    }

    proptest! {
        #[test]
        fn successes_and_failures_always_sum_to_actor_count(
            fates in proptest::collection::vec((any::<bool>(), 0u64..5_000), 0..64)
        ) {
            let outcomes: Vec<TerminalOutcome> = fates
                .iter()
                .enumerate()
                .map(|(i, &(success, millis))| outcome(i as u32 + 1, success, millis))
                .collect();
            let summary = TrialSummary::from_outcomes(IsolationLevel::ReadCommitted, &outcomes);

            prop_assert_eq!(summary.successes + summary.failures, outcomes.len() as u32);
            let max = outcomes.iter().map(|o| o.elapsed).max().unwrap_or(Duration::ZERO);
            prop_assert!(summary.mean_latency <= max);
        }
    }
}
