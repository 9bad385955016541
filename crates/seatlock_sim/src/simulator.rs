//! Concurrent trial orchestration.

use crate::attempt::ReservationAttempt;
use crate::error::{SimError, SimResult};
use crate::retry::{RetryController, RetryPolicy, TerminalOutcome};
use crate::summary::TrialSummary;
use seatlock_store::{ActorId, IsolationLevel, SeatId, SeatStore};
use serde::Serialize;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// Configuration for one contention trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialConfig {
    /// Isolation level every actor's transactions run at.
    pub isolation: IsolationLevel,
    /// Number of concurrent actors.
    pub actors: u32,
    /// The seat pool actors are assigned to, round-robin.
    pub pool: Vec<SeatId>,
    /// Retry policy applied per actor.
    pub retry: RetryPolicy,
}

impl TrialConfig {
    /// Creates a trial configuration with the default retry policy.
    #[must_use]
    pub fn new(isolation: IsolationLevel, actors: u32, pool: Vec<SeatId>) -> Self {
        Self {
            isolation,
            actors,
            pool,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Seat assigned to the (1-based) actor: `pool[(i - 1) mod len]`.
    ///
    /// # Panics
    ///
    /// Panics on an empty pool; [`validate`](Self::validate) rejects that
    /// before any assignment happens.
    #[must_use]
    pub fn seat_for_actor(&self, actor: ActorId) -> SeatId {
        let index = (actor.as_u32().saturating_sub(1)) as usize % self.pool.len();
        self.pool[index]
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero actors or an empty seat pool.
    pub fn validate(&self) -> SimResult<()> {
        if self.actors == 0 {
            return Err(SimError::invalid_config("actor count must be at least 1"));
        }
        if self.pool.is_empty() {
            return Err(SimError::invalid_config("seat pool must not be empty"));
        }
        Ok(())
    }
}

/// Everything a finished trial produced.
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    /// One terminal outcome per actor; arrival order, unconstrained.
    pub outcomes: Vec<TerminalOutcome>,
    /// The aggregate summary.
    pub summary: TrialSummary,
}

/// Runs N actors concurrently against a shared seat pool.
///
/// Each actor runs its own retry controller on its own thread; the only
/// cross-actor blocking is the store's row locking. Outcomes are collected
/// over a channel bounded to the actor count, so the aggregator observes
/// exactly N outcomes and nothing buffers without bound.
pub struct ContentionSimulator;

impl ContentionSimulator {
    /// Runs one trial to completion and aggregates the outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, a thread that could
    /// not be spawned, or a lost outcome (an actor panicking outside the
    /// attempt taxonomy is a defect, not a modeled condition).
    pub fn run<S>(store: Arc<S>, config: &TrialConfig) -> SimResult<TrialReport>
    where
        S: SeatStore + 'static,
    {
        config.validate()?;
        let actor_count = config.actors as usize;
        info!(
            actors = config.actors,
            pool = config.pool.len(),
            isolation = %config.isolation,
            "trial start"
        );

        let (outcome_tx, outcome_rx) = mpsc::sync_channel::<TerminalOutcome>(actor_count);
        let mut handles = Vec::with_capacity(actor_count);

        for i in 1..=config.actors {
            let actor = ActorId::new(i);
            let seat = config.seat_for_actor(actor);
            let isolation = config.isolation;
            let controller = RetryController::new(config.retry.clone());
            let store = Arc::clone(&store);
            let outcome_tx = outcome_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("actor-{i}"))
                .spawn(move || {
                    let attempt = ReservationAttempt::new(&*store, actor, seat, isolation);
                    let outcome = controller.resolve(actor, &attempt);
                    // The receiver outlives every sender and the channel is
                    // sized to the actor count, so this cannot block or fail.
                    let _ = outcome_tx.send(outcome);
                })?;
            handles.push(handle);
        }
        drop(outcome_tx);

        for handle in handles {
            if handle.join().is_err() {
                error!("actor thread panicked; its outcome is lost");
            }
        }

        let outcomes: Vec<TerminalOutcome> = outcome_rx.try_iter().collect();
        if outcomes.len() != actor_count {
            return Err(SimError::ActorLost {
                expected: actor_count,
                received: outcomes.len(),
            });
        }

        let summary = TrialSummary::from_outcomes(config.isolation, &outcomes);
        info!(%summary, "trial complete");
        Ok(TrialReport { outcomes, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatlock_store::MemorySeatStore;
    use std::time::Duration;

    fn pool(ids: &[u32]) -> Vec<SeatId> {
        ids.iter().copied().map(SeatId::new).collect()
    }

    fn fast_config(isolation: IsolationLevel, actors: u32, ids: &[u32]) -> TrialConfig {
        TrialConfig::new(isolation, actors, pool(ids))
            .with_retry(RetryPolicy::new(5).with_backoff_unit(Duration::from_millis(5)))
    }

    #[test]
    fn round_robin_assignment() {
        let config = fast_config(IsolationLevel::ReadCommitted, 30, &[1, 3, 5]);
        assert_eq!(config.seat_for_actor(ActorId::new(1)), SeatId::new(1));
        assert_eq!(config.seat_for_actor(ActorId::new(2)), SeatId::new(3));
        assert_eq!(config.seat_for_actor(ActorId::new(3)), SeatId::new(5));
        assert_eq!(config.seat_for_actor(ActorId::new(4)), SeatId::new(1));
        assert_eq!(config.seat_for_actor(ActorId::new(30)), SeatId::new(5));
    }

    #[test]
    fn config_validation() {
        assert!(fast_config(IsolationLevel::ReadCommitted, 1, &[1])
            .validate()
            .is_ok());

        let err = fast_config(IsolationLevel::ReadCommitted, 0, &[1])
            .validate()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { .. }));

        let err = fast_config(IsolationLevel::ReadCommitted, 1, &[])
            .validate()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { .. }));
    }

    #[test]
    fn single_actor_trial() {
        let config = fast_config(IsolationLevel::ReadCommitted, 1, &[1]);
        let store = Arc::new(MemorySeatStore::with_seats(&config.pool));

        let report = ContentionSimulator::run(store, &config).unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.summary.successes, 1);
        assert_eq!(report.summary.failures, 0);
    }

    #[test]
    fn every_actor_yields_exactly_one_outcome() {
        let config = fast_config(IsolationLevel::Serializable, 12, &[1, 2]);
        let store = Arc::new(MemorySeatStore::with_seats(&config.pool));

        let report = ContentionSimulator::run(store, &config).unwrap();
        assert_eq!(report.outcomes.len(), 12);

        let mut actors: Vec<u32> = report.outcomes.iter().map(|o| o.actor.as_u32()).collect();
        actors.sort_unstable();
        assert_eq!(actors, (1..=12).collect::<Vec<u32>>());
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let config = fast_config(IsolationLevel::ReadCommitted, 0, &[1]);
        let store = Arc::new(MemorySeatStore::with_seats(&config.pool));
        assert!(matches!(
            ContentionSimulator::run(store, &config),
            Err(SimError::InvalidConfig { .. })
        ));
    }
}
