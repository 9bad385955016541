//! Single reservation attempt execution.

use seatlock_store::{ActorId, IsolationLevel, SeatId, SeatStore, SeatTransaction, StoreError};
use tracing::{debug, trace};

/// Outcome of one reservation attempt.
///
/// Every failure mode of the store is folded into one of these variants;
/// an attempt never panics and never returns a raw error across its
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The reservation committed; the actor owns the seat.
    Committed,
    /// The seat is genuinely taken. Terminal, never retried.
    AlreadyAllocated,
    /// The store signaled a transient conflict; the attempt may be retried.
    ConflictRetryable(String),
    /// Store-level malfunction. Terminal, surfaced verbatim.
    FatalError(String),
}

impl AttemptOutcome {
    /// Returns true if the retry controller may try again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictRetryable(_))
    }

    /// Classifies a store error into an attempt outcome.
    fn from_store_error(err: &StoreError) -> Self {
        if err.is_unique_violation() {
            // Another actor's insert landed first; the seat is gone, not
            // contended.
            Self::AlreadyAllocated
        } else if err.is_serialization_conflict() {
            Self::ConflictRetryable(err.to_string())
        } else {
            Self::FatalError(err.to_string())
        }
    }
}

/// Runs one attempt and reports its outcome.
///
/// The seam the retry controller drives; implemented by
/// [`ReservationAttempt`] and by deterministic stubs in tests.
pub trait AttemptRunner {
    /// Executes one attempt.
    fn attempt(&self) -> AttemptOutcome;
}

/// One bounded reservation transaction on behalf of one actor.
///
/// An attempt is a single transactional unit: begin at the configured
/// isolation level, read the seat under an exclusive row lock, and if it is
/// free, insert the reservation record and then flip the allocated flag.
/// The insert strictly precedes the update: the ledger uniqueness
/// constraint is the last line of defense against a race the row lock did
/// not catch, and it can only fire before the flag flip if the insert comes
/// first.
pub struct ReservationAttempt<'a, S: SeatStore> {
    store: &'a S,
    actor: ActorId,
    seat: SeatId,
    isolation: IsolationLevel,
}

impl<'a, S: SeatStore> ReservationAttempt<'a, S> {
    /// Creates an attempt bound to one actor and one seat.
    pub fn new(store: &'a S, actor: ActorId, seat: SeatId, isolation: IsolationLevel) -> Self {
        Self {
            store,
            actor,
            seat,
            isolation,
        }
    }

    /// Executes exactly one transaction, classifying every exit path.
    pub fn execute(&self) -> AttemptOutcome {
        trace!(actor = %self.actor, seat = %self.seat, isolation = %self.isolation, "attempt begin");

        let mut txn = match self.store.begin(self.isolation) {
            Ok(txn) => txn,
            Err(err) => return AttemptOutcome::from_store_error(&err),
        };

        let allocated = match txn.select_seat_for_update(self.seat) {
            Ok(allocated) => allocated,
            Err(err) => {
                let outcome = AttemptOutcome::from_store_error(&err);
                txn.rollback();
                return outcome;
            }
        };

        if allocated {
            txn.rollback();
            debug!(actor = %self.actor, seat = %self.seat, "seat already allocated");
            return AttemptOutcome::AlreadyAllocated;
        }

        if let Err(err) = txn.insert_reservation(self.actor, self.seat) {
            let outcome = AttemptOutcome::from_store_error(&err);
            txn.rollback();
            return outcome;
        }

        if let Err(err) = txn.mark_seat_allocated(self.seat) {
            let outcome = AttemptOutcome::from_store_error(&err);
            txn.rollback();
            return outcome;
        }

        match txn.commit() {
            Ok(()) => {
                debug!(actor = %self.actor, seat = %self.seat, "reservation committed");
                AttemptOutcome::Committed
            }
            Err(err) => AttemptOutcome::from_store_error(&err),
        }
    }
}

impl<S: SeatStore> AttemptRunner for ReservationAttempt<'_, S> {
    fn attempt(&self) -> AttemptOutcome {
        self.execute()
    }
}
