//! Seat store trait definitions.

use crate::error::StoreResult;
use crate::types::{ActorId, IsolationLevel, SeatId};

/// A transactional store of seats and reservation records.
///
/// The store holds two things: per-seat availability state (the `allocated`
/// flag) and an append-only reservation ledger with a uniqueness constraint
/// on the seat. Every mutation happens inside a [`SeatTransaction`].
///
/// # Invariants
///
/// - At most one confirmed reservation record per seat is ever committed.
/// - The row lock acquired by
///   [`select_seat_for_update`](SeatTransaction::select_seat_for_update) is
///   exclusive and held until the transaction ends.
/// - A failed transaction leaves the store unchanged.
///
/// # Implementors
///
/// - [`crate::MemorySeatStore`] - in-process reference implementation
pub trait SeatStore: Send + Sync {
    /// The transaction handle type produced by [`begin`](Self::begin).
    type Txn: SeatTransaction;

    /// Begins a transaction at the given isolation level.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unreachable`](crate::StoreError::Unreachable)
    /// if the store cannot be reached.
    fn begin(&self, isolation: IsolationLevel) -> StoreResult<Self::Txn>;
}

/// One transactional unit against a [`SeatStore`].
///
/// Writes are staged and become visible only on [`commit`](Self::commit).
/// Dropping a transaction without committing rolls it back and releases any
/// row lock it holds.
pub trait SeatTransaction {
    /// Reads the seat's allocated flag while acquiring an exclusive row
    /// lock.
    ///
    /// Blocks until any concurrent transaction holding the lock ends. The
    /// lock is held until this transaction commits or rolls back.
    ///
    /// # Errors
    ///
    /// - `SeatNotFound` if the seat does not exist
    /// - `SerializationConflict` if the isolation level pins reads to the
    ///   begin snapshot and the row was modified after it
    /// - `InvalidOperation` if this transaction already holds a row lock
    fn select_seat_for_update(&mut self, seat: SeatId) -> StoreResult<bool>;

    /// Stages a confirmed reservation record for the seat.
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if a confirmed record for the seat already
    /// exists. The constraint is checked again at commit; this early check
    /// only fails faster.
    fn insert_reservation(&mut self, actor: ActorId, seat: SeatId) -> StoreResult<()>;

    /// Stages flipping the seat's allocated flag to true.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless this transaction holds the row
    /// lock on `seat`.
    fn mark_seat_allocated(&mut self, seat: SeatId) -> StoreResult<()>;

    /// Commits the transaction, applying staged writes atomically.
    ///
    /// The ledger uniqueness constraint is re-checked under the ledger lock
    /// before anything is applied; the staged insert is applied before the
    /// flag flip. The row lock is released on return, success or not.
    ///
    /// # Errors
    ///
    /// - `UniqueViolation` if another transaction's insert landed first
    /// - `SerializationConflict` if the store detects an isolation-level
    ///   conflict at commit time
    fn commit(self) -> StoreResult<()>;

    /// Rolls the transaction back, discarding staged writes and releasing
    /// the row lock.
    fn rollback(self);
}
