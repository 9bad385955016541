//! In-memory seat store.

use crate::error::{StoreError, StoreResult};
use crate::store::{SeatStore, SeatTransaction};
use crate::types::{ActorId, IsolationLevel, ReservationRecord, SeatId};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Owned guard over one seat row; lives inside the transaction so the row
/// lock spans the transaction's whole lifetime.
type SeatRowGuard = ArcMutexGuard<RawMutex, SeatRow>;

/// Mutable state of one seat row.
#[derive(Debug)]
struct SeatRow {
    allocated: bool,
    /// Commit sequence of the last transaction that modified this row.
    modified_seq: u64,
}

/// Shared store state behind the cloneable handle.
#[derive(Debug)]
struct StoreInner {
    seats: RwLock<HashMap<SeatId, Arc<Mutex<SeatRow>>>>,
    ledger: Mutex<Vec<ReservationRecord>>,
    commit_seq: AtomicU64,
    reachable: AtomicBool,
    forced_commit_failures: AtomicU64,
}

impl StoreInner {
    /// Consumes one forced commit failure, if any are armed.
    fn take_forced_commit_failure(&self) -> bool {
        self.forced_commit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// An in-process seat store.
///
/// Seats are rows guarded by per-seat mutexes: `select ... for update` takes
/// the row's lock and the transaction keeps it until commit or rollback,
/// which is exactly the blocking behavior concurrent reservation attempts
/// contend on. A global commit sequence provides begin snapshots for the
/// snapshot-pinned isolation levels.
///
/// # Thread Safety
///
/// The store handle is cheaply cloneable and can be shared across threads.
/// Transactions are single-threaded values; each actor begins and finishes
/// its own.
///
/// # Example
///
/// ```rust
/// use seatlock_store::{
///     ActorId, IsolationLevel, MemorySeatStore, SeatId, SeatStore, SeatTransaction,
/// };
///
/// let store = MemorySeatStore::with_seats(&[SeatId::new(1)]);
/// let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
/// assert!(!txn.select_seat_for_update(SeatId::new(1)).unwrap());
/// txn.insert_reservation(ActorId::new(1), SeatId::new(1)).unwrap();
/// txn.mark_seat_allocated(SeatId::new(1)).unwrap();
/// txn.commit().unwrap();
/// assert!(store.is_allocated(SeatId::new(1)).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct MemorySeatStore {
    inner: Arc<StoreInner>,
}

impl MemorySeatStore {
    /// Creates an empty store with no seats.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                seats: RwLock::new(HashMap::new()),
                ledger: Mutex::new(Vec::new()),
                commit_seq: AtomicU64::new(0),
                reachable: AtomicBool::new(true),
                forced_commit_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a store seeded with the given seats, all unallocated.
    #[must_use]
    pub fn with_seats(seats: &[SeatId]) -> Self {
        let store = Self::new();
        for &seat in seats {
            store.add_seat(seat);
        }
        store
    }

    /// Adds an unallocated seat. Re-adding an existing seat is a no-op.
    pub fn add_seat(&self, seat: SeatId) {
        self.inner.seats.write().entry(seat).or_insert_with(|| {
            Arc::new(Mutex::new(SeatRow {
                allocated: false,
                modified_seq: 0,
            }))
        });
    }

    /// Marks a seat allocated outside any trial, recording a confirmed
    /// ledger entry for actor 0.
    ///
    /// Returns false if the seat does not exist or was already allocated.
    pub fn preallocate(&self, seat: SeatId) -> bool {
        let row = match self.inner.seats.read().get(&seat).cloned() {
            Some(row) => row,
            None => return false,
        };
        let mut row = row.lock();
        if row.allocated {
            return false;
        }
        let seq = self.inner.commit_seq.fetch_add(1, Ordering::SeqCst) + 1;
        row.allocated = true;
        row.modified_seq = seq;
        self.inner
            .ledger
            .lock()
            .push(ReservationRecord::confirmed(ActorId::new(0), seat, seq));
        true
    }

    /// Returns the seat's allocated flag, or `None` if the seat is unknown.
    #[must_use]
    pub fn is_allocated(&self, seat: SeatId) -> Option<bool> {
        let row = self.inner.seats.read().get(&seat).cloned()?;
        let allocated = row.lock().allocated;
        Some(allocated)
    }

    /// Number of confirmed ledger records for the seat.
    #[must_use]
    pub fn confirmed_count(&self, seat: SeatId) -> usize {
        self.inner
            .ledger
            .lock()
            .iter()
            .filter(|r| r.seat == seat)
            .count()
    }

    /// Returns a copy of the reservation ledger.
    #[must_use]
    pub fn ledger(&self) -> Vec<ReservationRecord> {
        self.inner.ledger.lock().clone()
    }

    /// Returns the current commit sequence.
    #[must_use]
    pub fn commit_seq(&self) -> u64 {
        self.inner.commit_seq.load(Ordering::SeqCst)
    }

    /// Makes [`SeatStore::begin`] fail with `Unreachable` while false.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Arms the next `count` commits to fail with a serialization conflict.
    ///
    /// Fault injection for forced-conflict tests; the failures are consumed
    /// across all transactions in arming order.
    pub fn fail_next_commits(&self, count: u64) {
        self.inner
            .forced_commit_failures
            .store(count, Ordering::SeqCst);
    }
}

impl Default for MemorySeatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeatStore for MemorySeatStore {
    type Txn = MemorySeatTransaction;

    fn begin(&self, isolation: IsolationLevel) -> StoreResult<Self::Txn> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable);
        }
        let snapshot = self.inner.commit_seq.load(Ordering::SeqCst);
        trace!(%isolation, snapshot, "transaction begin");
        Ok(MemorySeatTransaction {
            inner: Arc::clone(&self.inner),
            isolation,
            snapshot,
            row_guard: None,
            locked_seat: None,
            staged_insert: None,
            staged_flag: None,
        })
    }
}

/// A transaction against a [`MemorySeatStore`].
///
/// Holds the row lock from `select ... for update` until the transaction
/// ends. Dropping the transaction rolls it back.
pub struct MemorySeatTransaction {
    inner: Arc<StoreInner>,
    isolation: IsolationLevel,
    snapshot: u64,
    row_guard: Option<SeatRowGuard>,
    locked_seat: Option<SeatId>,
    staged_insert: Option<(ActorId, SeatId)>,
    staged_flag: Option<SeatId>,
}

impl MemorySeatTransaction {
    /// The isolation level this transaction was begun with.
    #[must_use]
    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }
}

impl SeatTransaction for MemorySeatTransaction {
    fn select_seat_for_update(&mut self, seat: SeatId) -> StoreResult<bool> {
        if self.row_guard.is_some() {
            return Err(StoreError::invalid_operation(
                "transaction already holds a row lock",
            ));
        }
        let row = self
            .inner
            .seats
            .read()
            .get(&seat)
            .cloned()
            .ok_or(StoreError::SeatNotFound { seat })?;

        // Blocks until the current lock holder commits or rolls back.
        let guard = row.lock_arc();

        if self.isolation.uses_snapshot() && guard.modified_seq > self.snapshot {
            // The row moved under our snapshot; Postgres reports this as
            // "could not serialize access due to concurrent update".
            debug!(
                %seat,
                snapshot = self.snapshot,
                modified_seq = guard.modified_seq,
                "locked read conflicts with snapshot"
            );
            return Err(StoreError::SerializationConflict { seat });
        }

        let allocated = guard.allocated;
        self.row_guard = Some(guard);
        self.locked_seat = Some(seat);
        Ok(allocated)
    }

    fn insert_reservation(&mut self, actor: ActorId, seat: SeatId) -> StoreResult<()> {
        if self.staged_insert.is_some() {
            return Err(StoreError::invalid_operation(
                "transaction already staged a reservation",
            ));
        }
        if self.inner.ledger.lock().iter().any(|r| r.seat == seat) {
            return Err(StoreError::UniqueViolation { seat });
        }
        self.staged_insert = Some((actor, seat));
        Ok(())
    }

    fn mark_seat_allocated(&mut self, seat: SeatId) -> StoreResult<()> {
        if self.locked_seat != Some(seat) {
            return Err(StoreError::invalid_operation(
                "row lock not held for the seat being updated",
            ));
        }
        self.staged_flag = Some(seat);
        Ok(())
    }

    fn commit(mut self) -> StoreResult<()> {
        if self.inner.take_forced_commit_failure() {
            let seat = self.locked_seat.unwrap_or(SeatId::new(0));
            debug!(%seat, "injected commit conflict");
            return Err(StoreError::SerializationConflict { seat });
        }

        let seq = {
            let mut ledger = self.inner.ledger.lock();

            // Uniqueness backstop: re-check under the ledger lock, before
            // any staged write is applied.
            if let Some((_, seat)) = self.staged_insert {
                if ledger.iter().any(|r| r.seat == seat) {
                    return Err(StoreError::UniqueViolation { seat });
                }
            }

            let seq = self.inner.commit_seq.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((actor, seat)) = self.staged_insert {
                ledger.push(ReservationRecord::confirmed(actor, seat, seq));
            }
            seq
        };

        if let Some(seat) = self.staged_flag {
            // mark_seat_allocated verified the lock, so the guard is here.
            if let Some(mut guard) = self.row_guard.take() {
                guard.allocated = true;
                guard.modified_seq = seq;
            } else {
                return Err(StoreError::invalid_operation(
                    "row lock lost before commit",
                ));
            }
            debug!(%seat, seq, "seat allocated");
        }

        trace!(seq, "transaction committed");
        Ok(())
        // Remaining guard (read-only transaction) released on drop.
    }

    fn rollback(self) {
        trace!("transaction rolled back");
        // Staged writes and the row guard are dropped unapplied.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn seeded(ids: &[u32]) -> MemorySeatStore {
        let seats: Vec<SeatId> = ids.iter().copied().map(SeatId::new).collect();
        MemorySeatStore::with_seats(&seats)
    }

    fn reserve(
        store: &MemorySeatStore,
        isolation: IsolationLevel,
        actor: u32,
        seat: u32,
    ) -> StoreResult<()> {
        let actor = ActorId::new(actor);
        let seat = SeatId::new(seat);
        let mut txn = store.begin(isolation)?;
        let allocated = txn.select_seat_for_update(seat)?;
        assert!(!allocated);
        txn.insert_reservation(actor, seat)?;
        txn.mark_seat_allocated(seat)?;
        txn.commit()
    }

    #[test]
    fn reserve_commit_round_trip() {
        let store = seeded(&[1]);
        reserve(&store, IsolationLevel::ReadCommitted, 1, 1).unwrap();

        assert_eq!(store.is_allocated(SeatId::new(1)), Some(true));
        assert_eq!(store.confirmed_count(SeatId::new(1)), 1);
        assert_eq!(store.commit_seq(), 1);

        let record = &store.ledger()[0];
        assert_eq!(record.actor, ActorId::new(1));
        assert_eq!(record.status, "confirmed");
    }

    #[test]
    fn select_reports_allocated_seat() {
        let store = seeded(&[1]);
        assert!(store.preallocate(SeatId::new(1)));

        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        assert!(txn.select_seat_for_update(SeatId::new(1)).unwrap());
        txn.rollback();
    }

    #[test]
    fn unknown_seat() {
        let store = seeded(&[1]);
        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        let err = txn.select_seat_for_update(SeatId::new(99)).unwrap_err();
        assert!(matches!(err, StoreError::SeatNotFound { .. }));
    }

    #[test]
    fn insert_fails_fast_on_existing_reservation() {
        let store = seeded(&[1]);
        store.preallocate(SeatId::new(1));

        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        let err = txn
            .insert_reservation(ActorId::new(2), SeatId::new(1))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn commit_backstop_catches_late_insert() {
        let store = seeded(&[1]);

        // Stage an insert while the ledger is still empty, then let a
        // competing record land before commit.
        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        txn.insert_reservation(ActorId::new(2), SeatId::new(1))
            .unwrap();
        store.preallocate(SeatId::new(1));

        let err = txn.commit().unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(store.confirmed_count(SeatId::new(1)), 1);
    }

    #[test]
    fn snapshot_levels_conflict_on_modified_row() {
        let store = seeded(&[1]);

        // Begin before the row changes, read after.
        let mut stale = store.begin(IsolationLevel::RepeatableRead).unwrap();
        store.preallocate(SeatId::new(1));

        let err = stale.select_seat_for_update(SeatId::new(1)).unwrap_err();
        assert!(err.is_serialization_conflict());
    }

    #[test]
    fn read_committed_sees_latest_row() {
        let store = seeded(&[1]);

        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        store.preallocate(SeatId::new(1));

        // No snapshot pinning: the read succeeds and sees the new value.
        assert!(txn.select_seat_for_update(SeatId::new(1)).unwrap());
        txn.rollback();
    }

    #[test]
    fn fresh_snapshot_does_not_conflict() {
        let store = seeded(&[1]);
        store.preallocate(SeatId::new(1));

        let mut txn = store.begin(IsolationLevel::Serializable).unwrap();
        assert!(txn.select_seat_for_update(SeatId::new(1)).unwrap());
        txn.rollback();
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let store = seeded(&[1]);
        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        txn.select_seat_for_update(SeatId::new(1)).unwrap();
        txn.insert_reservation(ActorId::new(1), SeatId::new(1))
            .unwrap();
        txn.mark_seat_allocated(SeatId::new(1)).unwrap();
        txn.rollback();

        assert_eq!(store.is_allocated(SeatId::new(1)), Some(false));
        assert_eq!(store.confirmed_count(SeatId::new(1)), 0);
    }

    #[test]
    fn drop_releases_row_lock() {
        let store = seeded(&[1]);
        {
            let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
            txn.select_seat_for_update(SeatId::new(1)).unwrap();
            // Dropped without commit.
        }
        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        assert!(!txn.select_seat_for_update(SeatId::new(1)).unwrap());
        txn.rollback();
    }

    #[test]
    fn update_without_lock_is_rejected() {
        let store = seeded(&[1]);
        let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        let err = txn.mark_seat_allocated(SeatId::new(1)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidOperation { .. }));
    }

    #[test]
    fn unreachable_store_fails_begin() {
        let store = seeded(&[1]);
        store.set_reachable(false);
        assert!(matches!(
            store.begin(IsolationLevel::ReadCommitted),
            Err(StoreError::Unreachable)
        ));

        store.set_reachable(true);
        assert!(store.begin(IsolationLevel::ReadCommitted).is_ok());
    }

    #[test]
    fn forced_commit_failures_are_consumed() {
        let store = seeded(&[1]);
        store.fail_next_commits(1);

        let err = reserve(&store, IsolationLevel::ReadCommitted, 1, 1).unwrap_err();
        assert!(err.is_serialization_conflict());
        assert_eq!(store.confirmed_count(SeatId::new(1)), 0);

        // Injection consumed; the retry succeeds.
        reserve(&store, IsolationLevel::ReadCommitted, 1, 1).unwrap();
        assert_eq!(store.confirmed_count(SeatId::new(1)), 1);
    }

    #[test]
    fn row_lock_blocks_concurrent_transaction() {
        let store = seeded(&[1]);
        let seat = SeatId::new(1);

        let mut holder = store.begin(IsolationLevel::ReadCommitted).unwrap();
        holder.select_seat_for_update(seat).unwrap();

        let contender = {
            let store = store.clone();
            thread::spawn(move || {
                let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
                // Blocks until the holder commits.
                let allocated = txn.select_seat_for_update(seat).unwrap();
                txn.rollback();
                allocated
            })
        };

        // Give the contender time to block on the row lock.
        thread::sleep(Duration::from_millis(50));
        holder
            .insert_reservation(ActorId::new(1), seat)
            .unwrap();
        holder.mark_seat_allocated(seat).unwrap();
        holder.commit().unwrap();

        // The contender observes the committed flag once unblocked.
        assert!(contender.join().unwrap());
    }

    #[test]
    fn preallocate_is_idempotent() {
        let store = seeded(&[1]);
        assert!(store.preallocate(SeatId::new(1)));
        assert!(!store.preallocate(SeatId::new(1)));
        assert!(!store.preallocate(SeatId::new(9)));
        assert_eq!(store.confirmed_count(SeatId::new(1)), 1);
    }
}
