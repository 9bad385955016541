//! Core type definitions for the seat store.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a seat.
///
/// Seats are pre-existing resources; the store never creates or destroys
/// them during a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SeatId(pub u32);

impl SeatId {
    /// Creates a new seat ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat:{}", self.0)
    }
}

/// Unique identifier for an actor (one concurrent reservation attempt
/// sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ActorId(pub u32);

impl ActorId {
    /// Creates a new actor ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

/// Transaction isolation level supported by the store.
///
/// The level governs what a transaction observes of concurrently committed
/// state and which conflicts the store detects:
///
/// - [`ReadCommitted`](Self::ReadCommitted) - reads see the latest committed
///   state; double allocation is prevented only by the row lock and the
///   ledger uniqueness constraint.
/// - [`RepeatableRead`](Self::RepeatableRead) - the transaction's view is
///   pinned to its begin snapshot; a locked read of a row modified after the
///   snapshot fails with a serialization conflict.
/// - [`Serializable`](Self::Serializable) - full conflict detection; any
///   overlapping concurrent transaction may force an abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IsolationLevel {
    /// Reads observe the committed state of completed transactions.
    ReadCommitted,
    /// Reads observe a snapshot fixed at transaction begin.
    RepeatableRead,
    /// Full serializability; overlapping transactions conflict.
    Serializable,
}

impl IsolationLevel {
    /// Returns the SQL-style label for this level.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }

    /// Returns true if reads are pinned to the transaction's begin snapshot.
    ///
    /// Snapshot-pinned levels fail a locked read with a serialization
    /// conflict when the row was modified after the snapshot was taken.
    #[must_use]
    pub const fn uses_snapshot(self) -> bool {
        matches!(self, Self::RepeatableRead | Self::Serializable)
    }

    /// All supported levels, weakest first.
    pub const ALL: [Self; 3] = [Self::ReadCommitted, Self::RepeatableRead, Self::Serializable];
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Error returned when parsing an unrecognized isolation level.
#[derive(Debug, Clone, Error)]
#[error("unrecognized isolation level: {0:?}")]
pub struct ParseIsolationLevelError(String);

impl FromStr for IsolationLevel {
    type Err = ParseIsolationLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept "READ COMMITTED", "read-committed", "Repeatable_Read", ...
        let normalized = s.trim().to_ascii_uppercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "READ COMMITTED" => Ok(Self::ReadCommitted),
            "REPEATABLE READ" => Ok(Self::RepeatableRead),
            "SERIALIZABLE" => Ok(Self::Serializable),
            _ => Err(ParseIsolationLevelError(s.to_string())),
        }
    }
}

/// A confirmed allocation in the reservation ledger.
///
/// Records are append-only and uniquely constrained on `seat`: at most one
/// confirmed record per seat can ever be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationRecord {
    /// The actor that won the seat.
    pub actor: ActorId,
    /// The reserved seat.
    pub seat: SeatId,
    /// Reservation status; always `"confirmed"` for committed records.
    pub status: &'static str,
    /// Commit sequence at which the record became durable.
    pub sequence: u64,
}

impl ReservationRecord {
    /// Creates a confirmed reservation record.
    #[must_use]
    pub const fn confirmed(actor: ActorId, seat: SeatId, sequence: u64) -> Self {
        Self {
            actor,
            seat,
            status: "confirmed",
            sequence,
        }
    }
}
