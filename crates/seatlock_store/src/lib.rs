//! # Seatlock Store
//!
//! The transactional seat store that reservation attempts run against.
//!
//! This crate provides:
//! - The [`SeatStore`] / [`SeatTransaction`] traits - the contract every
//!   store implementation must honor (row locking, staged writes, a
//!   uniqueness constraint on the reservation ledger, and typed conflict
//!   signaling)
//! - [`MemorySeatStore`] - an in-process implementation with per-seat row
//!   locks and snapshot-based conflict detection
//! - The typed error taxonomy ([`StoreError`]) that lets callers classify
//!   failures without matching on error text

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;
mod types;

pub use error::{StoreError, StoreResult};
pub use memory::{MemorySeatStore, MemorySeatTransaction};
pub use store::{SeatStore, SeatTransaction};
pub use types::{ActorId, IsolationLevel, ParseIsolationLevelError, ReservationRecord, SeatId};
