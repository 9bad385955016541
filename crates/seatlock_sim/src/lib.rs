//! # Seatlock Simulator
//!
//! The contention-resolution protocol: many concurrent actors race to
//! reserve scarce seats through a transactional store, and the outcome is
//! reduced to comparable statistics per isolation level.
//!
//! This crate provides:
//! - [`ReservationAttempt`] - one bounded lock-check-allocate-commit
//!   transaction, classified into an [`AttemptOutcome`]
//! - [`RetryController`] - bounded retry with linear backoff, masking
//!   transient conflicts and always resolving to a [`TerminalOutcome`]
//! - [`ContentionSimulator`] - runs N actors concurrently against a seat
//!   pool and collects exactly N outcomes
//! - [`TrialSummary`] - success/failure counts and mean latency for one
//!   (isolation level, actor count) trial
//!
//! ## Key Invariants
//!
//! - At most one confirmed reservation per seat, at every isolation level
//! - Every actor resolves to exactly one terminal outcome; errors never
//!   propagate out of the retry loop
//! - No actor performs more than the configured number of attempts
//! - Measured latency spans the first attempt through final resolution,
//!   backoff included

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attempt;
mod error;
mod retry;
mod simulator;
mod summary;

pub use attempt::{AttemptOutcome, AttemptRunner, ReservationAttempt};
pub use error::{SimError, SimResult};
pub use retry::{RetryController, RetryPolicy, TerminalOutcome};
pub use simulator::{ContentionSimulator, TrialConfig, TrialReport};
pub use summary::TrialSummary;
