//! Error types for the simulator.

use std::io;
use thiserror::Error;

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur while setting up or running a trial.
///
/// Note that individual actor failures are not errors: they are
/// [`TerminalOutcome`](crate::TerminalOutcome) data. These variants cover
/// misconfiguration and defects only.
#[derive(Debug, Error)]
pub enum SimError {
    /// The trial configuration is invalid.
    #[error("invalid trial configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// An actor thread could not be spawned.
    #[error("failed to spawn actor thread: {0}")]
    Spawn(#[from] io::Error),

    /// Fewer terminal outcomes arrived than actors were started.
    ///
    /// An actor crashing outside the attempt taxonomy is a programming
    /// defect, not a modeled condition.
    #[error("collected {received} outcomes for {expected} actors")]
    ActorLost {
        /// Number of actors started.
        expected: usize,
        /// Number of outcomes received.
        received: usize,
    },
}

impl SimError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
