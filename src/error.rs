//! Error types for the simulation framework
//!
//! # Design
//!
//! All fallible public operations return [`SimResult`]. The error kinds map
//! directly to the failure classes of the solver core:
//!
//! - [`SimError::Convergence`]: the hybrid Newton/time-stepping solver gave
//!   up (damped Newton stalled, the timestep floor was reached, or the
//!   refinement iteration cap was exceeded). The last valid solutions remain
//!   available through `restore_steady_solution` / `restore_time_stepping_solution`.
//! - [`SimError::InvalidInput`]: raised synchronously at API boundaries
//!   (unknown component name, index out of range, mismatched array lengths,
//!   unknown vapor-pressure unit, restore type mismatch). Never enters the
//!   solver loop.
//! - [`SimError::StateInconsistency`]: a domain produced NaN/Inf during
//!   residual evaluation and a reset of the offending values did not cure it.
//! - [`SimError::Io`] / [`SimError::Format`]: propagated from the
//!   persistence layer.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type SimResult<T> = Result<T, SimError>;

/// Error kinds raised by the simulation core
#[derive(Debug, Error)]
pub enum SimError {
    /// The nonlinear solve did not converge
    ///
    /// The solution vector is left in an undefined state; the snapshots taken
    /// after the last successful steady solve and the last successful time
    /// step are the documented recovery channel.
    #[error("convergence failure: {0}")]
    Convergence(String),

    /// A caller-supplied argument was rejected at the API boundary
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Residual evaluation produced non-finite values that could not be reset
    #[error("state inconsistency: {0}")]
    StateInconsistency(String),

    /// Underlying I/O failure from the persistence layer
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unreadable solution file
    #[error("solution file format error: {0}")]
    Format(#[from] serde_json::Error),
}

// =================================================================================================
// Tests
// =================================================================================================
