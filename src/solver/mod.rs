//! Numerical machinery: assembly, Newton, time stepping, refinement
//!
//! This module turns the domain chain into one nonlinear system and drives
//! it to steady state.
//!
//! # Architecture
//!
//! - [`assembly::MultiDomain`]: global index map and residual composition
//! - [`band`]: banded matrix storage and LU factorization
//! - [`jacobian::Jacobian`]: finite-difference banded Jacobian + adjoint
//! - [`newton`]: damped Newton iteration with bound and residual damping
//! - [`refine`]: ratio/slope/curvature/prune grid adaptation
//! - [`sim::Simulation`]: the public driver — hybrid steady-Newton /
//!   pseudo-transient state machine, profile API, persistence hooks
//! - [`continuation`]: bound-projected strain-rate continuation surface
//!
//! # Control flow
//!
//! ```text
//! solve() ─► NEWTON ──success──► snapshot ──► REFINE ──no changes──► done
//!              │  ▲                              │
//!            stall │                          changes
//!              ▼  │ dt doubles                   ▼
//!            TSTEP ┘ (dt halves on failure,   resize + interpolate,
//!                     floor 1e-10)            rebuild index map
//! ```
//!
//! The solver is single-threaded by design: residual evaluation mutates
//! the shared thermodynamic state object. The optional `parallel` feature
//! confines rayon to the refiner's per-component analysis, which reads
//! disjoint plain-float data.

use std::sync::atomic::{AtomicUsize, Ordering};

// module declaration
pub mod assembly;
pub mod band;
pub mod continuation;
pub mod jacobian;
pub mod newton;
pub mod refine;
pub mod sim;

// Re-exports for convenience
pub use assembly::MultiDomain;
pub use band::{BandLU, BandMatrix};
pub use jacobian::Jacobian;
pub use newton::{newton_solve, NewtonOptions};
pub use refine::{RefineCriteria, RefinePlan, Refiner};
pub use sim::Simulation;

// =================================================================================================
// Parallel threshold
// =================================================================================================

/// Problem size (points × components) below which the refiner analysis
/// stays sequential even with the `parallel` feature enabled
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(2000);

/// Current parallelization threshold
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Adjusts the parallelization threshold (points × components)
pub fn set_parallel_threshold(n: usize) {
    PARALLEL_THRESHOLD.store(n, Ordering::Relaxed);
}
