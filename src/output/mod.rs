//! Output module for simulation state
//!
//! Two concerns, deliberately separate:
//! - **Persistence** ([`save`]): exact machine-precision save/restore of the
//!   solution, grids, and domain metadata in a hierarchical JSON format.
//!   This is the format solves are checkpointed and resumed from.
//! - **Export** ([`export`]): lossy-by-design CSV profiles for external
//!   analysis and plotting tools.
//!
//! Both surfaces are methods on [`Simulation`](crate::solver::Simulation);
//! this module holds the file-format types and the implementations.

pub mod export;
pub mod save;

pub use save::{ComponentColumn, DomainGroup, SolutionFile, SolutionGroup};
