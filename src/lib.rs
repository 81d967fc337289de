//! flame-rs: One-Dimensional Reacting Flow Simulation Framework
//!
//! A framework for simulating one-dimensional chemically-reacting flows:
//! counterflow (axisymmetric stagnation) flames, freely-propagating premixed
//! flames, and two-phase spray flames, solved by a hybrid damped-Newton /
//! pseudo-transient method with adaptive grid refinement.
//!
//! # Architecture
//!
//! flame-rs is built on two core principles:
//!
//! 1. **Separation of physics and numerics**
//!    - Domains define the residual equations (what to solve)
//!    - The solver drives the coupled system to F(x) = 0 (how to solve)
//!
//! 2. **External property providers**
//!    - Thermodynamics, kinetics, and transport are consumed through
//!      adapter traits; the core never computes a property itself
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use std::cell::RefCell;
//! use flame_rs::models::{FlowDomain, FlowKind, Inlet};
//! use flame_rs::physics::Grid;
//! use flame_rs::solver::Simulation;
//!
//! // 1. Build the domain chain (left inlet, flow, right inlet)
//! let gas = Rc::new(RefCell::new(my_gas));
//! let flow = FlowDomain::new(
//!     FlowKind::AxiStagnation,
//!     gas.clone(), kin.clone(), trans.clone(),
//!     Grid::uniform(0.0, 0.02, 21),
//! );
//! let mut fuel = Inlet::new(n_species, 0.0);
//! fuel.set_mdot(0.5);
//! let mut oxidizer = Inlet::new(n_species, 0.02);
//! oxidizer.set_mdot(0.5);
//!
//! // 2. Assemble and configure
//! let mut sim = Simulation::new(vec![
//!     Box::new(fuel), Box::new(flow), Box::new(oxidizer),
//! ])?;
//! sim.set_time_step(1e-5, &[10, 20, 40])?;
//! sim.set_refine_criteria(None, 10.0, 0.8, 0.8, -0.1)?;
//!
//! // 3. Solve with adaptive refinement and inspect
//! sim.solve(1, true)?;
//! sim.save("flame.json", "baseline", "converged case", 1)?;
//! ```
//!
//! # Modules
//!
//! - [`physics`]: grids, the domain abstraction, property-adapter traits
//! - [`models`]: flow, spray, and boundary domains
//! - [`solver`]: assembly, banded Jacobian, damped Newton, refinement,
//!   continuation, the [`Simulation`](solver::Simulation) driver
//! - [`output`]: save/restore and CSV export
//! - [`error`]: the [`SimError`](error::SimError) kinds

// Core modules
pub mod error;
pub mod models;
pub mod output;
pub mod physics;
pub mod solver;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use flame_rs::prelude::*;
    //! ```
    pub use crate::error::{SimError, SimResult};
    pub use crate::models::{FlowDomain, FlowKind, Inlet, Outlet, SprayFlame, Surface, Symmetry};
    pub use crate::physics::{
        Domain, DomainKind, Grid, KineticsAdapter, Shared, ThermoAdapter, TransportAdapter,
    };
    pub use crate::solver::Simulation;
}
