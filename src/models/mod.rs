//! Concrete domains for one-dimensional reacting flows
//!
//! All domains implement the [`Domain`](crate::physics::Domain) trait. The
//! assembler calls `eval` on each one — domains are responsible for the
//! physics (their residual equations), the solver for driving the coupled
//! system to F(x) = 0.
//!
//! # Available domains
//!
//! ## [`FlowDomain`] — gas-phase similarity flow
//!
//! The workhorse: upwinded convection, central diffusion, optional
//! radiation and Soret fluxes, per-point energy-equation switching. Two
//! subvariants via [`FlowKind`]:
//! - **Axisymmetric stagnation**: counterflow configuration, continuity
//!   integrated with a trapezoid rule, Λ carried as a constant eigenvalue.
//! - **Free flame**: freely propagating premixed front; the mass flux is an
//!   eigenvalue pinned by a fixed-temperature anchor.
//!
//! ## [`SprayFlame`] — two-phase counterflow
//!
//! Adds five liquid droplet components with Antoine/DIPPR evaporation
//! closures, Stokes drag, and artificial viscosity on the hyperbolic liquid
//! equations.
//!
//! ## Boundary domains
//!
//! [`Inlet`], [`Outlet`], [`Symmetry`], and [`Surface`] occupy the chain
//! ends and impose conditions on their neighboring flow domain's edge rows
//! through the explicit [`BoundaryConnection`](crate::physics::BoundaryConnection)
//! contract.

// =================================================================================================
// Module Declarations
// =================================================================================================

pub mod boundary;
pub mod flow;
pub mod spray;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use boundary::{Inlet, LiquidInlet, Outlet, Surface, Symmetry};
pub use flow::{FlowDomain, FlowKind, OFFSET_L, OFFSET_T, OFFSET_U, OFFSET_V, OFFSET_Y};
pub use spray::{SprayFlame, N_LIQUID};
