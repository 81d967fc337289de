//! Core physical abstractions
//!
//! This module provides the building blocks every concrete domain is made
//! of: the non-uniform [`Grid`], the [`Domain`] trait with its explicit
//! boundary-coupling contract, and the adapter traits through which the core
//! consumes thermodynamic, kinetic, and transport properties from external
//! providers.
//!
//! # Architecture
//!
//! The core never computes a property itself:
//! - [`ThermoAdapter`] answers ρ, W̄, c_p, h_k/(RT) for a given (T, P, Y)
//! - [`KineticsAdapter`] answers net species production rates
//! - [`TransportAdapter`] answers μ, k, D_k, D^T_k, D_{k,i}
//!
//! Concrete domains live in [`crate::models`]; the numerical machinery that
//! assembles and solves them lives in [`crate::solver`].

// module declaration
pub mod adapters;
pub mod grid;
pub mod traits;

// re-export commonly used types for convenience
pub use adapters::{KineticsAdapter, Shared, ThermoAdapter, TransportAdapter};
pub use grid::{linear_interp, Grid};
pub use traits::{
    BoundaryConnection, BoundaryResidual, Domain, DomainKind, EdgeState, LiquidEdgeState, Side,
};

// =================================================================================================
// Physical constants
// =================================================================================================

/// Universal gas constant [J/(kmol·K)]
pub const GAS_CONSTANT: f64 = 8314.462618;

/// One standard atmosphere [Pa]
pub const ONE_ATM: f64 = 101_325.0;

/// Stefan-Boltzmann constant [W/(m²·K⁴)]
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

/// Unit conversion: mmHg to Pa (Antoine vapor-pressure fits)
pub const MMHG_TO_PA: f64 = 133.322_365;

/// Unit conversion: bar to Pa (Antoine vapor-pressure fits)
pub const BAR_TO_PA: f64 = 1.0e5;

/// Square root of machine epsilon; sets the finite-difference Jacobian
/// perturbation scale
pub fn sqrt_eps() -> f64 {
    f64::EPSILON.sqrt()
}

/// Square root of the smallest positive double; the "effectively zero"
/// cutoff of the droplet closures (diameter, evaporation rate, Spalding
/// denominator)
pub fn tiny() -> f64 {
    f64::MIN_POSITIVE.sqrt()
}
