//! Adapter traits for the external property providers
//!
//! The flow equations consume thermodynamic, kinetic, and transport
//! properties but do not compute them: equations of state, reaction
//! mechanisms, and transport models are external collaborators. These traits
//! define exactly the surface the core needs; any provider (a full
//! thermochemistry library, tabulated data, or the constant-property mocks
//! used in the test suite) can be plugged in.
//!
//! # Statefulness
//!
//! A [`ThermoAdapter`] carries a hidden current state: `set_state(T, P, Y)`
//! mutates it, and every subsequent property call refers to that state.
//! [`KineticsAdapter`] and [`TransportAdapter`] implementations are expected
//! to read the state of the thermo object they were built around. This
//! mirrors how thermochemistry libraries actually behave and is the reason
//! the core is single-threaded: one state, one evaluator.
//!
//! Domains hold shared handles (`Rc<RefCell<..>>`) to the adapters; the
//! adapters must outlive the domains that borrow them.

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::Array2;

/// Shared single-threaded handle to an adapter
pub type Shared<T> = Rc<RefCell<T>>;

// =================================================================================================
// ThermoAdapter
// =================================================================================================

/// Equation-of-state surface consumed by the flow equations
///
/// All quantities are in SI units with kmol as the mole unit: densities in
/// kg/m³, molecular weights in kg/kmol, specific heats in J/(kg·K).
pub trait ThermoAdapter {
    /// Number of species carried by the phase
    fn n_species(&self) -> usize;

    /// Sets the current state from temperature [K], pressure [Pa], and mass
    /// fractions (length `n_species`)
    fn set_state(&mut self, t: f64, p: f64, y: &[f64]);

    /// Mass density ρ [kg/m³] at the current state
    fn density(&self) -> f64;

    /// Mean molecular weight W̄ [kg/kmol] at the current state
    fn mean_molecular_weight(&self) -> f64;

    /// Mixture specific heat c_p [J/(kg·K)] at the current state
    fn cp_mass(&self) -> f64;

    /// Non-dimensional reference enthalpies h_k/(R·T), written into `h_rt`
    fn enthalpy_rt_ref(&self, h_rt: &mut [f64]);

    /// Molecular weight of species `k` [kg/kmol]
    fn molecular_weight(&self, k: usize) -> f64;

    /// Name of species `k`
    fn species_name(&self, k: usize) -> String;

    /// Index of the species with the given name, if present
    fn species_index(&self, name: &str) -> Option<usize>;

    /// Current temperature [K] (the last value passed to `set_state`)
    fn temperature(&self) -> f64;
}

// =================================================================================================
// KineticsAdapter
// =================================================================================================

/// Chemical source-term surface
///
/// Implementations read the current state of the thermo object they wrap.
pub trait KineticsAdapter {
    /// Net molar production rates ẇ_k [kmol/(m³·s)], written into `wdot`
    /// (length `n_species`)
    fn net_production_rates(&self, wdot: &mut [f64]);
}

// =================================================================================================
// TransportAdapter
// =================================================================================================

/// Transport-property surface
///
/// Implementations read the current state of the thermo object they wrap.
/// The mixture-averaged coefficients are the default; the multicomponent
/// matrix and the thermal-diffusion (Soret) coefficients are only queried
/// when the corresponding flow options are enabled.
pub trait TransportAdapter {
    /// Dynamic viscosity μ [Pa·s]
    fn viscosity(&self) -> f64;

    /// Thermal conductivity k [W/(m·K)]
    fn thermal_conductivity(&self) -> f64;

    /// Mixture-averaged diffusion coefficients D_k [m²/s], written into `d`
    fn mix_diff_coeffs(&self, d: &mut [f64]);

    /// Thermal diffusion (Soret) coefficients D^T_k [kg/(m·s)], written into `dt`
    fn thermal_diff_coeffs(&self, dt: &mut [f64]);

    /// Multicomponent diffusion coefficient matrix D_{k,i} [m²/s]
    ///
    /// `d` has shape (n_species, n_species).
    fn multi_diff_coeffs(&self, d: &mut Array2<f64>);
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::GAS_CONSTANT;

    /// Minimal two-species ideal gas used to exercise the trait surface
    struct TwoSpecies {
        t: f64,
        p: f64,
        y: [f64; 2],
    }

    impl ThermoAdapter for TwoSpecies {
        fn n_species(&self) -> usize {
            2
        }
        fn set_state(&mut self, t: f64, p: f64, y: &[f64]) {
            self.t = t;
            self.p = p;
            self.y = [y[0], y[1]];
        }
        fn density(&self) -> f64 {
            self.p * self.mean_molecular_weight() / (GAS_CONSTANT * self.t)
        }
        fn mean_molecular_weight(&self) -> f64 {
            1.0 / (self.y[0] / 2.0 + self.y[1] / 28.0)
        }
        fn cp_mass(&self) -> f64 {
            1200.0
        }
        fn enthalpy_rt_ref(&self, h_rt: &mut [f64]) {
            h_rt.fill(0.0);
        }
        fn molecular_weight(&self, k: usize) -> f64 {
            [2.0, 28.0][k]
        }
        fn species_name(&self, k: usize) -> String {
            ["H2", "N2"][k].to_string()
        }
        fn species_index(&self, name: &str) -> Option<usize> {
            ["H2", "N2"].iter().position(|n| *n == name)
        }
        fn temperature(&self) -> f64 {
            self.t
        }
    }

    #[test]
    fn test_ideal_gas_density_tracks_state() {
        let mut gas = TwoSpecies { t: 300.0, p: 101325.0, y: [0.0, 1.0] };
        gas.set_state(300.0, 101325.0, &[0.0, 1.0]);
        let rho0 = gas.density();

        gas.set_state(600.0, 101325.0, &[0.0, 1.0]);
        let rho1 = gas.density();

        // doubling T at constant P halves the density
        assert!((rho0 / rho1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_species_lookup() {
        let gas = TwoSpecies { t: 300.0, p: 101325.0, y: [0.5, 0.5] };
        assert_eq!(gas.species_index("N2"), Some(1));
        assert_eq!(gas.species_index("AR"), None);
        assert_eq!(gas.species_name(0), "H2");
    }
}
