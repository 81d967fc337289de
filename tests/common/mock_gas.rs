//! Mock property adapters for integration testing
//!
//! These implementations have simple closed-form behavior, making them
//! ideal for validating the solver machinery without dragging in a real
//! thermochemistry library:
//!
//! - [`MockGas`]: ideal-gas density, constant c_p, constant reference
//!   enthalpies per species
//! - [`FrozenKinetics`]: zero production rates (pure mixing)
//! - [`LinearKinetics`]: one irreversible first-order reaction A → B with
//!   a temperature-independent rate, so the coupled system stays mildly
//!   nonlinear and Newton-friendly
//! - [`ConstTransport`]: constant μ, k, and a single diffusion coefficient
//!   for every species

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::Array2;

use flame_rs::physics::{
    KineticsAdapter, ThermoAdapter, TransportAdapter, GAS_CONSTANT,
};

// =================================================================================================
// MockGas
// =================================================================================================

/// Ideal gas with constant specific heat and constant reference enthalpies
pub struct MockGas {
    names: Vec<String>,
    wt: Vec<f64>,
    cp: f64,
    /// Constant molar reference enthalpies h_k [J/kmol]
    h0: Vec<f64>,
    t: f64,
    p: f64,
    y: Vec<f64>,
}

impl MockGas {
    /// Creates a gas from (name, molecular weight [kg/kmol]) pairs
    pub fn new(species: &[(&str, f64)]) -> Self {
        Self {
            names: species.iter().map(|(n, _)| n.to_string()).collect(),
            wt: species.iter().map(|(_, w)| *w).collect(),
            cp: 1200.0,
            h0: vec![0.0; species.len()],
            t: 300.0,
            p: 101_325.0,
            y: {
                let mut y = vec![0.0; species.len()];
                y[0] = 1.0;
                y
            },
        }
    }

    /// Sets constant molar reference enthalpies [J/kmol]
    pub fn with_enthalpies(mut self, h0: &[f64]) -> Self {
        assert_eq!(h0.len(), self.wt.len());
        self.h0 = h0.to_vec();
        self
    }

    /// Sets the (constant) mixture specific heat [J/(kg·K)]
    pub fn with_cp(mut self, cp: f64) -> Self {
        self.cp = cp;
        self
    }

    /// Ideal-gas density at an arbitrary state, for test expectations
    pub fn density_at(&self, t: f64, p: f64, y: &[f64]) -> f64 {
        let mut inv_wbar = 0.0;
        for (k, yk) in y.iter().enumerate() {
            inv_wbar += yk / self.wt[k];
        }
        p / (GAS_CONSTANT * t * inv_wbar)
    }
}

impl ThermoAdapter for MockGas {
    fn n_species(&self) -> usize {
        self.wt.len()
    }

    fn set_state(&mut self, t: f64, p: f64, y: &[f64]) {
        self.t = t;
        self.p = p;
        self.y.copy_from_slice(y);
    }

    fn density(&self) -> f64 {
        self.p * self.mean_molecular_weight() / (GAS_CONSTANT * self.t)
    }

    fn mean_molecular_weight(&self) -> f64 {
        let mut inv = 0.0;
        for (k, yk) in self.y.iter().enumerate() {
            inv += yk.max(0.0) / self.wt[k];
        }
        1.0 / inv.max(1e-300)
    }

    fn cp_mass(&self) -> f64 {
        self.cp
    }

    fn enthalpy_rt_ref(&self, h_rt: &mut [f64]) {
        for (k, h) in h_rt.iter_mut().enumerate() {
            *h = self.h0[k] / (GAS_CONSTANT * self.t);
        }
    }

    fn molecular_weight(&self, k: usize) -> f64 {
        self.wt[k]
    }

    fn species_name(&self, k: usize) -> String {
        self.names[k].clone()
    }

    fn species_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn temperature(&self) -> f64 {
        self.t
    }
}

// =================================================================================================
// Kinetics
// =================================================================================================

/// No chemistry at all: every production rate is zero
pub struct FrozenKinetics;

impl KineticsAdapter for FrozenKinetics {
    fn net_production_rates(&self, wdot: &mut [f64]) {
        wdot.fill(0.0);
    }
}

/// One irreversible first-order reaction: species `a` → species `b` at a
/// temperature-independent rate k [1/s]
///
/// ẇ_a = -k·ρ·Y_a/W_a, ẇ_b = +ẇ_a·(-1): mass is conserved exactly when the
/// two species share a molecular weight.
pub struct LinearKinetics {
    pub gas: Rc<RefCell<MockGas>>,
    pub a: usize,
    pub b: usize,
    pub rate: f64,
}

impl KineticsAdapter for LinearKinetics {
    fn net_production_rates(&self, wdot: &mut [f64]) {
        let gas = self.gas.borrow();
        wdot.fill(0.0);
        let rho = gas.density();
        let c_a = rho * gas.y[self.a].max(0.0) / gas.wt[self.a];
        wdot[self.a] = -self.rate * c_a;
        wdot[self.b] = self.rate * c_a;
    }
}

// =================================================================================================
// Transport
// =================================================================================================

/// Constant transport properties
pub struct ConstTransport {
    pub viscosity: f64,
    pub conductivity: f64,
    pub diffusivity: f64,
}

impl Default for ConstTransport {
    fn default() -> Self {
        Self { viscosity: 1.8e-5, conductivity: 0.026, diffusivity: 2.0e-5 }
    }
}

impl TransportAdapter for ConstTransport {
    fn viscosity(&self) -> f64 {
        self.viscosity
    }

    fn thermal_conductivity(&self) -> f64 {
        self.conductivity
    }

    fn mix_diff_coeffs(&self, d: &mut [f64]) {
        d.fill(self.diffusivity);
    }

    fn thermal_diff_coeffs(&self, dt: &mut [f64]) {
        dt.fill(0.0);
    }

    fn multi_diff_coeffs(&self, d: &mut Array2<f64>) {
        d.fill(0.0);
        for k in 0..d.nrows() {
            d[(k, k)] = self.diffusivity;
        }
    }
}
