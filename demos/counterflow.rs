//! Counterflow mixing-layer demo
//!
//! Solves an isothermal counterflow of diluted fuel against diluted
//! oxidizer with constant-property adapters, refines the grid, and writes
//! the profiles to `counterflow.csv`. Run with:
//!
//! ```text
//! cargo run --example counterflow
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::Array2;

use flame_rs::models::{FlowDomain, FlowKind, Inlet};
use flame_rs::physics::{
    Domain, Grid, KineticsAdapter, ThermoAdapter, TransportAdapter, GAS_CONSTANT,
};
use flame_rs::solver::Simulation;

// =================================================================================================
// Constant-property adapters
// =================================================================================================

/// Three-species ideal gas (FUEL / OX / N2) with constant c_p
struct DemoGas {
    wt: [f64; 3],
    t: f64,
    p: f64,
    y: [f64; 3],
}

impl ThermoAdapter for DemoGas {
    fn n_species(&self) -> usize {
        3
    }
    fn set_state(&mut self, t: f64, p: f64, y: &[f64]) {
        self.t = t;
        self.p = p;
        self.y = [y[0], y[1], y[2]];
    }
    fn density(&self) -> f64 {
        self.p * self.mean_molecular_weight() / (GAS_CONSTANT * self.t)
    }
    fn mean_molecular_weight(&self) -> f64 {
        let inv: f64 = self.y.iter().zip(&self.wt).map(|(y, w)| y.max(0.0) / w).sum();
        1.0 / inv.max(1e-300)
    }
    fn cp_mass(&self) -> f64 {
        1200.0
    }
    fn enthalpy_rt_ref(&self, h_rt: &mut [f64]) {
        h_rt.fill(0.0);
    }
    fn molecular_weight(&self, k: usize) -> f64 {
        self.wt[k]
    }
    fn species_name(&self, k: usize) -> String {
        ["FUEL", "OX", "N2"][k].to_string()
    }
    fn species_index(&self, name: &str) -> Option<usize> {
        ["FUEL", "OX", "N2"].iter().position(|n| *n == name)
    }
    fn temperature(&self) -> f64 {
        self.t
    }
}

struct Frozen;

impl KineticsAdapter for Frozen {
    fn net_production_rates(&self, wdot: &mut [f64]) {
        wdot.fill(0.0);
    }
}

struct DemoTransport;

impl TransportAdapter for DemoTransport {
    fn viscosity(&self) -> f64 {
        1.8e-5
    }
    fn thermal_conductivity(&self) -> f64 {
        0.026
    }
    fn mix_diff_coeffs(&self, d: &mut [f64]) {
        d.fill(2.0e-5);
    }
    fn thermal_diff_coeffs(&self, dt: &mut [f64]) {
        dt.fill(0.0);
    }
    fn multi_diff_coeffs(&self, d: &mut Array2<f64>) {
        d.fill(0.0);
        for k in 0..d.nrows() {
            d[(k, k)] = 2.0e-5;
        }
    }
}

// =================================================================================================
// Demo
// =================================================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let gas = Rc::new(RefCell::new(DemoGas {
        wt: [16.0, 32.0, 28.0],
        t: 300.0,
        p: 101_325.0,
        y: [0.0, 0.0, 1.0],
    }));
    let y_f = [0.2, 0.0, 0.8];
    let y_o = [0.0, 0.23, 0.77];
    let rho_f = {
        let mut g = gas.borrow_mut();
        g.set_state(300.0, 101_325.0, &y_f);
        g.density()
    };
    let rho_o = {
        let mut g = gas.borrow_mut();
        g.set_state(300.0, 101_325.0, &y_o);
        g.density()
    };

    let gas_dyn: Rc<RefCell<dyn ThermoAdapter>> = gas;
    let kin: Rc<RefCell<dyn KineticsAdapter>> = Rc::new(RefCell::new(Frozen));
    let trans: Rc<RefCell<dyn TransportAdapter>> = Rc::new(RefCell::new(DemoTransport));

    let width = 0.02;
    let u_in = 0.3;
    let flow =
        FlowDomain::new(FlowKind::AxiStagnation, gas_dyn, kin, trans, Grid::uniform(0.0, width, 15));

    let mut fuel = Inlet::new(3, 0.0);
    fuel.set_mdot(rho_f * u_in);
    fuel.set_temperature(300.0);
    fuel.set_mass_fractions(&y_f)?;

    let mut oxidizer = Inlet::new(3, width);
    oxidizer.set_mdot(rho_o * u_in);
    oxidizer.set_temperature(300.0);
    oxidizer.set_mass_fractions(&y_o)?;

    let mut sim = Simulation::new(vec![Box::new(fuel), Box::new(flow), Box::new(oxidizer)])?;
    sim.set_time_step(1e-5, &[10, 20, 40])?;
    sim.set_refine_criteria(None, 10.0, 0.5, 0.7, -0.1)?;
    sim.set_max_grid_points(None, 100)?;

    // initial guess: opposed streams and a strain bump
    let cu = sim.domain(1).component_index("u").unwrap();
    let cv = sim.domain(1).component_index("V").unwrap();
    sim.set_profile(1, cu, &[0.0, 1.0], &[u_in, -u_in])?;
    sim.set_profile(1, cv, &[0.0, 0.5, 1.0], &[0.0, 0.5 * u_in / width, 0.0])?;
    sim.set_initial_guess("T", &[0.0, 1.0], &[300.0, 300.0])?;
    for (k, name) in ["FUEL", "OX", "N2"].iter().enumerate() {
        sim.set_initial_guess(name, &[0.0, 1.0], &[y_f[k], y_o[k]])?;
    }

    sim.solve(1, true)?;

    let np = sim.domain(1).n_points();
    println!("converged on {} grid points", np);
    println!(
        "stagnation-plane fuel fraction: {:.4}",
        sim.value(1, sim.domain(1).component_index("FUEL").unwrap(), np / 2)?
    );

    sim.export_profiles_csv(1, "counterflow.csv")?;
    sim.save("counterflow.json", "demo", "isothermal counterflow mixing layer", 1)?;
    println!("wrote counterflow.csv and counterflow.json");
    Ok(())
}
