//! Pre-built simulation scenarios shared by the integration tests
//!
//! Every builder returns a ready-to-solve [`Simulation`] plus the shared
//! handle to its [`MockGas`], so tests can both run the solver and compute
//! expected values from the same equation of state.
//!
//! The chains are always (left boundary, flow, right boundary), so the
//! flow domain index is [`FLOW`].

use std::cell::RefCell;
use std::rc::Rc;

use flame_rs::models::{FlowDomain, FlowKind, Inlet, LiquidInlet, Outlet, SprayFlame};
use flame_rs::physics::{Domain, Grid, KineticsAdapter, ThermoAdapter, TransportAdapter};
use flame_rs::solver::Simulation;

use super::mock_gas::{ConstTransport, FrozenKinetics, LinearKinetics, MockGas};

/// Index of the flow domain in every scenario chain
pub const FLOW: usize = 1;

type SharedGas = Rc<RefCell<MockGas>>;

fn comp(sim: &Simulation, name: &str) -> usize {
    sim.domain(FLOW).component_index(name).unwrap_or_else(|| panic!("no component '{}'", name))
}

// =================================================================================================
// Counterflow (frozen chemistry)
// =================================================================================================

/// Methane-surrogate counterflow: FUEL/OX/N2 with frozen chemistry
///
/// Left inlet carries diluted fuel, right inlet diluted oxidizer, both at
/// 300 K and |u| = `u_in` over a 2 cm gap. The initial guess is a linear
/// axial velocity, a strain bump in V, and flat composition.
pub fn counterflow_sim(np: usize, u_in: f64) -> (Simulation, SharedGas) {
    let gas = Rc::new(RefCell::new(MockGas::new(&[
        ("FUEL", 16.0),
        ("OX", 32.0),
        ("N2", 28.0),
    ])));
    let gas_dyn: Rc<RefCell<dyn ThermoAdapter>> = gas.clone();
    let kin: Rc<RefCell<dyn KineticsAdapter>> = Rc::new(RefCell::new(FrozenKinetics));
    let trans: Rc<RefCell<dyn TransportAdapter>> = Rc::new(RefCell::new(ConstTransport::default()));

    let width = 0.02;
    let flow = FlowDomain::new(
        FlowKind::AxiStagnation,
        gas_dyn,
        kin,
        trans,
        Grid::uniform(0.0, width, np),
    );

    let y_f = [0.2, 0.0, 0.8];
    let y_o = [0.0, 0.23, 0.77];
    let rho_f = gas.borrow().density_at(300.0, 101_325.0, &y_f);
    let rho_o = gas.borrow().density_at(300.0, 101_325.0, &y_o);

    let mut fuel = Inlet::new(3, 0.0);
    fuel.set_mdot(rho_f * u_in);
    fuel.set_temperature(300.0);
    fuel.set_mass_fractions(&y_f).unwrap();

    let mut oxidizer = Inlet::new(3, width);
    oxidizer.set_mdot(rho_o * u_in);
    oxidizer.set_temperature(300.0);
    oxidizer.set_mass_fractions(&y_o).unwrap();

    let mut sim =
        Simulation::new(vec![Box::new(fuel), Box::new(flow), Box::new(oxidizer)]).unwrap();
    sim.set_time_step(1e-5, &[10, 20, 40]).unwrap();

    // initial guess: linear u, strain bump in V, flat scalars
    let cu = comp(&sim, "u");
    let cv = comp(&sim, "V");
    let ct = comp(&sim, "T");
    sim.set_profile(FLOW, cu, &[0.0, 1.0], &[u_in, -u_in]).unwrap();
    sim.set_profile(FLOW, cv, &[0.0, 0.5, 1.0], &[0.0, u_in / width * 0.5, 0.0]).unwrap();
    sim.set_flat_profile(FLOW, ct, 300.0).unwrap();
    for (k, name) in ["FUEL", "OX", "N2"].iter().enumerate() {
        let c = comp(&sim, name);
        sim.set_flat_profile(FLOW, c, 0.5 * (y_f[k] + y_o[k])).unwrap();
    }

    // continuation bookkeeping for the strain-rate tests
    sim.set_fuel_velocity(u_in);
    sim.set_oxidizer_velocity(u_in);
    sim.set_fuel_density(rho_f);
    sim.set_oxidizer_density(rho_o);
    sim.set_strain_rate_value(2.0 * u_in / width);
    sim.update_bounds();

    (sim, gas)
}

// =================================================================================================
// Free flame (linear one-step chemistry)
// =================================================================================================

/// Freely-propagating flame: FUEL → PROD with a first-order rate and a
/// heat release sized for T_ad ≈ 1800 K from T_u = 300 K
pub fn free_flame_sim(np: usize) -> (Simulation, SharedGas) {
    let gas = Rc::new(RefCell::new(
        MockGas::new(&[("FUEL", 16.0), ("PROD", 16.0), ("N2", 28.0)])
            // 2.88e8 J/kmol over W = 16 and cp = 1200 gives ΔT = 1500 K at
            // Y_FUEL = 0.1
            .with_enthalpies(&[2.88e8, 0.0, 0.0]),
    ));
    let gas_dyn: Rc<RefCell<dyn ThermoAdapter>> = gas.clone();
    let kin: Rc<RefCell<dyn KineticsAdapter>> =
        Rc::new(RefCell::new(LinearKinetics { gas: gas.clone(), a: 0, b: 1, rate: 5.0 }));
    let trans: Rc<RefCell<dyn TransportAdapter>> = Rc::new(RefCell::new(ConstTransport::default()));

    let width = 0.02;
    let flow =
        FlowDomain::new(FlowKind::FreeFlame, gas_dyn, kin, trans, Grid::uniform(0.0, width, np));

    let y_u = [0.1, 0.0, 0.9];
    let mut inlet = Inlet::new(3, 0.0);
    inlet.set_temperature(300.0);
    inlet.set_mass_fractions(&y_u).unwrap();
    inlet.set_mdot(gas.borrow().density_at(300.0, 101_325.0, &y_u) * 0.01);

    let outlet = Outlet::new(3, width);

    let mut sim =
        Simulation::new(vec![Box::new(inlet), Box::new(flow), Box::new(outlet)]).unwrap();
    sim.set_time_step(1e-5, &[10, 20, 40]).unwrap();

    // ramped initial guess: cold reactants, hot products
    let ct = comp(&sim, "T");
    let cu = comp(&sim, "u");
    sim.set_profile(FLOW, ct, &[0.0, 0.3, 0.6, 1.0], &[300.0, 400.0, 1700.0, 1800.0]).unwrap();
    sim.set_flat_profile(FLOW, cu, 0.01).unwrap();
    let cf = comp(&sim, "FUEL");
    let cp = comp(&sim, "PROD");
    let cn = comp(&sim, "N2");
    sim.set_profile(FLOW, cf, &[0.0, 0.3, 0.6, 1.0], &[0.1, 0.09, 0.005, 0.0]).unwrap();
    sim.set_profile(FLOW, cp, &[0.0, 0.3, 0.6, 1.0], &[0.0, 0.01, 0.095, 0.1]).unwrap();
    sim.set_flat_profile(FLOW, cn, 0.9).unwrap();

    (sim, gas)
}

// =================================================================================================
// Spray counterflow (evaporating droplets, fixed gas temperature)
// =================================================================================================

/// n-heptane-like spray in hot nitrogen: droplets enter from the left at
/// 300 K into 450 K gas with the energy equation held fixed
pub fn spray_sim(np: usize) -> (Simulation, SharedGas) {
    let gas = Rc::new(RefCell::new(MockGas::new(&[("FUEL", 100.0), ("N2", 28.0)])));
    let gas_dyn: Rc<RefCell<dyn ThermoAdapter>> = gas.clone();
    let kin: Rc<RefCell<dyn KineticsAdapter>> = Rc::new(RefCell::new(FrozenKinetics));
    let trans: Rc<RefCell<dyn TransportAdapter>> = Rc::new(RefCell::new(ConstTransport::default()));

    let width = 0.02;
    let mut spray = SprayFlame::new(gas_dyn, kin, trans, Grid::uniform(0.0, width, np));
    spray.update_fuel_species("FUEL").unwrap();
    // n-heptane fits: DIPPR-105 density, Antoine in mmHg with a reduced
    // reference temperature so the vapor pressure stays below ambient
    spray.set_liquid_density_param(61.38, 0.26211, 540.2, 0.28141);
    spray.set_liquid_vap_press_param(6.89385, 1264.37, 216.636, 340.0, "mmHg").unwrap();
    spray.set_liquid_cp(2200.0);
    spray.set_av_coefficients([1e-5; 5]);
    for j in 0..np {
        spray.gas_mut().set_temperature(j, 450.0);
    }

    let y_n2 = [0.0, 1.0];
    let rho = gas.borrow().density_at(450.0, 101_325.0, &y_n2);

    let mut left = Inlet::new(2, 0.0);
    left.set_mdot(rho * 0.05);
    left.set_temperature(450.0);
    left.set_mass_fractions(&y_n2).unwrap();
    left.set_liquid(LiquidInlet { ul: 0.0, vl: 0.5, tl: 300.0, ml: 1e-9, nl: 1e6 });

    let mut right = Inlet::new(2, width);
    right.set_mdot(rho * 0.05);
    right.set_temperature(450.0);
    right.set_mass_fractions(&y_n2).unwrap();

    let mut sim =
        Simulation::new(vec![Box::new(left), Box::new(spray), Box::new(right)]).unwrap();
    sim.set_time_step(1e-5, &[10, 20, 40]).unwrap();

    // gas initial guess
    let cu = comp(&sim, "u");
    let ct = comp(&sim, "T");
    sim.set_profile(FLOW, cu, &[0.0, 1.0], &[0.05, -0.05]).unwrap();
    sim.set_flat_profile(FLOW, ct, 450.0).unwrap();
    let cn = comp(&sim, "N2");
    sim.set_flat_profile(FLOW, cn, 1.0).unwrap();
    let cf = comp(&sim, "FUEL");
    sim.set_flat_profile(FLOW, cf, 0.0).unwrap();

    // liquid initial guess: droplets advecting in from the left
    let cvl = comp(&sim, "vl");
    let cml = comp(&sim, "ml");
    let cnl = comp(&sim, "nl");
    let ctl = comp(&sim, "Tl");
    sim.set_flat_profile(FLOW, cvl, 0.5).unwrap();
    sim.set_profile(FLOW, cml, &[0.0, 1.0], &[1e-9, 5e-10]).unwrap();
    sim.set_flat_profile(FLOW, cnl, 1e6).unwrap();
    sim.set_profile(FLOW, ctl, &[0.0, 1.0], &[300.0, 420.0]).unwrap();

    (sim, gas)
}
