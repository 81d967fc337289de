//! Performance benchmarks for the residual and Jacobian kernels

use std::cell::RefCell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

use flame_rs::models::{FlowDomain, FlowKind, Inlet};
use flame_rs::physics::{
    Domain, Grid, KineticsAdapter, ThermoAdapter, TransportAdapter, GAS_CONSTANT,
};
use flame_rs::solver::Simulation;

// =================================================================================================
// Constant-property gas for benchmarking
// =================================================================================================

/// Eight-species ideal gas with constant c_p and constant transport,
/// sized like a small skeletal mechanism
struct BenchGas {
    wt: Vec<f64>,
    t: f64,
    p: f64,
    y: Vec<f64>,
}

impl BenchGas {
    fn new(nsp: usize) -> Self {
        Self {
            wt: (0..nsp).map(|k| 16.0 + 4.0 * k as f64).collect(),
            t: 300.0,
            p: 101_325.0,
            y: {
                let mut y = vec![0.0; nsp];
                y[nsp - 1] = 1.0;
                y
            },
        }
    }
}

impl ThermoAdapter for BenchGas {
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
        format!("S{}", k)
    }
    fn species_index(&self, name: &str) -> Option<usize> {
        name.strip_prefix('S').and_then(|s| s.parse().ok()).filter(|&k: &usize| k < self.wt.len())
    }
    fn temperature(&self) -> f64 {
        self.t
    }
}

struct BenchKinetics;

impl KineticsAdapter for BenchKinetics {
    fn net_production_rates(&self, wdot: &mut [f64]) {
        wdot.fill(0.0);
    }
}

struct BenchTransport;

impl TransportAdapter for BenchTransport {
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
// Scenario setup
// =================================================================================================

fn counterflow(np: usize, nsp: usize) -> Simulation {
    let gas: Rc<RefCell<dyn ThermoAdapter>> = Rc::new(RefCell::new(BenchGas::new(nsp)));
    let kin: Rc<RefCell<dyn KineticsAdapter>> = Rc::new(RefCell::new(BenchKinetics));
    let trans: Rc<RefCell<dyn TransportAdapter>> = Rc::new(RefCell::new(BenchTransport));

    let width = 0.02;
    let flow =
        FlowDomain::new(FlowKind::AxiStagnation, gas, kin, trans, Grid::uniform(0.0, width, np));

    let mut left = Inlet::new(nsp, 0.0);
    left.set_mdot(0.3);
    let mut right = Inlet::new(nsp, width);
    right.set_mdot(0.3);

    let mut sim =
        Simulation::new(vec![Box::new(left), Box::new(flow), Box::new(right)]).unwrap();
    let cu = sim.domain(1).component_index("u").unwrap();
    sim.set_profile(1, cu, &[0.0, 1.0], &[0.3, -0.3]).unwrap();
    sim
}

// =================================================================================================
// Benchmark functions
// =================================================================================================

/// Full residual sweep at increasing grid sizes
fn bench_residual_eval(c: &mut Criterion) {
    let mut group = c.benchmark_group("residual_eval");
    for np in [25, 50, 100, 200] {
        let mut sim = counterflow(np, 8);
        let mut resid = vec![0.0; sim.system_size()];
        group.bench_with_input(BenchmarkId::from_parameter(np), &np, |b, _| {
            b.iter(|| {
                sim.get_residual(black_box(0.0), &mut resid).unwrap();
                black_box(resid[0])
            })
        });
    }
    group.finish();
}

/// Finite-difference Jacobian assembly and banded factorization
fn bench_jacobian_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian_build");
    group.sample_size(20);
    for np in [25, 50, 100] {
        let mut sim = counterflow(np, 8);
        group.bench_with_input(BenchmarkId::from_parameter(np), &np, |b, _| {
            b.iter(|| {
                sim.eval_ss_jacobian().unwrap();
                black_box(sim.jacobian(0, 0).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_residual_eval, bench_jacobian_build);
criterion_main!(benches);
