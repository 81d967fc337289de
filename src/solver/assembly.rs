//! Multi-domain assembler
//!
//! Concatenates the domain chain's sub-vectors into one global solution,
//! maps global indices to (domain, component, local point), and composes
//! the residual: every domain fills its slice, then each boundary domain
//! overwrites the edge rows of its neighboring flow domain through the
//! [`BoundaryConnection`](crate::physics::BoundaryConnection) contract.
//!
//! # Index map
//!
//! The layout is point-major within each domain:
//!
//! ```text
//! global = start[d] + j · n_components(d) + c
//! ```
//!
//! The map is stable across an entire solve and is rebuilt only when a
//! domain resizes (grid refinement).
//!
//! # Hinted evaluation
//!
//! `eval(Some(pt), ..)` evaluates only the rows a perturbation at global
//! point `pt` can reach: each domain whose point range touches `pt ± 1`
//! evaluates its local 3-point stencil, everything else is skipped. The
//! caller pre-fills the residual buffer with the base residual, so skipped
//! rows keep their values — this is what makes the numerical Jacobian cost
//! one cheap re-evaluation per column instead of a full sweep.

use crate::error::{SimError, SimResult};
use crate::physics::{Domain, DomainKind, Side};

// =================================================================================================
// MultiDomain
// =================================================================================================

/// The assembled left-to-right chain of domains
pub struct MultiDomain {
    domains: Vec<Box<dyn Domain>>,
    /// First global solution slot of each domain
    start: Vec<usize>,
    /// First global point number of each domain
    start_pt: Vec<usize>,
    size: usize,
    n_points_total: usize,
    half_bw: usize,
    lb: Vec<f64>,
    ub: Vec<f64>,
}

impl MultiDomain {
    /// Assembles a domain chain; domains are given in left-to-right order
    pub fn new(domains: Vec<Box<dyn Domain>>) -> SimResult<Self> {
        if domains.is_empty() {
            return Err(SimError::InvalidInput("need at least one domain".into()));
        }
        let mut sys = Self {
            domains,
            start: Vec::new(),
            start_pt: Vec::new(),
            size: 0,
            n_points_total: 0,
            half_bw: 1,
            lb: Vec::new(),
            ub: Vec::new(),
        };
        sys.rebuild();
        Ok(sys)
    }

    /// Recomputes the index map, bandwidth, and bound vectors; called after
    /// construction and after any domain resize
    pub fn rebuild(&mut self) {
        self.start.clear();
        self.start_pt.clear();
        let mut slot = 0;
        let mut pt = 0;
        let mut bw = 1;
        for d in &self.domains {
            self.start.push(slot);
            self.start_pt.push(pt);
            slot += d.n_components() * d.n_points();
            pt += d.n_points();
            if d.n_components() > 0 {
                bw = bw.max(2 * d.n_components() - 1);
            }
        }
        self.size = slot;
        self.n_points_total = pt;
        self.half_bw = bw;

        self.lb = vec![0.0; self.size];
        self.ub = vec![0.0; self.size];
        for (d, dom) in self.domains.iter().enumerate() {
            let nc = dom.n_components();
            for j in 0..dom.n_points() {
                for c in 0..nc {
                    let i = self.start[d] + j * nc + c;
                    let (lo, hi) = dom.bounds(c);
                    self.lb[i] = lo;
                    self.ub[i] = hi;
                }
            }
        }
    }

    // ======================================== Accessors =========================================

    /// Total number of unknowns
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of grid points across all domains
    pub fn n_points_total(&self) -> usize {
        self.n_points_total
    }

    /// Jacobian half-bandwidth
    pub fn half_bandwidth(&self) -> usize {
        self.half_bw
    }

    /// Number of domains in the chain
    pub fn n_domains(&self) -> usize {
        self.domains.len()
    }

    /// Shared access to domain `d`
    pub fn domain(&self, d: usize) -> &dyn Domain {
        self.domains[d].as_ref()
    }

    /// Mutable access to domain `d`
    pub fn domain_mut(&mut self, d: usize) -> &mut dyn Domain {
        self.domains[d].as_mut()
    }

    /// First global slot of domain `d`
    pub fn start_of(&self, d: usize) -> usize {
        self.start[d]
    }

    /// First global point number of domain `d`
    pub fn first_point_of(&self, d: usize) -> usize {
        self.start_pt[d]
    }

    /// Global index of (domain, component, local point)
    #[inline]
    pub fn index(&self, dom: usize, comp: usize, point: usize) -> usize {
        self.start[dom] + point * self.domains[dom].n_components() + comp
    }

    /// Range-checked version of [`index`](Self::index) for API boundaries
    pub fn index_checked(&self, dom: usize, comp: usize, point: usize) -> SimResult<usize> {
        if dom >= self.domains.len() {
            return Err(SimError::InvalidInput(format!("no domain {}", dom)));
        }
        let d = &self.domains[dom];
        if comp >= d.n_components() || point >= d.n_points() {
            return Err(SimError::InvalidInput(format!(
                "(domain {}, component {}, point {}) out of range ({} components, {} points)",
                dom,
                comp,
                point,
                d.n_components(),
                d.n_points()
            )));
        }
        Ok(self.index(dom, comp, point))
    }

    /// Maps a global index back to (domain, component, local point)
    pub fn loc(&self, global: usize) -> (usize, usize, usize) {
        debug_assert!(global < self.size);
        // the chain is short; a linear scan beats bookkeeping
        let mut d = self.domains.len() - 1;
        for i in 0..self.domains.len() {
            if global < self.start[i] {
                d = i - 1;
                break;
            }
            if i == self.domains.len() - 1 {
                d = i;
            }
        }
        let nc = self.domains[d].n_components();
        let off = global - self.start[d];
        (d, off % nc, off / nc)
    }

    /// Global point number of (domain, local point)
    #[inline]
    pub fn global_point(&self, dom: usize, point: usize) -> usize {
        self.start_pt[dom] + point
    }

    /// The cached per-unknown lower bounds
    pub fn lower_bounds(&self) -> &[f64] {
        &self.lb
    }

    /// The cached per-unknown upper bounds
    pub fn upper_bounds(&self) -> &[f64] {
        &self.ub
    }

    // ===================================== Solution setup =======================================

    /// Writes every domain's initial solution estimate into `x`
    pub fn initial_solution(&self, x: &mut Vec<f64>) {
        x.clear();
        x.resize(self.size, 0.0);
        for (d, dom) in self.domains.iter().enumerate() {
            let lo = self.start[d];
            let hi = lo + dom.n_components() * dom.n_points();
            dom.initial_solution(&mut x[lo..hi]);
        }
    }

    /// Stores `x` as the previous iterate in every domain (backward Euler)
    pub fn store_prev(&mut self, x: &[f64]) {
        for d in 0..self.domains.len() {
            let lo = self.start[d];
            let hi = lo + self.domains[d].n_components() * self.domains[d].n_points();
            self.domains[d].store_prev(&x[lo..hi]);
        }
    }

    /// Calls `finalize` on every domain with its converged sub-vector
    pub fn finalize(&mut self, x: &[f64]) {
        for d in 0..self.domains.len() {
            let lo = self.start[d];
            let hi = lo + self.domains[d].n_components() * self.domains[d].n_points();
            self.domains[d].finalize(&x[lo..hi]);
        }
    }

    /// Clamps physically impossible values in every domain's slice
    pub fn reset_bad_values(&mut self, x: &mut [f64]) {
        for d in 0..self.domains.len() {
            let lo = self.start[d];
            let hi = lo + self.domains[d].n_components() * self.domains[d].n_points();
            self.domains[d].reset_bad_values(&mut x[lo..hi]);
        }
    }

    /// Fills `out` with the error weights rtol·|x| + atol used by the
    /// weighted step norm
    pub fn error_weights(&self, x: &[f64], transient: bool, out: &mut [f64]) {
        for (d, dom) in self.domains.iter().enumerate() {
            let (rtol, atol) = dom.tolerances(transient);
            let lo = self.start[d];
            let hi = lo + dom.n_components() * dom.n_points();
            for i in lo..hi {
                out[i] = rtol * x[i].abs() + atol;
            }
        }
    }

    // =================================== Residual evaluation ====================================

    /// Evaluates the global residual F(x, rdt) into `rsd`
    ///
    /// With `pt_hint = Some(pt)` only rows within the 3-point stencil of
    /// global point `pt` are recomputed; `rsd` must then hold the base
    /// residual on entry.
    pub fn eval(&mut self, pt_hint: Option<usize>, x: &[f64], rsd: &mut [f64], rdt: f64) {
        debug_assert_eq!(x.len(), self.size);
        debug_assert_eq!(rsd.len(), self.size);

        // Step 1 — every domain fills (the hinted part of) its slice
        for d in 0..self.domains.len() {
            let np = self.domains[d].n_points();
            let fp = self.start_pt[d];
            let local = match pt_hint {
                None => None,
                Some(pt) => {
                    if pt + 1 < fp || pt > fp + np {
                        continue;
                    }
                    Some(pt.saturating_sub(fp).min(np - 1))
                }
            };
            let lo = self.start[d];
            let hi = lo + self.domains[d].n_components() * np;
            self.domains[d].eval(local, &x[lo..hi], &mut rsd[lo..hi], rdt);
        }

        // Step 2 — boundary domains overwrite their neighbor's edge rows
        for i in 0..self.domains.len().saturating_sub(1) {
            let (left, right) = (&self.domains[i], &self.domains[i + 1]);
            if left.as_boundary().is_some() && right.kind().is_flow() {
                self.apply_boundary(i, i + 1, Side::Left, x, rsd);
            } else if left.kind().is_flow() && right.as_boundary().is_some() {
                self.apply_boundary(i + 1, i, Side::Right, x, rsd);
            }
        }
    }

    /// Applies one boundary's edge rows to the flow domain `f`
    fn apply_boundary(&self, b: usize, f: usize, side: Side, x: &[f64], rsd: &mut [f64]) {
        let flow = &self.domains[f];
        let nc = flow.n_components();
        let lo = self.start[f];
        let hi = lo + nc * flow.n_points();
        let edge = match flow.edge_state(&x[lo..hi], side) {
            Some(e) => e,
            None => return,
        };
        let boundary = self.domains[b].as_boundary().expect("checked by caller");
        let edge_point = match side {
            Side::Left => 0,
            Side::Right => flow.n_points() - 1,
        };
        for row in boundary.edge_rows(&edge) {
            debug_assert!(row.comp < nc);
            rsd[lo + edge_point * nc + row.comp] = row.value;
        }
    }

    /// Finds the first domain of the given kind
    pub fn find_kind(&self, kind: DomainKind) -> Option<usize> {
        self.domains.iter().position(|d| d.kind() == kind)
    }

    /// Finds the first flow domain in the chain
    pub fn find_flow(&self) -> Option<usize> {
        self.domains.iter().position(|d| d.kind().is_flow())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{DomainKind, Grid};
    use std::any::Any;

    /// One-component toy domain: residual is x_j - target at every point
    struct Pinned {
        grid: Grid,
        target: f64,
    }

    impl Domain for Pinned {
        fn kind(&self) -> DomainKind {
            DomainKind::AxiStagnation
        }
        fn n_components(&self) -> usize {
            1
        }
        fn n_points(&self) -> usize {
            self.grid.n_points()
        }
        fn component_name(&self, _c: usize) -> String {
            "phi".to_string()
        }
        fn component_index(&self, name: &str) -> Option<usize> {
            (name == "phi").then_some(0)
        }
        fn bounds(&self, _c: usize) -> (f64, f64) {
            (-10.0, 10.0)
        }
        fn tolerances(&self, _transient: bool) -> (f64, f64) {
            (1e-4, 1e-9)
        }
        fn grid(&self) -> &Grid {
            &self.grid
        }
        fn resize(&mut self, z: &[f64]) {
            self.grid.replace(z.to_vec());
        }
        fn initial_solution(&self, x: &mut [f64]) {
            x.fill(self.target);
        }
        fn eval(&mut self, jpt: Option<usize>, x: &[f64], rsd: &mut [f64], _rdt: f64) {
            let np = self.grid.n_points();
            let (j0, j1) = match jpt {
                None => (0, np - 1),
                Some(j) => (j.saturating_sub(1), (j + 1).min(np - 1)),
            };
            for j in j0..=j1 {
                rsd[j] = x[j] - self.target;
            }
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn chain() -> MultiDomain {
        MultiDomain::new(vec![
            Box::new(Pinned { grid: Grid::uniform(0.0, 1.0, 4), target: 2.0 }),
            Box::new(Pinned { grid: Grid::uniform(1.0, 2.0, 3), target: -1.0 }),
        ])
        .unwrap()
    }

    #[test]
    fn test_index_map() {
        let sys = chain();
        assert_eq!(sys.size(), 7);
        assert_eq!(sys.n_points_total(), 7);
        assert_eq!(sys.index(0, 0, 3), 3);
        assert_eq!(sys.index(1, 0, 0), 4);
        assert_eq!(sys.loc(5), (1, 0, 1));
        assert_eq!(sys.loc(0), (0, 0, 0));
    }

    #[test]
    fn test_index_checked_rejects_out_of_range() {
        let sys = chain();
        assert!(sys.index_checked(0, 0, 3).is_ok());
        assert!(sys.index_checked(0, 1, 0).is_err());
        assert!(sys.index_checked(0, 0, 4).is_err());
        assert!(sys.index_checked(2, 0, 0).is_err());
    }

    #[test]
    fn test_full_and_hinted_eval_agree() {
        let mut sys = chain();
        let x: Vec<f64> = (0..7).map(|i| i as f64 * 0.5).collect();

        let mut base = vec![0.0; 7];
        sys.eval(None, &x, &mut base, 0.0);

        // a hinted eval starting from the base must reproduce it exactly
        for pt in 0..7 {
            let mut r = base.clone();
            sys.eval(Some(pt), &x, &mut r, 0.0);
            assert_eq!(r, base, "hint at point {}", pt);
        }
    }

    #[test]
    fn test_bounds_cached() {
        let sys = chain();
        assert_eq!(sys.lower_bounds().len(), 7);
        assert!(sys.lower_bounds().iter().all(|&b| b == -10.0));
        assert!(sys.upper_bounds().iter().all(|&b| b == 10.0));
    }

    #[test]
    fn test_initial_solution_fills_all_slices() {
        let sys = chain();
        let mut x = Vec::new();
        sys.initial_solution(&mut x);
        assert_eq!(x, vec![2.0, 2.0, 2.0, 2.0, -1.0, -1.0, -1.0]);
    }
}
