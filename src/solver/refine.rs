//! Adaptive grid refinement
//!
//! # Criteria
//!
//! Four knobs, each a fraction of the per-component range (a value ≥ 1
//! disables the criterion):
//!
//! - **ratio**: adjacent cell widths may differ by at most this factor;
//!   a violation inserts a midpoint into the larger interval.
//! - **slope**: an interval where a component jumps by more than
//!   `slope · (max - min)` gets a midpoint.
//! - **curve**: a point where the discrete derivative jumps by more than
//!   `curve · (max|φ'| - min|φ'|)` gets midpoints in both adjacent
//!   intervals.
//! - **prune**: a point whose adjacent jumps stay below `prune` times the
//!   slope threshold in *every* component, and which no other criterion
//!   needs, is removed. Non-positive values disable pruning.
//!
//! Components whose total variation is below 1% of their magnitude are
//! skipped — a flat profile should not pin the mesh.
//!
//! # Limits
//!
//! Insertions respect a minimum spacing (`grid_min`) and a maximum point
//! count (`max_points`); hitting the cap is logged, not fatal. New points
//! always land at interval midpoints and component values are linearly
//! interpolated, so an immediately repeated analysis of the same solution
//! proposes nothing new for the ratio and slope criteria.

use std::collections::BTreeSet;

use log::warn;

use crate::physics::Domain;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// =================================================================================================
// Criteria
// =================================================================================================

/// Refinement criteria for one domain
#[derive(Debug, Clone, Copy)]
pub struct RefineCriteria {
    /// Maximum spacing ratio between adjacent cells
    pub ratio: f64,
    /// Slope threshold as a fraction of the component range
    pub slope: f64,
    /// Curvature threshold as a fraction of the derivative range
    pub curve: f64,
    /// Prune threshold as a fraction of the slope threshold (≤ 0 disables)
    pub prune: f64,
}

impl Default for RefineCriteria {
    fn default() -> Self {
        Self { ratio: 10.0, slope: 0.8, curve: 0.8, prune: -0.1 }
    }
}

/// Per-domain refiner: criteria plus hard limits
#[derive(Debug, Clone)]
pub struct Refiner {
    pub criteria: RefineCriteria,
    /// Maximum number of grid points in the domain
    pub max_points: usize,
    /// Minimum allowed grid spacing [m]
    pub grid_min: f64,
}

impl Default for Refiner {
    fn default() -> Self {
        Self { criteria: RefineCriteria::default(), max_points: 1000, grid_min: 1e-10 }
    }
}

/// Proposed grid changes: intervals to bisect and points to drop
#[derive(Debug, Clone, Default)]
pub struct RefinePlan {
    /// Interval indices receiving a midpoint
    pub insert: Vec<usize>,
    /// Point indices to remove
    pub remove: Vec<usize>,
}

impl RefinePlan {
    /// Total number of proposed changes; zero means the mesh is converged
    pub fn n_changes(&self) -> usize {
        self.insert.len() + self.remove.len()
    }
}

// =================================================================================================
// Analysis
// =================================================================================================

/// Per-component analysis result: intervals to refine and points the
/// component needs kept
struct ComponentVote {
    insert: BTreeSet<usize>,
    needed: Vec<bool>,
}

/// Analyzes one component profile against the criteria
fn analyze_component(v: &[f64], z: &[f64], c: &RefineCriteria) -> ComponentVote {
    let np = v.len();
    let mut vote = ComponentVote { insert: BTreeSet::new(), needed: vec![false; np] };

    let vmax = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let vmin = v.iter().cloned().fold(f64::INFINITY, f64::min);
    let range = vmax - vmin;
    let magnitude = vmax.abs().max(vmin.abs());

    // flat profiles do not drive the mesh
    if range <= 0.01 * magnitude || range == 0.0 {
        return vote;
    }

    // ── Slope criterion ───────────────────────────────────────────────────────
    let thr_s = c.slope * range;
    let dv: Vec<f64> = (0..np - 1).map(|j| v[j + 1] - v[j]).collect();
    for j in 0..np - 1 {
        if c.slope < 1.0 && dv[j].abs() > thr_s {
            vote.insert.insert(j);
            vote.needed[j] = true;
            vote.needed[j + 1] = true;
        }
        if c.prune > 0.0 && dv[j].abs() >= c.prune * thr_s {
            vote.needed[j] = true;
            vote.needed[j + 1] = true;
        }
    }

    // ── Curvature criterion ───────────────────────────────────────────────────
    //
    // The range is taken over |dφ/dz|: a peaked profile whose derivative
    // changes sign still refines around the extremum.
    if c.curve < 1.0 && np >= 3 {
        let s: Vec<f64> = (0..np - 1).map(|j| dv[j] / (z[j + 1] - z[j])).collect();
        let smax = s.iter().map(|v| v.abs()).fold(f64::NEG_INFINITY, f64::max);
        let smin = s.iter().map(|v| v.abs()).fold(f64::INFINITY, f64::min);
        let thr_c = c.curve * (smax - smin);
        if thr_c > 0.0 {
            for j in 1..np - 1 {
                if (s[j] - s[j - 1]).abs() > thr_c {
                    vote.insert.insert(j - 1);
                    vote.insert.insert(j);
                    vote.needed[j - 1] = true;
                    vote.needed[j] = true;
                    vote.needed[j + 1] = true;
                }
            }
        }
    }

    vote
}

impl Refiner {
    /// Proposes grid changes for one domain given its solution sub-vector
    pub fn analyze(&self, dom: &dyn Domain, x: &[f64]) -> RefinePlan {
        let np = dom.n_points();
        let nc = dom.n_components();
        if np < 3 || nc == 0 {
            return RefinePlan::default();
        }
        let c = &self.criteria;
        let z: Vec<f64> = dom.grid().points().to_vec();

        let mut insert: BTreeSet<usize> = BTreeSet::new();
        let mut keep = vec![false; np];
        // endpoints and their neighbors are never pruned
        keep[0] = true;
        keep[1] = true;
        keep[np - 2] = true;
        keep[np - 1] = true;

        // ── Ratio criterion on the spacing itself ─────────────────────────────
        for j in 1..np - 1 {
            let dz0 = z[j] - z[j - 1];
            let dz1 = z[j + 1] - z[j];
            if dz1 > c.ratio * dz0 {
                insert.insert(j);
                keep[j - 1] = true;
                keep[j] = true;
                keep[j + 1] = true;
            }
            if dz0 > c.ratio * dz1 {
                insert.insert(j - 1);
                keep[j - 1] = true;
                keep[j] = true;
                keep[j + 1] = true;
            }
        }

        // ── Per-component slope and curvature analysis ────────────────────────
        //
        // Component profiles are extracted up front so the analysis kernel
        // only touches plain slices; above the size threshold the per-
        // component work runs on rayon (`parallel` feature).
        let profiles: Vec<Vec<f64>> = (0..nc)
            .filter(|&comp| dom.refine_active(comp))
            .map(|comp| (0..np).map(|j| x[j * nc + comp]).collect())
            .collect();

        let votes: Vec<ComponentVote> = {
            #[cfg(feature = "parallel")]
            {
                if np * nc > crate::solver::parallel_threshold() {
                    profiles.par_iter().map(|v| analyze_component(v, &z, c)).collect()
                } else {
                    profiles.iter().map(|v| analyze_component(v, &z, c)).collect()
                }
            }
            #[cfg(not(feature = "parallel"))]
            {
                profiles.iter().map(|v| analyze_component(v, &z, c)).collect()
            }
        };

        let mut needed = vec![false; np];
        for vote in &votes {
            for &j in &vote.insert {
                insert.insert(j);
            }
            for j in 0..np {
                needed[j] |= vote.needed[j];
            }
        }

        // ── Enforce the minimum spacing ───────────────────────────────────────
        let insert: Vec<usize> = insert
            .into_iter()
            .filter(|&j| 0.5 * (z[j + 1] - z[j]) >= self.grid_min)
            .collect();

        // ── Enforce the point cap ─────────────────────────────────────────────
        let budget = self.max_points.saturating_sub(np);
        let insert = if insert.len() > budget {
            warn!(
                "grid refinement capped: {} insertions proposed, {} allowed by max_points = {}",
                insert.len(),
                budget,
                self.max_points
            );
            insert.into_iter().take(budget).collect::<Vec<_>>()
        } else {
            insert
        };

        // ── Prune pass ────────────────────────────────────────────────────────
        //
        // A point goes only if no component needs it, no criterion marked
        // it, no midpoint lands next to it, and its left neighbor survives
        // (never remove adjacent points in one pass).
        let mut remove = Vec::new();
        if c.prune > 0.0 {
            let mut last_removed = usize::MAX;
            for j in 2..np - 2 {
                let near_insert = insert.iter().any(|&i| i == j || i + 1 == j);
                if !needed[j]
                    && !keep[j]
                    && !near_insert
                    && (last_removed == usize::MAX || last_removed + 1 < j)
                {
                    remove.push(j);
                    last_removed = j;
                }
            }
        }

        RefinePlan { insert, remove }
    }
}

// =================================================================================================
// Grid application
// =================================================================================================

/// Builds the refined grid and linearly re-interpolated solution
///
/// Returns `(new_z, new_x)` for a point-major sub-vector with `nc`
/// components. Midpoint values are the average of their parents; removed
/// points simply drop out.
pub fn apply_plan(z: &[f64], x: &[f64], nc: usize, plan: &RefinePlan) -> (Vec<f64>, Vec<f64>) {
    let np = z.len();
    let mut newz = Vec::with_capacity(np + plan.insert.len());
    let mut newx = Vec::with_capacity((np + plan.insert.len()) * nc);

    for j in 0..np {
        if !plan.remove.contains(&j) {
            newz.push(z[j]);
            newx.extend_from_slice(&x[j * nc..(j + 1) * nc]);
        }
        if j + 1 < np && plan.insert.contains(&j) {
            newz.push(0.5 * (z[j] + z[j + 1]));
            for comp in 0..nc {
                newx.push(0.5 * (x[j * nc + comp] + x[(j + 1) * nc + comp]));
            }
        }
    }
    (newz, newx)
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{DomainKind, Grid};
    use std::any::Any;

    struct Profile {
        grid: Grid,
        values: Vec<f64>,
    }

    impl Domain for Profile {
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
            "phi".into()
        }
        fn component_index(&self, name: &str) -> Option<usize> {
            (name == "phi").then_some(0)
        }
        fn bounds(&self, _c: usize) -> (f64, f64) {
            (-1e20, 1e20)
        }
        fn refine_active(&self, _c: usize) -> bool {
            true
        }
        fn tolerances(&self, _t: bool) -> (f64, f64) {
            (1e-4, 1e-9)
        }
        fn grid(&self) -> &Grid {
            &self.grid
        }
        fn resize(&mut self, z: &[f64]) {
            self.grid.replace(z.to_vec());
        }
        fn initial_solution(&self, x: &mut [f64]) {
            x.copy_from_slice(&self.values);
        }
        fn eval(&mut self, _j: Option<usize>, _x: &[f64], _r: &mut [f64], _rdt: f64) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn refiner(ratio: f64, slope: f64, curve: f64, prune: f64) -> Refiner {
        Refiner {
            criteria: RefineCriteria { ratio, slope, curve, prune },
            max_points: 100,
            grid_min: 1e-12,
        }
    }

    #[test]
    fn test_slope_criterion_fires_on_step() {
        // step profile: one large jump in interval 2
        let dom = Profile {
            grid: Grid::uniform(0.0, 5.0, 6),
            values: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        };
        let plan = refiner(100.0, 0.5, 1.0, -0.1).analyze(&dom, &dom.values.clone());
        assert_eq!(plan.insert, vec![2]);
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn test_flat_profile_is_ignored() {
        let dom = Profile { grid: Grid::uniform(0.0, 5.0, 6), values: vec![7.0; 6] };
        let plan = refiner(100.0, 0.1, 0.1, -0.1).analyze(&dom, &dom.values.clone());
        assert_eq!(plan.n_changes(), 0);
    }

    #[test]
    fn test_ratio_criterion_fires_on_stretched_grid() {
        let dom = Profile {
            grid: Grid::new(vec![0.0, 0.1, 0.2, 1.0, 1.1]).unwrap(),
            values: vec![0.0, 1.0, 2.0, 3.0, 4.0],
        };
        // interval 2 (width 0.8) is 8x its neighbor (0.1)
        let plan = refiner(3.0, 1.0, 1.0, -0.1).analyze(&dom, &dom.values.clone());
        assert!(plan.insert.contains(&2));
    }

    #[test]
    fn test_slope_refinement_is_idempotent() {
        let grid = Grid::uniform(0.0, 9.0, 10);
        let values: Vec<f64> =
            (0..10).map(|j| (2.0 * std::f64::consts::PI * j as f64 / 9.0).sin()).collect();
        let dom = Profile { grid: grid.clone(), values: values.clone() };
        let r = refiner(100.0, 0.3, 1.0, -0.1);

        let plan = r.analyze(&dom, &values);
        assert!(plan.n_changes() > 0);

        let (newz, newx) = apply_plan(grid.points(), &values, 1, &plan);
        let dom2 = Profile { grid: Grid::new(newz).unwrap(), values: newx.clone() };
        let plan2 = r.analyze(&dom2, &newx);
        assert_eq!(plan2.n_changes(), 0, "second pass proposed {:?}", plan2);
    }

    #[test]
    fn test_prune_removes_flat_region_point() {
        // linear ramp then long flat tail; the tail's interior points carry
        // no information
        let dom = Profile {
            grid: Grid::uniform(0.0, 8.0, 9),
            values: vec![0.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
        };
        let plan = refiner(100.0, 1.0, 1.0, 0.05).analyze(&dom, &dom.values.clone());
        assert!(!plan.remove.is_empty());
        // endpoints and their neighbors survive
        assert!(!plan.remove.contains(&0));
        assert!(!plan.remove.contains(&1));
        assert!(!plan.remove.contains(&7));
        assert!(!plan.remove.contains(&8));
        // no two adjacent points are removed in one pass
        for w in plan.remove.windows(2) {
            assert!(w[1] > w[0] + 1);
        }
    }

    #[test]
    fn test_max_points_caps_insertions() {
        let dom = Profile {
            grid: Grid::uniform(0.0, 5.0, 6),
            values: vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        };
        let mut r = refiner(100.0, 0.2, 1.0, -0.1);
        r.max_points = 7;
        let plan = r.analyze(&dom, &dom.values.clone());
        assert!(plan.insert.len() <= 1);
    }

    #[test]
    fn test_apply_plan_midpoints_and_removals() {
        let z = [0.0, 1.0, 2.0, 3.0];
        let x = [0.0, 10.0, 20.0, 30.0];
        let plan = RefinePlan { insert: vec![0], remove: vec![2] };
        let (nz, nx) = apply_plan(&z, &x, 1, &plan);
        assert_eq!(nz, vec![0.0, 0.5, 1.0, 3.0]);
        assert_eq!(nx, vec![0.0, 5.0, 10.0, 30.0]);
    }
}
