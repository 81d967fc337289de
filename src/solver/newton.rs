//! Damped Newton iteration
//!
//! # Algorithm
//!
//! Solves F(x, rdt) = 0 by Newton's method with two safety nets:
//!
//! 1. **Bound damping**: the undamped step s = -J⁻¹F is first shortened by
//!    the largest factor that keeps every unknown inside its domain-supplied
//!    bounds (temperatures stay positive, mass fractions near [0, 1],
//!    droplet masses non-negative).
//! 2. **Residual damping**: the step is then halved until the *next* Newton
//!    step taken from the trial point would be shorter than the current one
//!    (in the weighted norm), or already inside the convergence basin.
//!    Judging progress by the size of the next step rather than by |F|
//!    makes the test affine-invariant — a row scaled by 10⁶ cannot fake
//!    progress.
//!
//! The weighted RMS norm uses per-domain (rtol, atol) error weights:
//!
//! ```text
//! ‖s‖ = sqrt( (1/N) Σ_i ( s_i / (rtol·|x_i| + atol) )² )
//! ```
//!
//! so ‖s‖ < 1 means "the step is below the requested tolerance everywhere"
//! and is the convergence criterion.
//!
//! The damping factor halves on non-decrease down to a floor of 1/256;
//! stalling with a fresh Jacobian is a hard failure, stalling with an aged
//! one triggers a rebuild and one retry. Non-finite residuals get one
//! `reset_bad_values` retry before degrading to a failure.

use log::{debug, warn};

use crate::error::{SimError, SimResult};
use crate::solver::assembly::MultiDomain;
use crate::solver::jacobian::Jacobian;

// =================================================================================================
// Options
// =================================================================================================

/// Tuning knobs for the damped Newton iteration
#[derive(Debug, Clone)]
pub struct NewtonOptions {
    /// Maximum accepted (damped) steps per solve call
    pub max_steps: usize,
    /// Damping floor; stalling below this declares failure
    pub min_damp: f64,
    /// Accepted steps before the Jacobian is rebuilt
    pub max_jac_age: usize,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self { max_steps: 60, min_damp: 1.0 / 256.0, max_jac_age: 5 }
    }
}

// =================================================================================================
// Damped Newton driver
// =================================================================================================

/// Weighted RMS norm of `step` with weights from the current `x`
pub fn weighted_step_norm(
    sys: &MultiDomain,
    x: &[f64],
    step: &[f64],
    transient: bool,
    ewt: &mut [f64],
) -> f64 {
    sys.error_weights(x, transient, ewt);
    let mut sum = 0.0;
    for i in 0..x.len() {
        let r = step[i] / ewt[i];
        sum += r * r;
    }
    (sum / x.len() as f64).sqrt()
}

/// Largest factor in (0, 1] keeping `x + f·step` inside the bounds
fn bound_factor(x: &[f64], step: &[f64], lb: &[f64], ub: &[f64]) -> f64 {
    let mut fb: f64 = 1.0;
    for i in 0..x.len() {
        let xn = x[i] + step[i];
        if xn > ub[i] && step[i] > 0.0 {
            fb = fb.min((ub[i] - x[i]) / step[i]);
        } else if xn < lb[i] && step[i] < 0.0 {
            fb = fb.min((lb[i] - x[i]) / step[i]);
        }
    }
    fb.max(0.0)
}

/// Evaluates F(x, rdt), retrying once through `reset_bad_values` when the
/// residual comes back non-finite
fn eval_checked(
    sys: &mut MultiDomain,
    x: &mut [f64],
    f: &mut [f64],
    rdt: f64,
) -> SimResult<()> {
    sys.eval(None, x, f, rdt);
    if f.iter().all(|v| v.is_finite()) {
        return Ok(());
    }
    warn!("non-finite residual detected; resetting bad solution values and retrying");
    sys.reset_bad_values(x);
    sys.eval(None, x, f, rdt);
    if f.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SimError::StateInconsistency(
            "residual still non-finite after resetting bad values".into(),
        ))
    }
}

/// Runs damped Newton on F(x, rdt) = 0, updating `x` in place
///
/// `rdt = 0` solves the steady problem; a positive `rdt` solves one
/// backward-Euler stage against the previously stored iterate.
pub fn newton_solve(
    sys: &mut MultiDomain,
    jac: &mut Jacobian,
    x: &mut [f64],
    rdt: f64,
    opts: &NewtonOptions,
    loglevel: u8,
) -> SimResult<()> {
    let n = sys.size();
    let transient = rdt > 0.0;

    let mut f = vec![0.0; n];
    let mut step = vec![0.0; n];
    let mut x1 = vec![0.0; n];
    let mut f1 = vec![0.0; n];
    let mut step1 = vec![0.0; n];
    let mut ewt = vec![0.0; n];

    eval_checked(sys, x, &mut f, rdt)?;

    for iter in 0..opts.max_steps {
        if !jac.ready() || jac.age() >= opts.max_jac_age || jac.rdt() != rdt {
            jac.build(sys, x, &f, rdt)?;
        }

        // undamped Newton step
        step.copy_from_slice(&f);
        step.iter_mut().for_each(|v| *v = -*v);
        jac.solve(&mut step)?;

        let fbound = bound_factor(x, &step, sys.lower_bounds(), sys.upper_bounds());
        if fbound < 1e-10 {
            // pinned against a bound: a stale Jacobian gets one more chance
            if jac.age() > 0 {
                jac.invalidate();
                continue;
            }
            return Err(SimError::Convergence(
                "Newton step pinned against solution bounds".into(),
            ));
        }

        let s0 = weighted_step_norm(sys, x, &step, transient, &mut ewt);

        // ── Damping loop ──────────────────────────────────────────────────────
        //
        // The floor is relative to the bound-limited starting factor: an
        // iterate pressed against a bound still gets its 8 halvings before
        // the step is declared a stall.
        let mut alpha = fbound.min(1.0);
        let floor = alpha * opts.min_damp;
        let mut accepted = false;
        while alpha >= floor {
            for i in 0..n {
                x1[i] = x[i] + alpha * step[i];
            }
            match eval_checked(sys, &mut x1, &mut f1, rdt) {
                Ok(()) => {}
                Err(SimError::StateInconsistency(_)) => {
                    // treat a poisoned trial point like a rejected step
                    alpha *= 0.5;
                    continue;
                }
                Err(e) => return Err(e),
            }

            // size of the Newton step the trial point would take next
            step1.copy_from_slice(&f1);
            step1.iter_mut().for_each(|v| *v = -*v);
            jac.solve(&mut step1)?;
            let s1 = weighted_step_norm(sys, &x1, &step1, transient, &mut ewt);

            if s1 < 1.0 || s1 < s0 {
                x.copy_from_slice(&x1);
                f.copy_from_slice(&f1);
                jac.bump_age();
                if loglevel > 1 {
                    debug!(
                        "newton step {}: alpha = {:.3e}, |s0| = {:.3e}, |s1| = {:.3e}",
                        iter, alpha, s0, s1
                    );
                }
                if s1 < 1.0 {
                    if loglevel > 0 {
                        debug!("newton converged after {} steps (|s| = {:.3e})", iter + 1, s1);
                    }
                    return Ok(());
                }
                accepted = true;
                break;
            }
            alpha *= 0.5;
        }

        if !accepted {
            if jac.age() > 0 {
                // the model may have drifted away from the factorization
                jac.invalidate();
                continue;
            }
            return Err(SimError::Convergence(format!(
                "damped Newton stalled at damping {:.3e} (weighted step {:.3e})",
                alpha.max(opts.min_damp * 0.5),
                s0
            )));
        }
    }

    Err(SimError::Convergence(format!(
        "no convergence in {} damped Newton steps",
        opts.max_steps
    )))
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Domain, DomainKind, Grid};
    use std::any::Any;

    /// One-component nonlinear toy: residual φ² - a = 0 at every point,
    /// root φ = sqrt(a)
    struct Quadratic {
        grid: Grid,
        a: f64,
    }

    impl Domain for Quadratic {
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
            (0.0, 1e3)
        }
        fn tolerances(&self, _transient: bool) -> (f64, f64) {
            (1e-10, 1e-12)
        }
        fn grid(&self) -> &Grid {
            &self.grid
        }
        fn resize(&mut self, z: &[f64]) {
            self.grid.replace(z.to_vec());
        }
        fn initial_solution(&self, x: &mut [f64]) {
            x.fill(3.0);
        }
        fn eval(&mut self, jpt: Option<usize>, x: &[f64], rsd: &mut [f64], _rdt: f64) {
            let np = self.grid.n_points();
            let (j0, j1) = match jpt {
                None => (0, np - 1),
                Some(j) => (j.saturating_sub(1), (j + 1).min(np - 1)),
            };
            for j in j0..=j1 {
                rsd[j] = x[j] * x[j] - self.a;
            }
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_newton_finds_quadratic_root() {
        let mut sys = MultiDomain::new(vec![Box::new(Quadratic {
            grid: Grid::uniform(0.0, 1.0, 5),
            a: 4.0,
        })])
        .unwrap();
        let mut x = Vec::new();
        sys.initial_solution(&mut x);

        let mut jac = Jacobian::new();
        newton_solve(&mut sys, &mut jac, &mut x, 0.0, &NewtonOptions::default(), 0).unwrap();

        for v in &x {
            assert!((v - 2.0).abs() < 1e-8, "root = {}", v);
        }
    }

    #[test]
    fn test_bound_factor_clips_at_bounds() {
        let x = [1.0, 5.0];
        let step = [2.0, -10.0];
        let lb = [0.0, 0.0];
        let ub = [2.0, 10.0];
        // first entry would land at 3 > 2: factor (2-1)/2 = 0.5
        // second would land at -5 < 0: factor (0-5)/(-10) = 0.5
        let f = bound_factor(&x, &step, &lb, &ub);
        assert!((f - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_bound_factor_is_one_inside() {
        let f = bound_factor(&[1.0], &[0.5], &[0.0], &[2.0]);
        assert_eq!(f, 1.0);
    }
}
