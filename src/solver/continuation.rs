//! Bound-projected strain-rate continuation
//!
//! # Physical background
//!
//! Counterflow extinction studies sweep the strain rate χ (the velocity
//! gradient imposed by the opposed jets) and follow the solution branch
//! through its turning point. An external continuation package drives the
//! sweep; this module supplies the two residue functions it calls and the
//! bookkeeping that keeps the flow field consistent with χ.
//!
//! # Augmented solution
//!
//! The continuation unknown lives in the **last slot** of an augmented
//! vector of length N + 1: slots 0..N are the ordinary solution, slot N is
//! χ. The bound vectors have the same length, with `lb[N] = 0` and
//! `ub[N] = 10¹⁰`.
//!
//! # Amplification
//!
//! When the requested χ differs from the stored one by more than the
//! threshold τ, the whole velocity field (u, V), the stored inlet
//! velocities, and the boundary mass fluxes ṁ = ρ_in·u_in are scaled by
//! χ_new/χ_old, and only then does the stored χ advance. This turns the
//! previous branch point into a good initial guess after a large
//! continuation step, and lets a run of small steps accumulate until the
//! gate fires — the boundary data intentionally lags χ in between. The
//! gate is exposed so τ = 0 disables the approximation.
//!
//! # Bounded residue
//!
//! The bounded variant projects the iterate onto the box [lb, ub],
//! evaluates the residual at the projected point, and penalizes each
//! component with the accumulated constraint violation:
//!
//! ```text
//! f_i ← f_i + (f_i + sign(f_i)·ε_min) · excess,    ε_min = 10⁻³
//! ```
//!
//! which is continuous across the bound faces and pushes the continuation
//! path back toward the feasible box. The sign of the perturbation follows
//! the sign of f_i itself; this choice affects the convergence path and is
//! kept for parity with established results.

use log::debug;

use crate::error::{SimError, SimResult};
use crate::models::boundary::Inlet;
use crate::models::flow::{OFFSET_U, OFFSET_V};
use crate::physics::Domain;
use crate::solver::sim::Simulation;

/// Minimum penalty increment of the bounded residue
const MIN_INCREMENT: f64 = 1e-3;

impl Simulation {
    // ================================== Continuation setters ====================================

    /// The stored strain rate χ [1/s] — the value at the last
    /// amplification (or the last explicit set)
    pub fn strain_rate(&self) -> f64 {
        self.chi
    }

    /// Sets the stored strain rate without touching the solution
    pub fn set_strain_rate_value(&mut self, chi: f64) {
        self.chi = chi;
    }

    /// Sets the fuel-side inlet velocity [m/s]
    pub fn set_fuel_velocity(&mut self, uin_f: f64) {
        self.uin_f = uin_f;
    }

    /// Sets the oxidizer-side inlet velocity [m/s]
    pub fn set_oxidizer_velocity(&mut self, uin_o: f64) {
        self.uin_o = uin_o;
    }

    /// Sets the fuel-side inlet density [kg/m³]
    pub fn set_fuel_density(&mut self, rhoin_f: f64) {
        self.rhoin_f = rhoin_f;
    }

    /// Sets the oxidizer-side inlet density [kg/m³]
    pub fn set_oxidizer_density(&mut self, rhoin_o: f64) {
        self.rhoin_o = rhoin_o;
    }

    /// Sets the amplification threshold τ [1/s]; zero re-amplifies on every
    /// strain-rate change
    pub fn set_amplify_threshold(&mut self, tau: f64) {
        self.amplify_threshold = tau;
    }

    // ======================================== Bounds ============================================

    /// Rebuilds the augmented bound vectors from the domains; called
    /// whenever the problem is resized
    pub fn update_bounds(&mut self) {
        let n = self.sys.size();
        self.lb = Vec::with_capacity(n + 1);
        self.ub = Vec::with_capacity(n + 1);
        self.lb.extend_from_slice(self.sys.lower_bounds());
        self.ub.extend_from_slice(self.sys.upper_bounds());
        // the continuation parameter is non-negative and effectively uncapped
        self.lb.push(0.0);
        self.ub.push(1e10);
    }

    /// Lower bounds of the augmented solution (length N + 1)
    pub fn lower_bound(&self) -> &[f64] {
        &self.lb
    }

    /// Upper bounds of the augmented solution (length N + 1)
    pub fn upper_bound(&self) -> &[f64] {
        &self.ub
    }

    // ===================================== Amplification ========================================

    /// Amplifies the velocity field and boundary mass fluxes when the
    /// strain rate carried in the augmented vector's last slot has moved
    /// more than the threshold away from the stored χ; the stored χ
    /// advances only when that happens
    pub fn set_strain_rate(&mut self, x_aug: &[f64]) -> SimResult<()> {
        let n = self.sys.size();
        if x_aug.len() != n + 1 {
            return Err(SimError::InvalidInput(format!(
                "augmented solution must have length {}, got {}",
                n + 1,
                x_aug.len()
            )));
        }
        let a1 = x_aug[n];

        if (self.chi - a1).abs() > self.amplify_threshold {
            let ratio = a1 / self.chi;
            debug!("amplifying velocity field by {:.6} (chi {} -> {})", ratio, self.chi, a1);

            let f = self
                .sys
                .find_flow()
                .ok_or_else(|| SimError::InvalidInput("no flow domain in the chain".into()))?;
            let np = self.sys.domain(f).n_points();
            for j in 0..np {
                let iu = self.sys.index(f, OFFSET_U, j);
                let iv = self.sys.index(f, OFFSET_V, j);
                self.x[iu] *= ratio;
                self.x[iv] *= ratio;
            }

            self.uin_f *= ratio;
            self.uin_o *= ratio;

            // push the amplified mass fluxes into the two inlets
            let mdot_f = self.rhoin_f * self.uin_f;
            let mdot_o = self.rhoin_o * self.uin_o;
            let (left, right) = self.find_inlets(f)?;
            if let Some(d) = left {
                if let Some(inlet) = self.domain_as_mut::<Inlet>(d) {
                    inlet.set_mdot(mdot_f);
                }
            }
            if let Some(d) = right {
                if let Some(inlet) = self.domain_as_mut::<Inlet>(d) {
                    inlet.set_mdot(mdot_o);
                }
            }
            self.jac.invalidate();

            // the stored χ only advances when the gate fires, so small
            // continuation steps accumulate against the last amplification
            // point instead of drifting past the threshold unnoticed
            self.chi = a1;
        }
        Ok(())
    }

    /// Inlet domain indices to the left and right of flow domain `f`
    fn find_inlets(&self, f: usize) -> SimResult<(Option<usize>, Option<usize>)> {
        let mut left = None;
        let mut right = None;
        for d in 0..self.sys.n_domains() {
            if self.domain_as::<Inlet>(d).is_some() {
                if d < f {
                    left = Some(d);
                } else if d > f && right.is_none() {
                    right = Some(d);
                }
            }
        }
        Ok((left, right))
    }

    // ===================================== Residue surface ======================================

    /// Unbounded continuation residue: adopt the iterate, amplify if the
    /// strain-rate step crossed the threshold, evaluate F(x, 0)
    ///
    /// `x_aug` has length N + 1 (solution + χ); the first N slots of `f`
    /// receive the residual, the last slot is left to the continuation
    /// package (its arclength equation lives there).
    pub fn unbound_residue(&mut self, x_aug: &[f64], f: &mut [f64]) -> SimResult<()> {
        let n = self.sys.size();
        if f.len() < n {
            return Err(SimError::InvalidInput(format!(
                "residue buffer must hold at least {} entries, got {}",
                n,
                f.len()
            )));
        }
        self.set_solution(&x_aug[..n])?;
        self.set_strain_rate(x_aug)?;
        self.get_residual(0.0, &mut f[..n])
    }

    /// Bounded continuation residue: project onto [lb, ub], evaluate at the
    /// projected point, and penalize with the accumulated bound violation
    pub fn bound_residue(&mut self, x_aug: &[f64], f: &mut [f64]) -> SimResult<()> {
        let n = self.sys.size();
        if x_aug.len() != n + 1 {
            return Err(SimError::InvalidInput(format!(
                "augmented solution must have length {}, got {}",
                n + 1,
                x_aug.len()
            )));
        }
        if f.len() < n {
            return Err(SimError::InvalidInput(format!(
                "residue buffer must hold at least {} entries, got {}",
                n,
                f.len()
            )));
        }
        if self.lb.len() != n + 1 {
            self.update_bounds();
        }

        // Step 1 — projection and violation bookkeeping
        let mut projected = vec![0.0; n + 1];
        let mut excess = 0.0;
        for i in 0..=n {
            if x_aug[i] < self.lb[i] {
                projected[i] = self.lb[i];
                excess += self.lb[i] - x_aug[i];
            } else if x_aug[i] > self.ub[i] {
                projected[i] = self.ub[i];
                excess += x_aug[i] - self.ub[i];
            } else {
                projected[i] = x_aug[i];
            }
        }

        // Step 2 — residual at the projected point
        self.set_solution(&projected[..n])?;
        self.get_residual(0.0, &mut f[..n])?;

        // Step 3 — continuous penalty steering back into the box
        for fi in f[..n].iter_mut() {
            let perturb = if *fi > 0.0 { MIN_INCREMENT } else { -MIN_INCREMENT };
            *fi += (*fi + perturb) * excess;
        }
        Ok(())
    }
}
