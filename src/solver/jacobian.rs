//! Finite-difference banded Jacobian
//!
//! # Algorithm
//!
//! The Jacobian ∂F/∂x is assembled column by column: unknown i is perturbed
//! by δ = √ε·|x_i| + 10⁻⁸ and the residual is re-evaluated **only over the
//! 3-point stencil around the perturbed grid point** (the assembler's
//! hinted evaluation). Every entry the perturbation can reach lies within
//! the band, so one column costs a handful of residual rows rather than a
//! full sweep.
//!
//! Cross-domain columns work the same way: a perturbation at a domain edge
//! re-evaluates the neighbor's boundary rows through the same hint.
//!
//! # Lifecycle
//!
//! The assembled band matrix is kept (for the `value(i, j)` probe and the
//! adjoint solve) alongside its LU factorization. The factorization ages
//! with every damped Newton step and is rebuilt when the step controller
//! asks for a fresh one; any change to the solution vector or the grids
//! invalidates it wholesale.

use log::debug;

use crate::error::{SimError, SimResult};
use crate::physics::sqrt_eps;
use crate::solver::assembly::MultiDomain;
use crate::solver::band::{BandLU, BandMatrix};

// =================================================================================================
// Jacobian
// =================================================================================================

/// Banded finite-difference Jacobian with its factorization
pub struct Jacobian {
    mat: Option<BandMatrix>,
    lu: Option<BandLU>,
    /// Damped Newton steps taken since the last build
    age: usize,
    /// Builds performed over the lifetime of the solver (diagnostics)
    n_builds: usize,
    /// Reciprocal timestep the matrix was built at
    rdt: f64,
}

impl Jacobian {
    /// Creates an empty (unbuilt) Jacobian
    pub fn new() -> Self {
        Self { mat: None, lu: None, age: 0, n_builds: 0, rdt: 0.0 }
    }

    /// Whether a factorization is available
    pub fn ready(&self) -> bool {
        self.lu.is_some()
    }

    /// Steps taken since the last build
    pub fn age(&self) -> usize {
        self.age
    }

    /// Ages the factorization by one accepted step
    pub fn bump_age(&mut self) {
        self.age += 1;
    }

    /// Forces a rebuild on the next request
    pub fn invalidate(&mut self) {
        self.mat = None;
        self.lu = None;
        self.age = 0;
    }

    /// Number of builds performed so far
    pub fn n_builds(&self) -> usize {
        self.n_builds
    }

    /// Reciprocal timestep of the current matrix
    pub fn rdt(&self) -> f64 {
        self.rdt
    }

    /// Reads entry (i, j) of the assembled (unfactored) matrix
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidInput`] when no Jacobian has been built or the
    /// indices are out of range. Entries outside the band are zero.
    pub fn value(&self, i: usize, j: usize) -> SimResult<f64> {
        let mat = self
            .mat
            .as_ref()
            .ok_or_else(|| SimError::InvalidInput("no Jacobian has been built yet".into()))?;
        if i >= mat.n() || j >= mat.n() {
            return Err(SimError::InvalidInput(format!(
                "Jacobian entry ({}, {}) out of range for size {}",
                i,
                j,
                mat.n()
            )));
        }
        Ok(mat.get(i, j))
    }

    /// Assembles and factors ∂F/∂x at `x` by finite differences
    ///
    /// `resid0` must hold F(x, rdt) evaluated at the unperturbed `x`; the
    /// vector `x` is perturbed in place and restored before returning.
    pub fn build(
        &mut self,
        sys: &mut MultiDomain,
        x: &mut [f64],
        resid0: &[f64],
        rdt: f64,
    ) -> SimResult<()> {
        let n = sys.size();
        let bw = sys.half_bandwidth();

        let mut mat = match self.mat.take() {
            Some(mut m) if m.n() == n && m.kl() == bw => {
                m.clear();
                m
            }
            _ => BandMatrix::new(n, bw, bw),
        };

        let mut work = vec![0.0; n];
        for i in 0..n {
            let (d, _c, jloc) = sys.loc(i);
            let pt = sys.global_point(d, jloc);

            let xi = x[i];
            let dx = sqrt_eps() * xi.abs() + 1e-8;
            x[i] = xi + dx;
            work.copy_from_slice(resid0);
            sys.eval(Some(pt), x, &mut work, rdt);
            x[i] = xi;

            let lo = i.saturating_sub(bw);
            let hi = (i + bw).min(n - 1);
            for g in lo..=hi {
                let v = (work[g] - resid0[g]) / dx;
                if !v.is_finite() {
                    return Err(SimError::StateInconsistency(format!(
                        "non-finite Jacobian entry ({}, {})",
                        g, i
                    )));
                }
                if v != 0.0 {
                    mat.set(g, i, v);
                }
            }
        }

        // restore the caches the final perturbed evaluations left behind
        let mut scratch = vec![0.0; n];
        sys.eval(None, x, &mut scratch, rdt);

        self.lu = Some(mat.factor()?);
        self.mat = Some(mat);
        self.age = 0;
        self.n_builds += 1;
        self.rdt = rdt;
        debug!("Jacobian build #{} (n = {}, half-bandwidth = {})", self.n_builds, n, bw);
        Ok(())
    }

    /// Solves J·s = b in place
    pub fn solve(&self, b: &mut [f64]) -> SimResult<()> {
        let lu = self
            .lu
            .as_ref()
            .ok_or_else(|| SimError::Convergence("Jacobian not factored".into()))?;
        lu.solve(b);
        Ok(())
    }

    /// Solves the adjoint system Jᵀ·λ = b in place
    pub fn solve_transpose(&self, b: &mut [f64]) -> SimResult<()> {
        let lu = self
            .lu
            .as_ref()
            .ok_or_else(|| SimError::Convergence("Jacobian not factored".into()))?;
        lu.solve_transpose(b);
        Ok(())
    }
}

impl Default for Jacobian {
    fn default() -> Self {
        Self::new()
    }
}
