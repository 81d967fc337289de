//! The simulation driver
//!
//! [`Simulation`] owns the global solution vector and the domain chain and
//! exposes the whole public operating surface: initial-guess and profile
//! setting, the hybrid damped-Newton / pseudo-transient solve, manual and
//! automatic grid refinement, the free-flame temperature anchor, solution
//! snapshots for failure recovery, the adjoint solve, and persistence.
//!
//! # Solve state machine
//!
//! One `solve` call walks:
//!
//! 1. **NEWTON** — damped Newton on the steady problem F(x, 0) = 0.
//! 2. On stall, **TSTEP** — a block of backward-Euler steps of size Δt
//!    (each one a damped Newton solve of F(x, 1/Δt) = 0 against the stored
//!    previous iterate). Δt doubles after every successful block and halves
//!    on a failed step, with a hard floor of 10⁻¹⁰ s. Then back to NEWTON.
//!    The per-attempt step counts come from the user-installed schedule.
//! 3. On steady success the solution and grids are snapshotted, domains
//!    finalize, the steady callback (if any) observes the snapshot, and —
//!    when enabled — the **REFINE** stage proposes grid changes. No changes
//!    terminates the solve; otherwise domains resize, the solution is
//!    re-interpolated, the index map is rebuilt, and the cycle restarts.
//!
//! A convergence failure leaves the current solution undefined but the
//! snapshots `restore_steady_solution` / `restore_time_stepping_solution`
//! hold the last valid states.

use log::{debug, info};

use crate::error::{SimError, SimResult};
use crate::models::flow::{FlowDomain, OFFSET_T};
use crate::physics::{linear_interp, Domain, DomainKind};
use crate::solver::assembly::MultiDomain;
use crate::solver::jacobian::Jacobian;
use crate::solver::newton::{newton_solve, NewtonOptions};
use crate::solver::refine::{apply_plan, RefineCriteria, Refiner};

/// Pseudo-transient timestep floor [s]
const DT_FLOOR: f64 = 1e-10;

// =================================================================================================
// Simulation
// =================================================================================================

/// Owns the solution vector and drives the hybrid solve
pub struct Simulation {
    pub(crate) sys: MultiDomain,
    /// The global solution vector
    pub(crate) x: Vec<f64>,
    /// Work array holding the most recent residual evaluation
    xnew: Vec<f64>,
    /// Solution after the last successful time-stepping block
    xlast_ts: Vec<f64>,
    /// Solution after the last successful steady solve (pre-refinement)
    xlast_ss: Vec<f64>,
    /// Grids captured together with `xlast_ss`
    grid_last_ss: Vec<Vec<f64>>,
    /// Initial pseudo-transient step size [s]
    tstep0: f64,
    /// Steps per time-stepping attempt
    steps: Vec<usize>,
    pub(crate) jac: Jacobian,
    newton_opts: NewtonOptions,
    refiners: Vec<Refiner>,
    steady_cb: Option<Box<dyn FnMut(&[f64])>>,
    max_refine_passes: usize,
    max_timestep_attempts: usize,

    // ── Continuation state (see solver::continuation) ─────────────────────────
    pub(crate) chi: f64,
    pub(crate) uin_f: f64,
    pub(crate) uin_o: f64,
    pub(crate) rhoin_f: f64,
    pub(crate) rhoin_o: f64,
    pub(crate) amplify_threshold: f64,
    /// Bounds of the augmented solution (N state slots + the strain rate)
    pub(crate) lb: Vec<f64>,
    pub(crate) ub: Vec<f64>,
}

impl Simulation {
    /// Assembles a simulation from a left-to-right domain chain
    pub fn new(domains: Vec<Box<dyn Domain>>) -> SimResult<Self> {
        let n_domains = domains.len();
        let sys = MultiDomain::new(domains)?;
        let mut x = Vec::new();
        sys.initial_solution(&mut x);
        let n = x.len();

        let mut sim = Self {
            sys,
            x,
            xnew: vec![0.0; n],
            xlast_ts: Vec::new(),
            xlast_ss: Vec::new(),
            grid_last_ss: Vec::new(),
            tstep0: 1e-5,
            steps: vec![10],
            jac: Jacobian::new(),
            newton_opts: NewtonOptions::default(),
            refiners: vec![Refiner::default(); n_domains],
            steady_cb: None,
            max_refine_passes: 10,
            max_timestep_attempts: 20,
            chi: 1.0,
            uin_f: 0.0,
            uin_o: 0.0,
            rhoin_f: 0.0,
            rhoin_o: 0.0,
            amplify_threshold: f64::INFINITY,
            lb: Vec::new(),
            ub: Vec::new(),
        };
        sim.update_bounds();
        Ok(sim)
    }

    // ======================================== Accessors =========================================

    /// Number of unknowns in the global solution
    pub fn system_size(&self) -> usize {
        self.sys.size()
    }

    /// The global solution vector
    pub fn solution(&self) -> &[f64] {
        &self.x
    }

    /// Replaces the global solution vector
    pub fn set_solution(&mut self, soln: &[f64]) -> SimResult<()> {
        if soln.len() != self.x.len() {
            return Err(SimError::InvalidInput(format!(
                "solution length {} does not match system size {}",
                soln.len(),
                self.x.len()
            )));
        }
        self.x.copy_from_slice(soln);
        self.jac.invalidate();
        Ok(())
    }

    /// The assembled domain chain
    pub fn system(&self) -> &MultiDomain {
        &self.sys
    }

    /// Shared access to domain `d`
    pub fn domain(&self, d: usize) -> &dyn Domain {
        self.sys.domain(d)
    }

    /// Downcast access to a concrete domain type
    pub fn domain_as<T: 'static>(&self, d: usize) -> Option<&T> {
        self.sys.domain(d).as_any().downcast_ref::<T>()
    }

    /// Downcast mutable access to a concrete domain type
    ///
    /// Any configuration change may alter the residuals, so the Jacobian is
    /// invalidated wholesale.
    pub fn domain_as_mut<T: 'static>(&mut self, d: usize) -> Option<&mut T> {
        self.jac.invalidate();
        self.sys.domain_mut(d).as_any_mut().downcast_mut::<T>()
    }

    /// One entry of the solution: (domain, component, local point)
    pub fn value(&self, dom: usize, comp: usize, point: usize) -> SimResult<f64> {
        Ok(self.x[self.sys.index_checked(dom, comp, point)?])
    }

    /// Sets one entry of the solution
    pub fn set_value(&mut self, dom: usize, comp: usize, point: usize, v: f64) -> SimResult<()> {
        let i = self.sys.index_checked(dom, comp, point)?;
        self.x[i] = v;
        self.jac.invalidate();
        Ok(())
    }

    /// One entry of the work array (the most recent residual evaluation)
    pub fn work_value(&self, dom: usize, comp: usize, point: usize) -> SimResult<f64> {
        Ok(self.xnew[self.sys.index_checked(dom, comp, point)?])
    }

    // ===================================== Profile setting ======================================

    /// Piecewise-linear profile for one component of one domain
    ///
    /// `pos` holds relative positions in [0, 1] spanning the domain; the
    /// values are interpolated onto every grid point.
    pub fn set_profile(
        &mut self,
        dom: usize,
        comp: usize,
        pos: &[f64],
        values: &[f64],
    ) -> SimResult<()> {
        if pos.len() != values.len() || pos.is_empty() {
            return Err(SimError::InvalidInput(format!(
                "profile needs equal non-zero lengths, got {} positions and {} values",
                pos.len(),
                values.len()
            )));
        }
        self.sys.index_checked(dom, comp, 0)?;
        let d = self.sys.domain(dom);
        let z0 = d.grid().first();
        let extent = d.grid().extent();
        for j in 0..d.n_points() {
            let frac = if extent > 0.0 { (d.grid().z(j) - z0) / extent } else { 0.0 };
            let v = linear_interp(pos, values, frac);
            let i = self.sys.index(dom, comp, j);
            self.x[i] = v;
        }
        self.jac.invalidate();
        Ok(())
    }

    /// Constant fill of one component of one domain
    pub fn set_flat_profile(&mut self, dom: usize, comp: usize, v: f64) -> SimResult<()> {
        self.sys.index_checked(dom, comp, 0)?;
        for j in 0..self.sys.domain(dom).n_points() {
            let i = self.sys.index(dom, comp, j);
            self.x[i] = v;
        }
        self.jac.invalidate();
        Ok(())
    }

    /// Applies a profile to the named component in every domain carrying it
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidInput`] when no domain has a component with this
    /// name, or the position/value lengths differ.
    pub fn set_initial_guess(
        &mut self,
        component: &str,
        pos: &[f64],
        values: &[f64],
    ) -> SimResult<()> {
        let mut hit = false;
        for d in 0..self.sys.n_domains() {
            if let Some(c) = self.sys.domain(d).component_index(component) {
                if self.sys.domain(d).n_points() > 1 {
                    self.set_profile(d, c, pos, values)?;
                    hit = true;
                }
            }
        }
        if hit {
            Ok(())
        } else {
            Err(SimError::InvalidInput(format!("no component named '{}'", component)))
        }
    }

    // ==================================== Residual access =======================================

    /// Evaluates the governing residuals F(x, rdt) into `resid`
    pub fn get_residual(&mut self, rdt: f64, resid: &mut [f64]) -> SimResult<()> {
        if resid.len() != self.x.len() {
            return Err(SimError::InvalidInput(format!(
                "residual buffer length {} does not match system size {}",
                resid.len(),
                self.x.len()
            )));
        }
        self.sys.eval(None, &self.x, resid, rdt);
        Ok(())
    }

    /// Evaluates the steady residual into the internal work array
    pub fn eval(&mut self, rdt: f64) {
        let mut r = std::mem::take(&mut self.xnew);
        r.resize(self.x.len(), 0.0);
        self.sys.eval(None, &self.x, &mut r, rdt);
        self.xnew = r;
    }

    // =================================== Solver configuration ===================================

    /// Installs the pseudo-transient schedule: initial step size and the
    /// number of steps per successive attempt
    pub fn set_time_step(&mut self, step0: f64, steps: &[usize]) -> SimResult<()> {
        if step0 <= 0.0 {
            return Err(SimError::InvalidInput("initial timestep must be positive".into()));
        }
        if steps.is_empty() || steps.contains(&0) {
            return Err(SimError::InvalidInput(
                "timestep schedule needs at least one non-zero count".into(),
            ));
        }
        self.tstep0 = step0;
        self.steps = steps.to_vec();
        Ok(())
    }

    /// Tuning knobs of the damped Newton iteration
    pub fn newton_options_mut(&mut self) -> &mut NewtonOptions {
        &mut self.newton_opts
    }

    /// Registers a callback invoked with the solution snapshot after each
    /// successful steady solve, before refinement
    pub fn set_steady_callback(&mut self, cb: Box<dyn FnMut(&[f64])>) {
        self.steady_cb = Some(cb);
    }

    /// Caps the number of refine-and-resolve passes per `solve` call
    pub fn set_max_refine_passes(&mut self, n: usize) {
        self.max_refine_passes = n.max(1);
    }

    // ================================== Refinement criteria =====================================

    /// Sets refinement criteria; `dom = None` applies them to every domain
    pub fn set_refine_criteria(
        &mut self,
        dom: Option<usize>,
        ratio: f64,
        slope: f64,
        curve: f64,
        prune: f64,
    ) -> SimResult<()> {
        let c = RefineCriteria { ratio, slope, curve, prune };
        match dom {
            Some(d) => {
                if d >= self.refiners.len() {
                    return Err(SimError::InvalidInput(format!("no domain {}", d)));
                }
                self.refiners[d].criteria = c;
            }
            None => self.refiners.iter_mut().for_each(|r| r.criteria = c),
        }
        Ok(())
    }

    /// Caps the number of grid points; `dom = None` applies everywhere
    pub fn set_max_grid_points(&mut self, dom: Option<usize>, n: usize) -> SimResult<()> {
        match dom {
            Some(d) => {
                if d >= self.refiners.len() {
                    return Err(SimError::InvalidInput(format!("no domain {}", d)));
                }
                self.refiners[d].max_points = n;
            }
            None => self.refiners.iter_mut().for_each(|r| r.max_points = n),
        }
        Ok(())
    }

    /// Sets the minimum grid spacing; `dom = None` applies everywhere
    pub fn set_grid_min(&mut self, dom: Option<usize>, gridmin: f64) -> SimResult<()> {
        match dom {
            Some(d) => {
                if d >= self.refiners.len() {
                    return Err(SimError::InvalidInput(format!("no domain {}", d)));
                }
                self.refiners[d].grid_min = gridmin;
            }
            None => self.refiners.iter_mut().for_each(|r| r.grid_min = gridmin),
        }
        Ok(())
    }

    /// Maximum grid points allowed in domain `dom`
    pub fn max_grid_points(&self, dom: usize) -> usize {
        self.refiners[dom].max_points
    }

    // ====================================== Hybrid solve ========================================

    /// Solves the steady problem with pseudo-transient fallback and
    /// (optionally) adaptive refinement
    pub fn solve(&mut self, loglevel: u8, refine_grid: bool) -> SimResult<()> {
        for pass in 0..self.max_refine_passes {
            self.solve_steady_with_fallback(loglevel)?;

            // snapshot the converged state before anything touches it
            self.xlast_ss = self.x.clone();
            self.grid_last_ss = (0..self.sys.n_domains())
                .map(|d| self.sys.domain(d).grid().points().to_vec())
                .collect();
            self.sys.finalize(&self.x);
            if let Some(cb) = self.steady_cb.as_mut() {
                cb(&self.xlast_ss);
            }

            if !refine_grid {
                return Ok(());
            }
            let n_changes = self.refine(loglevel)?;
            if n_changes == 0 {
                if loglevel > 0 {
                    info!("grid converged after {} refinement pass(es)", pass);
                }
                return Ok(());
            }
        }
        Err(SimError::Convergence(format!(
            "grid did not converge within {} refinement passes",
            self.max_refine_passes
        )))
    }

    /// NEWTON ⇄ TSTEP loop: damped Newton with backward-Euler rescue blocks
    fn solve_steady_with_fallback(&mut self, loglevel: u8) -> SimResult<()> {
        let mut dt = self.tstep0;
        for attempt in 0..self.max_timestep_attempts {
            match newton_solve(
                &mut self.sys,
                &mut self.jac,
                &mut self.x,
                0.0,
                &self.newton_opts,
                loglevel,
            ) {
                Ok(()) => {
                    if loglevel > 0 {
                        info!("steady-state solve succeeded (attempt {})", attempt + 1);
                    }
                    return Ok(());
                }
                Err(SimError::Convergence(why)) | Err(SimError::StateInconsistency(why)) => {
                    let nsteps = self.steps[attempt.min(self.steps.len() - 1)];
                    if loglevel > 0 {
                        info!(
                            "steady solve stalled ({}); taking {} timesteps from dt = {:.3e} s",
                            why, nsteps, dt
                        );
                    }
                    dt = self.timestep_block(nsteps, dt, loglevel)?;
                    // a successful block earns a larger step
                    dt *= 2.0;
                }
                Err(e) => return Err(e),
            }
        }
        Err(SimError::Convergence(format!(
            "steady solve failed after {} time-stepping attempts",
            self.max_timestep_attempts
        )))
    }

    /// Takes `nsteps` backward-Euler steps of size `dt`, halving `dt` on a
    /// failed step (floor 10⁻¹⁰ s); returns the final step size
    fn timestep_block(&mut self, nsteps: usize, mut dt: f64, loglevel: u8) -> SimResult<f64> {
        for step in 0..nsteps {
            loop {
                self.sys.store_prev(&self.x);
                let saved = self.x.clone();
                match newton_solve(
                    &mut self.sys,
                    &mut self.jac,
                    &mut self.x,
                    1.0 / dt,
                    &self.newton_opts,
                    loglevel,
                ) {
                    Ok(()) => {
                        self.xlast_ts = self.x.clone();
                        if loglevel > 1 {
                            debug!("timestep {} of {} done (dt = {:.3e} s)", step + 1, nsteps, dt);
                        }
                        break;
                    }
                    Err(SimError::Convergence(_)) | Err(SimError::StateInconsistency(_)) => {
                        self.x = saved;
                        self.jac.invalidate();
                        dt *= 0.5;
                        if dt < DT_FLOOR {
                            return Err(SimError::Convergence(format!(
                                "timestep fell below the {:.0e} s floor",
                                DT_FLOOR
                            )));
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(dt)
    }

    // =================================== Failure recovery =======================================

    /// Restores the last successful time-stepping solution
    pub fn restore_time_stepping_solution(&mut self) -> SimResult<()> {
        if self.xlast_ts.is_empty() {
            return Err(SimError::InvalidInput(
                "no successful time steps have been taken yet".into(),
            ));
        }
        if self.xlast_ts.len() != self.x.len() {
            return Err(SimError::InvalidInput(
                "grid has changed since the last time-stepping solution".into(),
            ));
        }
        self.x.copy_from_slice(&self.xlast_ts);
        self.jac.invalidate();
        Ok(())
    }

    /// Restores the last successful steady solution together with its grids
    pub fn restore_steady_solution(&mut self) -> SimResult<()> {
        if self.xlast_ss.is_empty() {
            return Err(SimError::InvalidInput("no successful steady solve yet".into()));
        }
        for d in 0..self.sys.n_domains() {
            let z = self.grid_last_ss[d].clone();
            self.sys.domain_mut(d).resize(&z);
        }
        self.sys.rebuild();
        self.x = self.xlast_ss.clone();
        self.xnew.resize(self.x.len(), 0.0);
        self.jac.invalidate();
        Ok(())
    }

    // ====================================== Refinement ==========================================

    /// Analyzes every domain and applies the proposed grid changes;
    /// returns the number of changes (0 means the mesh is converged)
    pub fn refine(&mut self, loglevel: u8) -> SimResult<usize> {
        let nd = self.sys.n_domains();
        let mut plans = Vec::with_capacity(nd);
        let mut total = 0;
        for d in 0..nd {
            let dom = self.sys.domain(d);
            if dom.n_components() == 0 || dom.n_points() < 3 {
                plans.push(None);
                continue;
            }
            let lo = self.sys.start_of(d);
            let hi = lo + dom.n_components() * dom.n_points();
            let plan = self.refiners[d].analyze(dom, &self.x[lo..hi]);
            total += plan.n_changes();
            plans.push(Some(plan));
        }
        if total == 0 {
            return Ok(0);
        }

        // apply: rebuild each refined domain and splice the global vector
        let mut newx = Vec::with_capacity(self.x.len() + total * 4);
        for (d, plan) in plans.iter().enumerate() {
            let lo = self.sys.start_of(d);
            let dom = self.sys.domain(d);
            let nc = dom.n_components();
            let hi = lo + nc * dom.n_points();
            match plan {
                Some(p) if p.n_changes() > 0 => {
                    let z = dom.grid().points().to_vec();
                    let (nz, nx) = apply_plan(&z, &self.x[lo..hi], nc, p);
                    if loglevel > 1 {
                        debug!(
                            "domain {}: +{} points, -{} points ({} total)",
                            d,
                            p.insert.len(),
                            p.remove.len(),
                            nz.len()
                        );
                    }
                    self.sys.domain_mut(d).resize(&nz);
                    newx.extend_from_slice(&nx);
                }
                _ => newx.extend_from_slice(&self.x[lo..hi]),
            }
        }
        self.sys.rebuild();
        self.x = newx;
        self.xnew.resize(self.x.len(), 0.0);
        self.jac.invalidate();
        self.update_bounds();
        if loglevel > 0 {
            info!("grid refinement made {} changes ({} unknowns)", total, self.x.len());
        }
        Ok(total)
    }

    // ================================== Free-flame anchor =======================================

    /// Inserts a grid point where the temperature profile crosses `t` and
    /// pins the freely-propagating flame there
    ///
    /// Returns the local index of the anchor point in the flame domain.
    pub fn set_fixed_temperature(&mut self, t: f64) -> SimResult<usize> {
        let d = self
            .sys
            .find_kind(DomainKind::FreeFlame)
            .ok_or_else(|| SimError::InvalidInput("no freely-propagating flame domain".into()))?;

        let dom = self.sys.domain(d);
        let nc = dom.n_components();
        let np = dom.n_points();
        let lo = self.sys.start_of(d);
        let z: Vec<f64> = dom.grid().points().to_vec();
        let tv: Vec<f64> = (0..np).map(|j| self.x[lo + j * nc + OFFSET_T]).collect();
        let tval = |j: usize| tv[j];

        // exact hit first, then a sign change to interpolate into
        for j in 0..np {
            if (tval(j) - t).abs() < 1e-12 {
                let zf = z[j];
                let flow = self
                    .domain_as_mut::<FlowDomain>(d)
                    .ok_or_else(|| SimError::InvalidInput("domain is not a flow domain".into()))?;
                flow.set_anchor(zf, t);
                return Ok(j);
            }
        }
        for j in 0..np - 1 {
            if (tval(j) - t) * (tval(j + 1) - t) < 0.0 {
                let frac = (t - tval(j)) / (tval(j + 1) - tval(j));
                let zf = z[j] + frac * (z[j + 1] - z[j]);

                // insert the point, interpolating every component
                let mut nz = z.clone();
                nz.insert(j + 1, zf);
                let mut nx = Vec::with_capacity((np + 1) * nc);
                nx.extend_from_slice(&self.x[lo..lo + (j + 1) * nc]);
                for c in 0..nc {
                    let a = self.x[lo + j * nc + c];
                    let b = self.x[lo + (j + 1) * nc + c];
                    nx.push(a + frac * (b - a));
                }
                nx.extend_from_slice(&self.x[lo + (j + 1) * nc..lo + np * nc]);

                self.sys.domain_mut(d).resize(&nz);
                let hi_old = lo + np * nc;
                self.x.splice(lo..hi_old, nx);
                self.sys.rebuild();
                self.xnew.resize(self.x.len(), 0.0);
                self.jac.invalidate();
                self.update_bounds();

                let flow = self
                    .domain_as_mut::<FlowDomain>(d)
                    .ok_or_else(|| SimError::InvalidInput("domain is not a flow domain".into()))?;
                flow.set_anchor(zf, t);
                return Ok(j + 1);
            }
        }
        Err(SimError::InvalidInput(format!(
            "temperature {} K is not bracketed by the current profile",
            t
        )))
    }

    /// Adopts a solution vector sized for the (possibly just-resized)
    /// current grids; used by the persistence layer after a restore
    pub(crate) fn adopt_restored_solution(&mut self, x: Vec<f64>) {
        debug_assert_eq!(x.len(), self.sys.size());
        self.x = x;
        self.xnew.clear();
        self.xnew.resize(self.x.len(), 0.0);
        self.xlast_ts.clear();
        self.jac.invalidate();
        self.update_bounds();
    }

    // ================================== Jacobian / adjoint ======================================

    /// Builds and factors the steady-state Jacobian at the current solution
    pub fn eval_ss_jacobian(&mut self) -> SimResult<()> {
        let mut r = vec![0.0; self.x.len()];
        self.sys.eval(None, &self.x, &mut r, 0.0);
        self.xnew.copy_from_slice(&r);
        self.jac.build(&mut self.sys, &mut self.x, &r, 0.0)
    }

    /// Solves the adjoint system Jᵀ λ = b at the current steady state
    ///
    /// The factorization is built on demand and invalidated whenever the
    /// solution or the grid changes.
    pub fn solve_adjoint(&mut self, b: &[f64], lambda: &mut [f64]) -> SimResult<()> {
        if b.len() != self.x.len() || lambda.len() != self.x.len() {
            return Err(SimError::InvalidInput(format!(
                "adjoint vectors must have length {}",
                self.x.len()
            )));
        }
        if !self.jac.ready() || self.jac.rdt() != 0.0 {
            self.eval_ss_jacobian()?;
        }
        lambda.copy_from_slice(b);
        self.jac.solve_transpose(lambda)
    }

    /// Reads one entry of the most recently assembled Jacobian
    pub fn jacobian(&self, i: usize, j: usize) -> SimResult<f64> {
        self.jac.value(i, j)
    }

    // ====================================== Diagnostics =========================================

    /// Logs the current solution, one block per domain
    pub fn show_solution(&self) {
        for d in 0..self.sys.n_domains() {
            let dom = self.sys.domain(d);
            let nc = dom.n_components();
            info!("domain {} <{}>: {} points, {} components", d, dom.kind(), dom.n_points(), nc);
            if nc == 0 {
                continue;
            }
            let names: Vec<String> = (0..nc).map(|c| dom.component_name(c)).collect();
            info!("    z        {}", names.join("  "));
            for j in 0..dom.n_points() {
                let vals: Vec<String> = (0..nc)
                    .map(|c| format!("{:11.4e}", self.x[self.sys.index(d, c, j)]))
                    .collect();
                info!("    {:9.4e}  {}", dom.grid().z(j), vals.join(" "));
            }
        }
    }
}
