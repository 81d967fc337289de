//! Two-phase spray counterflow flame
//!
//! # Physical background
//!
//! A [`SprayFlame`] extends the axisymmetric stagnation gas flow with a
//! dilute liquid droplet phase described by five additional components per
//! grid point: the liquid strain velocity $U_\ell$, axial velocity $v_\ell$,
//! droplet temperature $T_\ell$, droplet mass $m_\ell$, and number density
//! $n_\ell$. Droplets are injected at an inlet, decelerate against the
//! opposed gas stream, heat up, and evaporate; the vapor feeds the gas-phase
//! fuel species.
//!
//! # Liquid equations
//!
//! Upwinded by the sign of $v_\ell$ at every interior point:
//!
//! $$v_\ell \frac{dm_\ell}{dz} = -\dot m_d + AV(m_\ell)$$
//! $$v_\ell \frac{dn_\ell}{dz} = AV(n_\ell)$$
//! $$m_\ell c_{p,\ell} v_\ell \frac{dT_\ell}{dz} = \dot m_d \dot q_\text{conv} - \dot m_d L_v + AV(T_\ell)$$
//! $$m_\ell v_\ell \frac{dU_\ell}{dz} = F_r - m_\ell U_\ell^2 + AV(U_\ell)$$
//! $$m_\ell v_\ell \frac{dv_\ell}{dz} = f_z + AV(v_\ell)$$
//!
//! The liquid equations are purely hyperbolic; the artificial-viscosity
//! terms $AV(\phi)$ (central stencil, user-supplied per-variable
//! coefficients) suppress the mesh-scale oscillations they would otherwise
//! develop.
//!
//! # Evaporation closures
//!
//! - Droplet diameter $d_\ell = (6 m_\ell / (\pi \rho_\ell))^{1/3}$, with
//!   $\rho_\ell(T_\ell)$ from the DIPPR-105 correlation (constant when only
//!   the A coefficient is set)
//! - Vapor pressure from the Antoine fit evaluated at the boiling point
//!   $T_b$ — a constant-vapor-pressure-per-droplet modeling choice, not an
//!   oversight
//! - Surface mass fraction from Raoult's law, Spalding transfer number
//!   $B_m$, evaporation rate $\dot m_d = 2\pi d_\ell \rho D_{g,f} \ln(1+B_m)$
//! - Convective heating $\dot q_\text{conv} = c_{p,g}(T - T_\ell)/B_T$ with
//!   $B_T = e^{\dot m_d/(2\pi\rho D_{g,f} d_\ell)} - 1$, cut off for
//!   vanishing evaporation rates
//! - Latent heat $L_v = B R / W_f$ (Clausius-Clapeyron from the Antoine B
//!   coefficient)
//! - Stokes drag $F_r = 3\pi d_\ell \mu (V - U_\ell)$,
//!   $f_z = 3\pi d_\ell \mu (u - v_\ell)$
//!
//! # Gas-phase coupling
//!
//! Evaporation acts back on the gas: the fuel species gains
//! $n_\ell \dot m_d$ of mass (with dilution of the others so Σ Y stays 1),
//! the energy equation loses the convective heating drawn by the droplets,
//! the radial momentum feels the drag reaction, and the continuity integral
//! gains the evaporated mass.

use std::any::Any;
use std::f64::consts::PI;

use serde_json::json;

use crate::error::{SimError, SimResult};
use crate::models::flow::{FlowDomain, FlowKind, OFFSET_T, OFFSET_U, OFFSET_V, OFFSET_Y};
use crate::physics::{
    tiny, Domain, DomainKind, EdgeState, Grid, KineticsAdapter, LiquidEdgeState, Shared, Side,
    ThermoAdapter, TransportAdapter, BAR_TO_PA, GAS_CONSTANT, MMHG_TO_PA,
};

// Relative liquid-component offsets within the trailing block
const LIQ_UL: usize = 0;
const LIQ_VL: usize = 1;
const LIQ_TL: usize = 2;
const LIQ_ML: usize = 3;
const LIQ_NL: usize = 4;

/// Number of liquid components appended to the gas block
pub const N_LIQUID: usize = 5;

// =================================================================================================
// SprayFlame
// =================================================================================================

/// Axisymmetric stagnation flame with a dilute liquid droplet phase
///
/// The sub-vector holds `4 + n_species + 5` components per point: the gas
/// block (u, V, T, Λ, Y_k) followed by (U_ℓ, v_ℓ, T_ℓ, m_ℓ, n_ℓ).
pub struct SprayFlame {
    gas: FlowDomain,

    /// DIPPR-105 liquid density coefficients (A, B, C, D); a lone A means a
    /// constant density
    rhol: [f64; 4],

    // Antoine vapor-pressure fit and unit conversion factor
    prs_a: f64,
    prs_b: f64,
    prs_c: f64,
    t_boil: f64,
    cvt: f64,

    /// Liquid specific heat [J/(kg·K)], assumed constant
    cpl: f64,

    /// Artificial-viscosity coefficients for (m_ℓ, n_ℓ, T_ℓ, U_ℓ, v_ℓ)
    av: [f64; 5],

    /// Gas-phase fuel species index
    fuel: usize,
}

impl SprayFlame {
    /// Creates a spray flame domain on the given grid
    ///
    /// The fuel species defaults to species 0; call
    /// [`update_fuel_species`](Self::update_fuel_species) to pick the real
    /// one, and the `set_liquid_*` methods to install the fuel's property
    /// fits before solving.
    pub fn new(
        thermo: Shared<dyn ThermoAdapter>,
        kinetics: Shared<dyn KineticsAdapter>,
        transport: Shared<dyn TransportAdapter>,
        grid: Grid,
    ) -> Self {
        let gas = FlowDomain::with_extra_components(
            FlowKind::AxiStagnation,
            thermo,
            kinetics,
            transport,
            grid,
            N_LIQUID,
        );
        Self {
            gas,
            rhol: [700.0, 0.0, 0.0, 0.0],
            prs_a: 0.0,
            prs_b: 0.0,
            prs_c: 0.0,
            t_boil: 300.0,
            cvt: MMHG_TO_PA,
            cpl: 2000.0,
            av: [0.0; 5],
            fuel: 0,
        }
    }

    /// Shared access to the embedded gas-phase domain configuration
    pub fn gas(&self) -> &FlowDomain {
        &self.gas
    }

    /// Mutable access to the embedded gas-phase domain configuration
    pub fn gas_mut(&mut self) -> &mut FlowDomain {
        &mut self.gas
    }

    // ===================================== Configuration ========================================

    /// Sets the DIPPR-105 liquid density coefficients; passing only `a`
    /// (b = c = d = 0) selects a constant density ρ_ℓ = a
    pub fn set_liquid_density_param(&mut self, a: f64, b: f64, c: f64, d: f64) {
        self.rhol = [a, b, c, d];
    }

    /// Sets the Antoine vapor-pressure fit `log10 p_v = A - B/(C + T)` with
    /// boiling point `tb`; `unit` selects the pressure unit of the fit and
    /// must be `"mmHg"` or `"bar"`
    pub fn set_liquid_vap_press_param(
        &mut self,
        a: f64,
        b: f64,
        c: f64,
        tb: f64,
        unit: &str,
    ) -> SimResult<()> {
        match unit {
            "mmHg" => {
                // mmHg tables are in Celsius; shift C so the fit takes Kelvin
                self.prs_a = a;
                self.prs_b = b;
                self.prs_c = c - 273.15;
                self.t_boil = tb;
                self.cvt = MMHG_TO_PA;
                Ok(())
            }
            "bar" => {
                self.prs_a = a;
                self.prs_b = b;
                self.prs_c = c;
                self.t_boil = tb;
                self.cvt = BAR_TO_PA;
                Ok(())
            }
            other => Err(SimError::InvalidInput(format!(
                "unknown vapor-pressure unit '{}', expected \"mmHg\" or \"bar\"",
                other
            ))),
        }
    }

    /// Sets the (constant) liquid specific heat [J/(kg·K)]
    pub fn set_liquid_cp(&mut self, cpl: f64) {
        self.cpl = cpl;
    }

    /// Sets the artificial-viscosity coefficients in the order
    /// (m_ℓ, n_ℓ, T_ℓ, U_ℓ, v_ℓ)
    pub fn set_av_coefficients(&mut self, c: [f64; 5]) {
        self.av = c;
    }

    /// Selects the gas-phase species the evaporating liquid turns into
    pub fn update_fuel_species(&mut self, name: &str) -> SimResult<()> {
        self.fuel = self
            .gas
            .component_index(name)
            .filter(|&c| c >= OFFSET_Y)
            .map(|c| c - OFFSET_Y)
            .ok_or_else(|| SimError::InvalidInput(format!("no species named '{}'", name)))?;
        Ok(())
    }

    // =================================== Liquid accessors =======================================

    #[inline]
    fn liq_base(&self) -> usize {
        OFFSET_Y + self.gas.nsp
    }

    #[inline]
    fn ul(&self, x: &[f64], j: usize) -> f64 {
        x[self.gas.idx(self.liq_base() + LIQ_UL, j)]
    }

    #[inline]
    fn vl(&self, x: &[f64], j: usize) -> f64 {
        x[self.gas.idx(self.liq_base() + LIQ_VL, j)]
    }

    #[inline]
    fn tl(&self, x: &[f64], j: usize) -> f64 {
        x[self.gas.idx(self.liq_base() + LIQ_TL, j)]
    }

    #[inline]
    fn ml(&self, x: &[f64], j: usize) -> f64 {
        x[self.gas.idx(self.liq_base() + LIQ_ML, j)]
    }

    #[inline]
    fn nl(&self, x: &[f64], j: usize) -> f64 {
        x[self.gas.idx(self.liq_base() + LIQ_NL, j)]
    }

    // =================================== Droplet closures =======================================

    /// Liquid density ρ_ℓ(T_ℓ) from DIPPR-105, or the constant A coefficient
    pub fn liquid_density(&self, tl: f64) -> f64 {
        let [a, b, c, d] = self.rhol;
        let tiny = f64::MIN_POSITIVE.sqrt();
        if b.abs() < tiny && c.abs() < tiny && d.abs() < tiny {
            a
        } else {
            a / b.powf(1.0 + (1.0 - tl / c).powf(d))
        }
    }

    /// Droplet diameter d_ℓ = (6 m_ℓ / (π ρ_ℓ))^(1/3); zero once the
    /// droplet mass falls below the effectively-zero cutoff
    pub fn droplet_diameter(&self, x: &[f64], j: usize) -> f64 {
        let ml = self.ml(x, j);
        if ml < tiny() {
            return 0.0;
        }
        (6.0 * ml / (PI * self.liquid_density(self.tl(x, j)))).powf(1.0 / 3.0)
    }

    /// Fuel vapor pressure from the Antoine fit, evaluated at the boiling
    /// point (constant-p_v-per-droplet approximation)
    pub fn vapor_pressure(&self) -> f64 {
        10f64.powf(self.prs_a - self.prs_b / (self.prs_c + self.t_boil)) * self.cvt
    }

    /// ρ·D of the fuel species at the interval midpoint nearest to point j
    #[inline]
    fn rho_d_fuel(&self, j: usize) -> f64 {
        let np = self.gas.n_points();
        self.gas.diff[(j.min(np - 2), self.fuel)]
    }

    /// Gas viscosity at the interval midpoint nearest to point j
    #[inline]
    fn visc_at(&self, j: usize) -> f64 {
        let np = self.gas.n_points();
        self.gas.visc[j.min(np - 2)]
    }

    /// Fuel surface mass fraction from Raoult's law
    pub fn surface_mass_fraction(&self, j: usize) -> f64 {
        let xrs = self.vapor_pressure() / self.gas.press;
        let wf = self.gas.wt[self.fuel];
        wf * xrs / (wf * xrs + (1.0 - xrs) * self.gas.wtm[j])
    }

    /// Evaporation rate ṁ_d of one droplet [kg/s]
    pub fn evaporation_rate(&self, x: &[f64], j: usize) -> f64 {
        let dl = self.droplet_diameter(x, j);
        if dl == 0.0 {
            return 0.0;
        }
        let yrs = self.surface_mass_fraction(j);
        let bm = (yrs - self.gas.y(x, self.fuel, j)) / (1.0 - yrs).max(tiny());
        2.0 * PI * dl * self.rho_d_fuel(j) * (1.0 + bm).max(tiny()).ln()
    }

    /// Convective heat delivered to one droplet per unit evaporated mass
    /// [J/kg]; zero below the evaporation cutoff
    fn q_conv(&self, x: &[f64], j: usize, mdot_d: f64) -> f64 {
        if mdot_d <= tiny() {
            return 0.0;
        }
        let dl = self.droplet_diameter(x, j);
        let bt = (mdot_d / (2.0 * PI * self.rho_d_fuel(j) * dl)).exp() - 1.0;
        self.gas.cp[j] * (self.gas.t(x, j) - self.tl(x, j)) / bt
    }

    /// Latent heat of vaporization from the Antoine B coefficient [J/kg]
    pub fn latent_heat(&self) -> f64 {
        self.prs_b * GAS_CONSTANT / self.gas.wt[self.fuel]
    }

    /// Radial drag force on one droplet
    #[inline]
    fn drag_radial(&self, x: &[f64], j: usize) -> f64 {
        3.0 * PI * self.droplet_diameter(x, j) * self.visc_at(j) * (self.gas.v(x, j) - self.ul(x, j))
    }

    /// Axial drag force on one droplet
    #[inline]
    fn drag_axial(&self, x: &[f64], j: usize) -> f64 {
        3.0 * PI * self.droplet_diameter(x, j) * self.visc_at(j) * (self.gas.u(x, j) - self.vl(x, j))
    }

    // ================================== Liquid discretisation ===================================

    /// Upwinded derivative of liquid component `c_rel` by the sign of v_ℓ
    #[inline]
    fn dliq_dz(&self, x: &[f64], c_rel: usize, j: usize) -> f64 {
        let g = self.gas.grid();
        let jloc = if self.vl(x, j) > 0.0 { j } else { j + 1 };
        let c = self.liq_base() + c_rel;
        (x[self.gas.idx(c, jloc)] - x[self.gas.idx(c, jloc - 1)]) / g.dz(jloc - 1)
    }

    /// Artificial viscosity: central stencil with coefficient `coeff`
    #[inline]
    fn av_term(&self, x: &[f64], c_rel: usize, coeff: f64, j: usize) -> f64 {
        if coeff == 0.0 {
            return 0.0;
        }
        let g = self.gas.grid();
        let c = self.liq_base() + c_rel;
        let phi = |jj: usize| x[self.gas.idx(c, jj)];
        let c1 = coeff * (phi(j) - phi(j - 1));
        let c2 = coeff * (phi(j + 1) - phi(j));
        2.0 * (c2 / g.dz(j) - c1 / g.dz(j - 1)) / (g.z(j + 1) - g.z(j - 1))
    }

    /// Liquid residuals and gas-coupling sources at interior point j
    fn eval_liquid_interior(&self, j: usize, x: &[f64], rsd: &mut [f64], rdt: f64) {
        let base = self.liq_base();
        let ml = self.ml(x, j);
        let nl = self.nl(x, j);
        let vl = self.vl(x, j);
        let ul = self.ul(x, j);
        let tl = self.tl(x, j);
        let mdot_d = self.evaporation_rate(x, j);
        let q = self.q_conv(x, j, mdot_d);

        let prev = |c_rel: usize| self.gas.prev[self.gas.idx(base + c_rel, j)];

        // droplet mass
        rsd[self.gas.idx(base + LIQ_ML, j)] = -mdot_d - vl * self.dliq_dz(x, LIQ_ML, j)
            + self.av_term(x, LIQ_ML, self.av[0], j)
            - rdt * (ml - prev(LIQ_ML));

        // number density
        rsd[self.gas.idx(base + LIQ_NL, j)] = -vl * self.dliq_dz(x, LIQ_NL, j)
            + self.av_term(x, LIQ_NL, self.av[1], j)
            - rdt * (nl - prev(LIQ_NL));

        // droplet temperature
        rsd[self.gas.idx(base + LIQ_TL, j)] = mdot_d * (q - self.latent_heat())
            - ml * self.cpl * vl * self.dliq_dz(x, LIQ_TL, j)
            + self.av_term(x, LIQ_TL, self.av[2], j)
            - rdt * (tl - prev(LIQ_TL));

        // liquid radial momentum
        rsd[self.gas.idx(base + LIQ_UL, j)] = self.drag_radial(x, j) - ml * ul * ul
            - ml * vl * self.dliq_dz(x, LIQ_UL, j)
            + self.av_term(x, LIQ_UL, self.av[3], j)
            - rdt * (ul - prev(LIQ_UL));

        // liquid axial momentum
        rsd[self.gas.idx(base + LIQ_VL, j)] = self.drag_axial(x, j)
            - ml * vl * self.dliq_dz(x, LIQ_VL, j)
            + self.av_term(x, LIQ_VL, self.av[4], j)
            - rdt * (vl - prev(LIQ_VL));

        // ── Gas-phase coupling ────────────────────────────────────────────────
        //
        // The evaporated mass n_ℓ·ṁ_d feeds the fuel species (diluting the
        // others so Σ Y stays 1), draws convective heat out of the gas, and
        // the drag reaction loads the gas radial momentum.
        let s = nl * mdot_d;
        let rho = self.gas.rho[j];
        if s != 0.0 {
            for k in 0..self.gas.nsp {
                let delta = if k == self.fuel { 1.0 } else { 0.0 };
                rsd[self.gas.idx(OFFSET_Y + k, j)] += (delta - self.gas.y(x, k, j)) * s / rho;
            }
            if self.gas.energy_enabled(j) {
                rsd[self.gas.idx(OFFSET_T, j)] -= s * q / (rho * self.gas.cp[j]);
            }
        }
        rsd[self.gas.idx(OFFSET_V, j)] -= nl * self.drag_radial(x, j) / rho;
    }

    /// Left-edge liquid defaults: an evaporating spray enters through an
    /// inlet carrying liquid values, which overrides these rows; without one
    /// the liquid phase is absent
    fn eval_liquid_left(&self, x: &[f64], rsd: &mut [f64]) {
        let base = self.liq_base();
        rsd[self.gas.idx(base + LIQ_UL, 0)] = self.ul(x, 0);
        rsd[self.gas.idx(base + LIQ_VL, 0)] = self.vl(x, 0);
        rsd[self.gas.idx(base + LIQ_TL, 0)] = self.tl(x, 0) - 300.0;
        rsd[self.gas.idx(base + LIQ_ML, 0)] = self.ml(x, 0);
        rsd[self.gas.idx(base + LIQ_NL, 0)] = self.nl(x, 0);
    }

    /// Right-edge liquid defaults: zero gradient for every liquid component
    fn eval_liquid_right(&self, x: &[f64], rsd: &mut [f64]) {
        let base = self.liq_base();
        let j = self.gas.n_points() - 1;
        for c_rel in 0..N_LIQUID {
            let c = base + c_rel;
            rsd[self.gas.idx(c, j)] = x[self.gas.idx(c, j)] - x[self.gas.idx(c, j - 1)];
        }
    }

    /// Continuity gains the evaporated mass: the U row over interval j picks
    /// up the trapezoid average of the volumetric source n_ℓ·ṁ_d
    fn add_continuity_source(&self, jmin: usize, jmax: usize, x: &[f64], rsd: &mut [f64]) {
        let np = self.gas.n_points();
        for j in jmin..=jmax.min(np - 2) {
            let s0 = self.nl(x, j) * self.evaporation_rate(x, j);
            let s1 = self.nl(x, j + 1) * self.evaporation_rate(x, j + 1);
            rsd[self.gas.idx(OFFSET_U, j)] += 0.5 * (s0 + s1);
        }
    }
}

// =================================================================================================
// Domain implementation
// =================================================================================================

impl Domain for SprayFlame {
    fn kind(&self) -> DomainKind {
        DomainKind::SprayStagnation
    }

    fn n_components(&self) -> usize {
        self.gas.nv
    }

    fn n_points(&self) -> usize {
        self.gas.n_points()
    }

    fn component_name(&self, c: usize) -> String {
        let base = self.liq_base();
        if c < base {
            self.gas.component_name(c)
        } else {
            match c - base {
                LIQ_UL => "Ul".to_string(),
                LIQ_VL => "vl".to_string(),
                LIQ_TL => "Tl".to_string(),
                LIQ_ML => "ml".to_string(),
                _ => "nl".to_string(),
            }
        }
    }

    fn component_index(&self, name: &str) -> Option<usize> {
        let base = self.liq_base();
        match name {
            "Ul" => Some(base + LIQ_UL),
            "vl" => Some(base + LIQ_VL),
            "Tl" => Some(base + LIQ_TL),
            "ml" => Some(base + LIQ_ML),
            "nl" => Some(base + LIQ_NL),
            _ => self.gas.component_index(name),
        }
    }

    fn bounds(&self, c: usize) -> (f64, f64) {
        let base = self.liq_base();
        if c < base {
            return self.gas.bounds(c);
        }
        match c - base {
            LIQ_TL => (150.0, 5e3),
            // a hair below zero tolerates roundoff in the damped steps
            LIQ_ML | LIQ_NL => (-1e-12, 1e20),
            _ => (-1e20, 1e20),
        }
    }

    fn refine_active(&self, c: usize) -> bool {
        let base = self.liq_base();
        if c < base {
            return self.gas.refine_active(c);
        }
        matches!(c - base, LIQ_ML | LIQ_TL)
    }

    fn tolerances(&self, transient: bool) -> (f64, f64) {
        self.gas.tolerances(transient)
    }

    fn grid(&self) -> &Grid {
        self.gas.grid()
    }

    fn resize(&mut self, z: &[f64]) {
        self.gas.resize(z);
    }

    fn initial_solution(&self, x: &mut [f64]) {
        self.gas.initial_solution(x);
        let base = self.liq_base();
        for j in 0..self.gas.n_points() {
            x[self.gas.idx(base + LIQ_UL, j)] = 0.0;
            x[self.gas.idx(base + LIQ_VL, j)] = 0.0;
            x[self.gas.idx(base + LIQ_TL, j)] = 300.0;
            x[self.gas.idx(base + LIQ_ML, j)] = 0.0;
            x[self.gas.idx(base + LIQ_NL, j)] = 0.0;
        }
    }

    fn eval(&mut self, jpt: Option<usize>, x: &[f64], rsd: &mut [f64], rdt: f64) {
        self.gas.eval_gas(jpt, x, rsd, rdt);

        let np = self.gas.n_points();
        let (jmin, jmax) = match jpt {
            None => (0, np - 1),
            Some(j) => (j.saturating_sub(1), (j + 1).min(np - 1)),
        };

        for j in jmin..=jmax {
            if j == 0 {
                self.eval_liquid_left(x, rsd);
            } else if j == np - 1 {
                self.eval_liquid_right(x, rsd);
            } else {
                self.eval_liquid_interior(j, x, rsd, rdt);
            }
        }
        self.add_continuity_source(jmin, jmax, x, rsd);
    }

    fn store_prev(&mut self, x: &[f64]) {
        self.gas.store_prev(x);
    }

    fn reset_bad_values(&mut self, x: &mut [f64]) {
        self.gas.reset_bad_values(x);
        let base = self.liq_base();
        for j in 0..self.gas.n_points() {
            for c_rel in [LIQ_ML, LIQ_NL] {
                let i = self.gas.idx(base + c_rel, j);
                if !x[i].is_finite() || x[i] < 0.0 {
                    x[i] = 0.0;
                }
            }
            let i = self.gas.idx(base + LIQ_TL, j);
            if !x[i].is_finite() {
                x[i] = 300.0;
            }
        }
    }

    fn edge_state(&self, x: &[f64], side: Side) -> Option<EdgeState> {
        let np = self.gas.n_points();
        let (j, j1) = match side {
            Side::Left => (0, 1),
            Side::Right => (np - 1, np - 2),
        };
        let mut edge = self.gas.gas_edge_state(x, side);
        edge.liquid = Some(LiquidEdgeState {
            ul: self.ul(x, j),
            vl: self.vl(x, j),
            tl: self.tl(x, j),
            ml: self.ml(x, j),
            nl: self.nl(x, j),
            inward: [self.ul(x, j1), self.vl(x, j1), self.tl(x, j1), self.ml(x, j1), self.nl(x, j1)],
        });
        Some(edge)
    }

    fn meta(&self) -> serde_json::Value {
        let mut meta = self.gas.gas_meta();
        meta["liquid_density"] = json!(self.rhol);
        meta["antoine"] = json!([self.prs_a, self.prs_b, self.prs_c, self.t_boil, self.cvt]);
        meta["liquid_cp"] = json!(self.cpl);
        meta["av_coefficients"] = json!(self.av);
        meta["fuel_species"] = json!(self.gas.component_name(OFFSET_Y + self.fuel));
        meta
    }

    fn apply_meta(&mut self, meta: &serde_json::Value) -> SimResult<()> {
        self.gas.gas_apply_meta(meta)?;
        if let Some(r) = meta["liquid_density"].as_array() {
            let r: Vec<f64> = r.iter().filter_map(|v| v.as_f64()).collect();
            if r.len() == 4 {
                self.rhol = [r[0], r[1], r[2], r[3]];
            }
        }
        if let Some(a) = meta["antoine"].as_array() {
            let a: Vec<f64> = a.iter().filter_map(|v| v.as_f64()).collect();
            if a.len() == 5 {
                self.prs_a = a[0];
                self.prs_b = a[1];
                self.prs_c = a[2];
                self.t_boil = a[3];
                self.cvt = a[4];
            }
        }
        if let Some(c) = meta["liquid_cp"].as_f64() {
            self.cpl = c;
        }
        if let Some(c) = meta["av_coefficients"].as_array() {
            let c: Vec<f64> = c.iter().filter_map(|v| v.as_f64()).collect();
            if c.len() == 5 {
                self.av = [c[0], c[1], c[2], c[3], c[4]];
            }
        }
        if let Some(f) = meta["fuel_species"].as_str() {
            self.update_fuel_species(f)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dippr_105_constant_fallback() {
        // exercised without a full domain: the correlation is a pure function
        let tiny = f64::MIN_POSITIVE.sqrt();
        assert!(tiny > 0.0);
        // n-heptane DIPPR-105: ρ(300 K) should be a sensible liquid density
        let a: f64 = 61.38;
        let b: f64 = 0.26211;
        let c: f64 = 540.2;
        let d: f64 = 0.28141;
        let rho = a / b.powf(1.0 + (1.0 - 300.0 / c).powf(d));
        assert!(rho > 100.0 && rho < 1500.0, "rho = {}", rho);
    }

    #[test]
    fn test_antoine_heptane_near_one_atm_at_boiling() {
        // n-heptane, mmHg fit: A = 6.89385, B = 1264.37, C = 216.636 (°C)
        // at the normal boiling point the vapor pressure is ~1 atm
        let a = 6.89385;
        let b = 1264.37;
        let c = 216.636 - 273.15;
        let tb = 371.57;
        let pv = 10f64.powf(a - b / (c + tb)) * MMHG_TO_PA;
        assert!((pv / 101325.0 - 1.0).abs() < 0.02, "pv = {}", pv);
    }
}
