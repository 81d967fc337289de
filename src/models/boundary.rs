//! Boundary domains: inlet, outlet, symmetry plane, surface
//!
//! A boundary domain occupies one grid point at the end of the domain chain
//! and imposes conditions on the **edge rows of its neighboring flow
//! domain** through the explicit [`BoundaryConnection`] contract: the
//! assembler hands it an [`EdgeState`] snapshot of the flow edge, and the
//! boundary answers with `(component, residual)` pairs that overwrite the
//! flow's default edge residuals.
//!
//! # Row placement
//!
//! The conventions match the well-posedness structure of the flow
//! equations:
//!
//! - A **left inlet** puts its mass-flux condition `ρu - ṁ = 0` on the Λ
//!   row (the left boundary row of the Λ-continuity chain) and prescribes
//!   V, T, and the species flux balance `ṁ(Y_in,k - Y_k) - j_k = 0`.
//! - A **right inlet** puts `ρu + ṁ = 0` on the U row (the closure of the
//!   continuity integration), since flow enters against the axis there.
//! - **Outlet / symmetry / surface** impose zero-gradient or zero-flux
//!   closures on the rows they own and leave the rest of the flow defaults
//!   in place.
//!
//! The excess-species row is never overridden: the flow always keeps the
//! algebraic Σ Y = 1 closure at both edges.
//!
//! # Unknowns
//!
//! An inlet carries two trivially-pinned unknowns (its mass flux and
//! temperature) so that saved solutions record the boundary operating
//! point; the other boundary domains carry none.

use std::any::Any;

use serde_json::json;

use crate::error::{SimError, SimResult};
use crate::models::flow::{OFFSET_L, OFFSET_T, OFFSET_U, OFFSET_V, OFFSET_Y};
use crate::physics::{
    BoundaryConnection, BoundaryResidual, Domain, DomainKind, EdgeState, Grid, Side,
};

// =================================================================================================
// Inlet
// =================================================================================================

/// Liquid-phase injection values for a spray inlet
#[derive(Debug, Clone, Copy)]
pub struct LiquidInlet {
    /// Liquid radial-strain velocity U_ℓ
    pub ul: f64,
    /// Liquid axial velocity v_ℓ
    pub vl: f64,
    /// Droplet temperature T_ℓ [K]
    pub tl: f64,
    /// Droplet mass m_ℓ [kg]
    pub ml: f64,
    /// Droplet number density n_ℓ [1/m³]
    pub nl: f64,
}

/// Inflow boundary with prescribed mass flux, temperature, and composition
pub struct Inlet {
    grid: Grid,
    nsp: usize,
    mdot: f64,
    temperature: f64,
    y_in: Vec<f64>,
    liquid: Option<LiquidInlet>,
}

impl Inlet {
    /// Creates an inlet for a phase with `nsp` species, positioned at `z`
    pub fn new(nsp: usize, z: f64) -> Self {
        let mut y_in = vec![0.0; nsp];
        if nsp > 0 {
            y_in[0] = 1.0;
        }
        Self {
            grid: Grid::point(z),
            nsp,
            mdot: 0.0,
            temperature: 300.0,
            y_in,
            liquid: None,
        }
    }

    /// Sets the inflow mass flux ṁ [kg/(m²·s)]
    pub fn set_mdot(&mut self, mdot: f64) {
        self.mdot = mdot;
    }

    /// The inflow mass flux ṁ [kg/(m²·s)]
    pub fn mdot(&self) -> f64 {
        self.mdot
    }

    /// Sets the inflow temperature [K]
    pub fn set_temperature(&mut self, t: f64) {
        self.temperature = t;
    }

    /// The inflow temperature [K]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Sets the inflow mass fractions (length `nsp`)
    pub fn set_mass_fractions(&mut self, y: &[f64]) -> SimResult<()> {
        if y.len() != self.nsp {
            return Err(SimError::InvalidInput(format!(
                "inlet composition needs {} mass fractions, got {}",
                self.nsp,
                y.len()
            )));
        }
        self.y_in.copy_from_slice(y);
        Ok(())
    }

    /// The inflow mass fractions
    pub fn mass_fractions(&self) -> &[f64] {
        &self.y_in
    }

    /// Attaches liquid-phase injection values (spray flames)
    pub fn set_liquid(&mut self, liquid: LiquidInlet) {
        self.liquid = Some(liquid);
    }
}

impl Domain for Inlet {
    fn kind(&self) -> DomainKind {
        DomainKind::Inlet
    }

    fn n_components(&self) -> usize {
        2
    }

    fn n_points(&self) -> usize {
        1
    }

    fn component_name(&self, c: usize) -> String {
        match c {
            0 => "mdot".to_string(),
            1 => "temperature".to_string(),
            _ => panic!("inlet has 2 components, asked for {}", c),
        }
    }

    fn component_index(&self, name: &str) -> Option<usize> {
        match name {
            "mdot" => Some(0),
            "temperature" => Some(1),
            _ => None,
        }
    }

    fn bounds(&self, c: usize) -> (f64, f64) {
        match c {
            0 => (-1e20, 1e20),
            _ => (200.0, 2e4),
        }
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
        x[0] = self.mdot;
        x[1] = self.temperature;
    }

    fn eval(&mut self, _jpt: Option<usize>, x: &[f64], rsd: &mut [f64], _rdt: f64) {
        // the unknowns are pinned to the prescribed operating point
        rsd[0] = x[0] - self.mdot;
        rsd[1] = x[1] - self.temperature;
    }

    fn as_boundary(&self) -> Option<&dyn BoundaryConnection> {
        Some(self)
    }

    fn meta(&self) -> serde_json::Value {
        json!({
            "mdot": self.mdot,
            "temperature": self.temperature,
            "mass_fractions": self.y_in,
            "liquid": self.liquid.map(|l| vec![l.ul, l.vl, l.tl, l.ml, l.nl]),
        })
    }

    fn apply_meta(&mut self, meta: &serde_json::Value) -> SimResult<()> {
        if meta.is_null() {
            return Ok(());
        }
        if let Some(m) = meta["mdot"].as_f64() {
            self.mdot = m;
        }
        if let Some(t) = meta["temperature"].as_f64() {
            self.temperature = t;
        }
        if let Some(y) = meta["mass_fractions"].as_array() {
            let y: Vec<f64> = y.iter().filter_map(|v| v.as_f64()).collect();
            self.set_mass_fractions(&y)?;
        }
        if let Some(l) = meta["liquid"].as_array() {
            let l: Vec<f64> = l.iter().filter_map(|v| v.as_f64()).collect();
            if l.len() == 5 {
                self.liquid = Some(LiquidInlet { ul: l[0], vl: l[1], tl: l[2], ml: l[3], nl: l[4] });
            }
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

impl BoundaryConnection for Inlet {
    fn edge_rows(&self, edge: &EdgeState) -> Vec<BoundaryResidual> {
        let mut rows = Vec::with_capacity(4 + self.nsp);

        rows.push(BoundaryResidual { comp: OFFSET_V, value: edge.v });
        rows.push(BoundaryResidual { comp: OFFSET_T, value: edge.t - self.temperature });

        // a free flame's mass flux is an eigenvalue pinned by the anchor;
        // the species balance then uses the flow's own ρu instead of ṁ
        let mdot = if edge.fixed_mdot { self.mdot } else { edge.rho_u };

        match edge.side {
            Side::Left => {
                // mass-flux condition on the Λ row, species flux balance
                // ṁ (Y_in - Y) - j_k = 0 on every non-excess species row
                if edge.fixed_mdot {
                    rows.push(BoundaryResidual { comp: OFFSET_L, value: edge.rho_u - self.mdot });
                }
                for k in 0..self.nsp {
                    if k == edge.excess {
                        continue;
                    }
                    rows.push(BoundaryResidual {
                        comp: OFFSET_Y + k,
                        value: mdot * self.y_in[k] - edge.rho_u * edge.y[k] - edge.diff_flux[k],
                    });
                }
            }
            Side::Right => {
                // flow enters against the axis: ρu = -ṁ, closing the
                // continuity integration on the U row
                if edge.fixed_mdot {
                    rows.push(BoundaryResidual { comp: OFFSET_U, value: edge.rho_u + self.mdot });
                }
                for k in 0..self.nsp {
                    if k == edge.excess {
                        continue;
                    }
                    rows.push(BoundaryResidual {
                        comp: OFFSET_Y + k,
                        value: mdot * self.y_in[k] + edge.rho_u * edge.y[k] + edge.diff_flux[k],
                    });
                }
            }
        }

        // droplet injection: Dirichlet rows on the liquid components
        if let (Some(liq), Some(le)) = (self.liquid.as_ref(), edge.liquid.as_ref()) {
            let base = OFFSET_Y + self.nsp;
            rows.push(BoundaryResidual { comp: base, value: le.ul - liq.ul });
            rows.push(BoundaryResidual { comp: base + 1, value: le.vl - liq.vl });
            rows.push(BoundaryResidual { comp: base + 2, value: le.tl - liq.tl });
            rows.push(BoundaryResidual { comp: base + 3, value: le.ml - liq.ml });
            rows.push(BoundaryResidual { comp: base + 4, value: le.nl - liq.nl });
        }

        rows
    }
}

// =================================================================================================
// Outlet
// =================================================================================================

/// Outflow boundary with zero-gradient closures
pub struct Outlet {
    grid: Grid,
    nsp: usize,
}

impl Outlet {
    /// Creates an outlet for a phase with `nsp` species, positioned at `z`
    pub fn new(nsp: usize, z: f64) -> Self {
        Self { grid: Grid::point(z), nsp }
    }
}

impl Domain for Outlet {
    fn kind(&self) -> DomainKind {
        DomainKind::Outlet
    }

    fn n_components(&self) -> usize {
        0
    }

    fn n_points(&self) -> usize {
        1
    }

    fn component_name(&self, c: usize) -> String {
        panic!("outlet has no components, asked for {}", c)
    }

    fn component_index(&self, _name: &str) -> Option<usize> {
        None
    }

    fn bounds(&self, _c: usize) -> (f64, f64) {
        (-1e20, 1e20)
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

    fn initial_solution(&self, _x: &mut [f64]) {}

    fn eval(&mut self, _jpt: Option<usize>, _x: &[f64], _rsd: &mut [f64], _rdt: f64) {}

    fn as_boundary(&self) -> Option<&dyn BoundaryConnection> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BoundaryConnection for Outlet {
    fn edge_rows(&self, edge: &EdgeState) -> Vec<BoundaryResidual> {
        let mut rows = Vec::with_capacity(2 + self.nsp);
        rows.push(BoundaryResidual { comp: OFFSET_T, value: edge.t - edge.t_in1 });
        for k in 0..self.nsp {
            if k == edge.excess {
                continue;
            }
            rows.push(BoundaryResidual { comp: OFFSET_Y + k, value: edge.y[k] - edge.y_in1[k] });
        }
        if edge.side == Side::Left {
            // left outlet: zero-gradient mass flux closes the Λ chain
            rows.push(BoundaryResidual { comp: OFFSET_L, value: edge.rho_u - edge.rho_u_in1 });
        }
        rows
    }
}

// =================================================================================================
// Symmetry
// =================================================================================================

/// Symmetry plane: zero axial velocity, zero-gradient scalars
pub struct Symmetry {
    grid: Grid,
    nsp: usize,
}

impl Symmetry {
    /// Creates a symmetry plane for a phase with `nsp` species at `z`
    pub fn new(nsp: usize, z: f64) -> Self {
        Self { grid: Grid::point(z), nsp }
    }
}

impl Domain for Symmetry {
    fn kind(&self) -> DomainKind {
        DomainKind::Symmetry
    }

    fn n_components(&self) -> usize {
        0
    }

    fn n_points(&self) -> usize {
        1
    }

    fn component_name(&self, c: usize) -> String {
        panic!("symmetry plane has no components, asked for {}", c)
    }

    fn component_index(&self, _name: &str) -> Option<usize> {
        None
    }

    fn bounds(&self, _c: usize) -> (f64, f64) {
        (-1e20, 1e20)
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

    fn initial_solution(&self, _x: &mut [f64]) {}

    fn eval(&mut self, _jpt: Option<usize>, _x: &[f64], _rsd: &mut [f64], _rdt: f64) {}

    fn as_boundary(&self) -> Option<&dyn BoundaryConnection> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BoundaryConnection for Symmetry {
    fn edge_rows(&self, edge: &EdgeState) -> Vec<BoundaryResidual> {
        let mut rows = Vec::with_capacity(3 + self.nsp);
        // u = 0 on the mass-flux row, zero-gradient V and scalars
        let flux_row = if edge.side == Side::Left { OFFSET_L } else { OFFSET_U };
        rows.push(BoundaryResidual { comp: flux_row, value: edge.rho_u });
        rows.push(BoundaryResidual { comp: OFFSET_V, value: edge.v - edge.v_in1 });
        rows.push(BoundaryResidual { comp: OFFSET_T, value: edge.t - edge.t_in1 });
        for k in 0..self.nsp {
            if k == edge.excess {
                continue;
            }
            rows.push(BoundaryResidual { comp: OFFSET_Y + k, value: edge.y[k] - edge.y_in1[k] });
        }
        rows
    }
}

// =================================================================================================
// Surface
// =================================================================================================

/// Inert solid surface: zero velocity, fixed temperature, zero species flux
pub struct Surface {
    grid: Grid,
    nsp: usize,
    temperature: f64,
}

impl Surface {
    /// Creates a surface for a phase with `nsp` species at `z`
    pub fn new(nsp: usize, z: f64) -> Self {
        Self { grid: Grid::point(z), nsp, temperature: 300.0 }
    }

    /// Sets the surface temperature [K]
    pub fn set_temperature(&mut self, t: f64) {
        self.temperature = t;
    }

    /// The surface temperature [K]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Domain for Surface {
    fn kind(&self) -> DomainKind {
        DomainKind::Surface
    }

    fn n_components(&self) -> usize {
        0
    }

    fn n_points(&self) -> usize {
        1
    }

    fn component_name(&self, c: usize) -> String {
        panic!("surface has no components, asked for {}", c)
    }

    fn component_index(&self, _name: &str) -> Option<usize> {
        None
    }

    fn bounds(&self, _c: usize) -> (f64, f64) {
        (-1e20, 1e20)
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

    fn initial_solution(&self, _x: &mut [f64]) {}

    fn eval(&mut self, _jpt: Option<usize>, _x: &[f64], _rsd: &mut [f64], _rdt: f64) {}

    fn as_boundary(&self) -> Option<&dyn BoundaryConnection> {
        Some(self)
    }

    fn meta(&self) -> serde_json::Value {
        json!({ "temperature": self.temperature })
    }

    fn apply_meta(&mut self, meta: &serde_json::Value) -> SimResult<()> {
        if let Some(t) = meta["temperature"].as_f64() {
            self.temperature = t;
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

impl BoundaryConnection for Surface {
    fn edge_rows(&self, edge: &EdgeState) -> Vec<BoundaryResidual> {
        let mut rows = Vec::with_capacity(3 + self.nsp);
        let flux_row = if edge.side == Side::Left { OFFSET_L } else { OFFSET_U };
        rows.push(BoundaryResidual { comp: flux_row, value: edge.rho_u });
        rows.push(BoundaryResidual { comp: OFFSET_V, value: edge.v });
        rows.push(BoundaryResidual { comp: OFFSET_T, value: edge.t - self.temperature });
        for k in 0..self.nsp {
            if k == edge.excess {
                continue;
            }
            // no species leaves or enters through an inert wall
            rows.push(BoundaryResidual { comp: OFFSET_Y + k, value: edge.diff_flux[k] });
        }
        rows
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(side: Side) -> EdgeState {
        EdgeState {
            side,
            rho: 1.2,
            rho_u: 0.6,
            rho_u_in1: 0.55,
            v: 0.01,
            v_in1: 0.02,
            t: 350.0,
            t_in1: 360.0,
            lambda: -5.0,
            lambda_in1: -5.0,
            y: vec![0.2, 0.8],
            y_in1: vec![0.25, 0.75],
            diff_flux: vec![1e-4, -1e-4],
            excess: 1,
            dz: 1e-3,
            fixed_mdot: true,
            liquid: None,
        }
    }

    #[test]
    fn test_left_inlet_rows() {
        let mut inlet = Inlet::new(2, 0.0);
        inlet.set_mdot(0.5);
        inlet.set_temperature(300.0);
        inlet.set_mass_fractions(&[0.3, 0.7]).unwrap();

        let rows = inlet.edge_rows(&edge(Side::Left));

        // V, T, Λ(mass flux), and one non-excess species row
        assert_eq!(rows.len(), 4);
        let lam = rows.iter().find(|r| r.comp == OFFSET_L).unwrap();
        assert!((lam.value - (0.6 - 0.5)).abs() < 1e-14);
        let t = rows.iter().find(|r| r.comp == OFFSET_T).unwrap();
        assert!((t.value - 50.0).abs() < 1e-12);
        // species 0: mdot*y_in - rho_u*y - flux
        let y0 = rows.iter().find(|r| r.comp == OFFSET_Y).unwrap();
        assert!((y0.value - (0.5 * 0.3 - 0.6 * 0.2 - 1e-4)).abs() < 1e-14);
        // the excess species row is never overridden
        assert!(rows.iter().all(|r| r.comp != OFFSET_Y + 1));
    }

    #[test]
    fn test_right_inlet_uses_u_row() {
        let mut inlet = Inlet::new(2, 0.02);
        inlet.set_mdot(0.4);
        let rows = inlet.edge_rows(&edge(Side::Right));
        let u = rows.iter().find(|r| r.comp == OFFSET_U).unwrap();
        assert!((u.value - (0.6 + 0.4)).abs() < 1e-14);
        assert!(rows.iter().all(|r| r.comp != OFFSET_L));
    }

    #[test]
    fn test_outlet_zero_gradient() {
        let outlet = Outlet::new(2, 0.02);
        let rows = outlet.edge_rows(&edge(Side::Right));
        let t = rows.iter().find(|r| r.comp == OFFSET_T).unwrap();
        assert!((t.value - (350.0 - 360.0)).abs() < 1e-14);
        let y0 = rows.iter().find(|r| r.comp == OFFSET_Y).unwrap();
        assert!((y0.value - (0.2 - 0.25)).abs() < 1e-14);
    }

    #[test]
    fn test_surface_blocks_species_flux() {
        let mut s = Surface::new(2, 0.02);
        s.set_temperature(500.0);
        let rows = s.edge_rows(&edge(Side::Right));
        let y0 = rows.iter().find(|r| r.comp == OFFSET_Y).unwrap();
        assert_eq!(y0.value, 1e-4);
        let t = rows.iter().find(|r| r.comp == OFFSET_T).unwrap();
        assert!((t.value - (350.0 - 500.0)).abs() < 1e-12);
    }

    #[test]
    fn test_inlet_composition_length_checked() {
        let mut inlet = Inlet::new(3, 0.0);
        assert!(inlet.set_mass_fractions(&[0.5, 0.5]).is_err());
        assert!(inlet.set_mass_fractions(&[0.2, 0.3, 0.5]).is_ok());
    }

    #[test]
    fn test_inlet_unknowns_are_pinned() {
        let mut inlet = Inlet::new(2, 0.0);
        inlet.set_mdot(0.25);
        inlet.set_temperature(400.0);

        let x = [0.25, 400.0];
        let mut rsd = [1.0, 1.0];
        inlet.eval(None, &x, &mut rsd, 0.0);
        assert_eq!(rsd, [0.0, 0.0]);
    }
}
