//! Saving and restoring solutions
//!
//! # File format
//!
//! A solution file is a hierarchical JSON document holding any number of
//! named solutions; each solution holds one group per domain in chain
//! order:
//!
//! ```text
//! {
//!   "solutions": {
//!     "baseline": {
//!       "description": "converged phi=1 flame",
//!       "domains": [
//!         { "domain_type": "inlet", "grid": [...], "components": [...], "meta": {...} },
//!         { "domain_type": "axisymmetric-stagnation", ... },
//!         ...
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Every component vector is stored by name, and floats are written in
//! shortest-round-trip form, so a save/restore cycle reproduces the
//! solution and the grids to machine precision.
//!
//! Saving into an existing file merges: other solution ids are preserved.
//! Restoring checks the domain type tags — putting a free-flame group into
//! a counterflow domain is an error, not a silent corruption.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::physics::Domain;
use crate::solver::assembly::MultiDomain;
use crate::solver::sim::Simulation;

// =================================================================================================
// File schema
// =================================================================================================

/// Top-level solution file: named solutions
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SolutionFile {
    pub solutions: BTreeMap<String, SolutionGroup>,
}

/// One saved solution: a description and one group per domain
#[derive(Debug, Serialize, Deserialize)]
pub struct SolutionGroup {
    pub description: String,
    pub domains: Vec<DomainGroup>,
}

/// One domain's grid, component vectors, and metadata block
#[derive(Debug, Serialize, Deserialize)]
pub struct DomainGroup {
    pub domain_type: String,
    pub grid: Vec<f64>,
    pub components: Vec<ComponentColumn>,
    pub meta: serde_json::Value,
}

/// One named component vector (length = number of grid points)
#[derive(Debug, Serialize, Deserialize)]
pub struct ComponentColumn {
    pub name: String,
    pub values: Vec<f64>,
}

// =================================================================================================
// Writing
// =================================================================================================

/// Captures the current state of the chain into per-domain groups
fn capture(sys: &MultiDomain, x: &[f64]) -> Vec<DomainGroup> {
    let mut groups = Vec::with_capacity(sys.n_domains());
    for d in 0..sys.n_domains() {
        let dom = sys.domain(d);
        let nc = dom.n_components();
        let np = dom.n_points();
        let components = (0..nc)
            .map(|c| ComponentColumn {
                name: dom.component_name(c),
                values: (0..np).map(|j| x[sys.index(d, c, j)]).collect(),
            })
            .collect();
        groups.push(DomainGroup {
            domain_type: dom.kind().label().to_string(),
            grid: dom.grid().points().to_vec(),
            components,
            meta: dom.meta(),
        });
    }
    groups
}

/// Reads an existing solution file, or an empty one if the path is new
fn read_file(path: &Path) -> SimResult<SolutionFile> {
    if !path.exists() {
        return Ok(SolutionFile::default());
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Saves a vector (the solution or a residual snapshot) under `id`
fn write_groups(
    path: &Path,
    id: &str,
    description: &str,
    groups: Vec<DomainGroup>,
    loglevel: u8,
) -> SimResult<()> {
    let mut file = read_file(path)?;
    let replaced = file
        .solutions
        .insert(id.to_string(), SolutionGroup { description: description.to_string(), domains: groups })
        .is_some();
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    if loglevel > 0 {
        info!(
            "{} solution '{}' in {}",
            if replaced { "replaced" } else { "saved" },
            id,
            path.display()
        );
    }
    Ok(())
}

// =================================================================================================
// Simulation surface
// =================================================================================================

impl Simulation {
    /// Saves the current solution under `id` in `path`, merging with any
    /// solutions already in the file
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        id: &str,
        description: &str,
        loglevel: u8,
    ) -> SimResult<()> {
        let groups = capture(&self.sys, self.solution());
        write_groups(path.as_ref(), id, description, groups, loglevel)
    }

    /// Saves the current steady residual vector under `id` in `path`
    ///
    /// Useful for inspecting which equations a stalled solve cannot
    /// satisfy.
    pub fn save_residual(
        &mut self,
        path: impl AsRef<Path>,
        id: &str,
        description: &str,
        loglevel: u8,
    ) -> SimResult<()> {
        let mut resid = vec![0.0; self.system_size()];
        self.get_residual(0.0, &mut resid)?;
        let groups = capture(&self.sys, &resid);
        write_groups(path.as_ref(), id, description, groups, loglevel)
    }

    /// Restores the solution saved under `id` in `path`
    ///
    /// Domains are resized to the saved grids, component vectors are matched
    /// by name, and metadata blocks are re-applied.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidInput`] when the id is missing, the group count
    /// does not match the chain, a domain type tag differs, or a component
    /// is absent.
    pub fn restore(&mut self, path: impl AsRef<Path>, id: &str, loglevel: u8) -> SimResult<()> {
        let file = read_file(path.as_ref())?;
        let group = file.solutions.get(id).ok_or_else(|| {
            SimError::InvalidInput(format!("no solution '{}' in {}", id, path.as_ref().display()))
        })?;
        if group.domains.len() != self.sys.n_domains() {
            return Err(SimError::InvalidInput(format!(
                "saved solution has {} domains, simulation has {}",
                group.domains.len(),
                self.sys.n_domains()
            )));
        }

        // type tags first: fail before touching anything
        for (d, g) in group.domains.iter().enumerate() {
            let expect = self.sys.domain(d).kind().label();
            if g.domain_type != expect {
                return Err(SimError::InvalidInput(format!(
                    "domain {} type mismatch: file has '{}', simulation has '{}'",
                    d, g.domain_type, expect
                )));
            }
        }

        for (d, g) in group.domains.iter().enumerate() {
            self.sys.domain_mut(d).resize(&g.grid);
            self.sys.domain_mut(d).apply_meta(&g.meta)?;
        }
        self.sys.rebuild();

        let mut x = vec![0.0; self.sys.size()];
        for (d, g) in group.domains.iter().enumerate() {
            let dom = self.sys.domain(d);
            for c in 0..dom.n_components() {
                let name = dom.component_name(c);
                let col = g.components.iter().find(|col| col.name == name).ok_or_else(|| {
                    SimError::InvalidInput(format!(
                        "saved domain {} has no component '{}'",
                        d, name
                    ))
                })?;
                if col.values.len() != dom.n_points() {
                    return Err(SimError::InvalidInput(format!(
                        "component '{}' in domain {} has {} values for {} points",
                        name,
                        d,
                        col.values.len(),
                        dom.n_points()
                    )));
                }
                for (j, v) in col.values.iter().enumerate() {
                    x[self.sys.index(d, c, j)] = *v;
                }
            }
        }
        self.adopt_restored_solution(x);
        if loglevel > 0 {
            info!("restored solution '{}' from {}", id, path.as_ref().display());
        }
        Ok(())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_schema_round_trips_floats_exactly() {
        let mut file = SolutionFile::default();
        file.solutions.insert(
            "a".into(),
            SolutionGroup {
                description: "test".into(),
                domains: vec![DomainGroup {
                    domain_type: "inlet".into(),
                    grid: vec![0.0, 0.1 + 1e-17, std::f64::consts::PI],
                    components: vec![ComponentColumn {
                        name: "T".into(),
                        values: vec![300.0, 1234.567890123456789, 5e-324],
                    }],
                    meta: serde_json::Value::Null,
                }],
            },
        );
        let text = serde_json::to_string(&file).unwrap();
        let back: SolutionFile = serde_json::from_str(&text).unwrap();
        let g = &back.solutions["a"].domains[0];
        assert_eq!(g.grid, file.solutions["a"].domains[0].grid);
        assert_eq!(g.components[0].values, file.solutions["a"].domains[0].components[0].values);
    }
}
