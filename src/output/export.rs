//! CSV export of solution profiles
//!
//! # Produced format
//!
//! One row per grid point, the axial coordinate first, then every component
//! of the chosen domain. The separator is `;` and values are written in
//! scientific notation, so the file loads without configuration in common
//! spreadsheet tools and plotting scripts:
//!
//! ```text
//! z (m);u;V;T;lambda;H2;O2;N2
//! 0.000000000000e0;1.2e-1;0e0;3.0e2;-5.1e1;2.8e-2;2.26e-1;7.45e-1
//! ...
//! ```
//!
//! Persistence proper (exact machine-precision save/restore) lives in
//! [`crate::output::save`]; this exporter is for external analysis only.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{SimError, SimResult};
use crate::physics::Domain;
use crate::solver::sim::Simulation;

/// Column separator
const SEP: char = ';';

impl Simulation {
    /// Writes domain `dom`'s grid and component profiles to a CSV file
    pub fn export_profiles_csv(&self, dom: usize, path: impl AsRef<Path>) -> SimResult<()> {
        if dom >= self.system().n_domains() {
            return Err(SimError::InvalidInput(format!("no domain {}", dom)));
        }
        let d = self.system().domain(dom);
        if d.n_components() == 0 {
            return Err(SimError::InvalidInput(format!(
                "domain {} carries no solution components",
                dom
            )));
        }

        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);

        // header
        let names: Vec<String> = (0..d.n_components()).map(|c| d.component_name(c)).collect();
        writeln!(w, "z (m){}{}", SEP, names.join(&SEP.to_string()))?;

        // one row per grid point
        for j in 0..d.n_points() {
            write!(w, "{:e}", d.grid().z(j))?;
            for c in 0..d.n_components() {
                let v = self.value(dom, c, j)?;
                write!(w, "{}{:e}", SEP, v)?;
            }
            writeln!(w)?;
        }
        w.flush()?;
        Ok(())
    }
}
