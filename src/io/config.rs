//! YAML configuration for a single breakup run.
//!
//! ```yaml
//! lattice:
//!   - [4.0, 0.0, 0.0]
//!   - [0.0, 4.0, 0.0]
//!   - [0.0, 0.0, 4.0]
//! potential:
//!   kind: Yukawa
//!   kappa: 0.5
//! num_knots: 15
//! rc: 2.0
//! breakup:
//!   kc: 10.0
//!   match_at_cutoff: true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handler::BreakupParams;
use crate::lattice::Lattice;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PotentialConfig {
    #[default]
    Coulomb,
    Yukawa {
        kappa: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakupConfig {
    /// Lattice vectors as rows.
    pub lattice: [[f64; 3]; 3],
    #[serde(default)]
    pub potential: PotentialConfig,
    #[serde(default = "default_num_knots")]
    pub num_knots: usize,
    /// Real-space cutoff; the simulation-cell radius when absent.
    #[serde(default)]
    pub rc: Option<f64>,
    #[serde(default)]
    pub breakup: BreakupParams,
}

fn default_num_knots() -> usize {
    15
}

impl BreakupConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn lattice(&self) -> Result<Lattice> {
        Lattice::from_rows(&self.lattice)
    }

    pub fn rc(&self, lattice: &Lattice) -> f64 {
        self.rc.unwrap_or_else(|| lattice.simulation_cell_radius())
    }
}

/// Read a [`BreakupConfig`] from a YAML file.
pub fn read_breakup_config(filename: &str) -> Result<BreakupConfig> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    Ok(serde_yaml::from_reader(reader)?)
}
