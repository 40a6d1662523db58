//! Rust Breakup - optimized short/long-range splitting of periodic pair
//! interactions.
//!
//! A slowly decaying interaction such as 1/r is written as a short-ranged
//! real-space part plus a long-range part represented on a finite set of
//! reciprocal lattice vectors. The long-range part inside a cutoff radius is
//! expanded in a local radial basis whose coefficients come from a
//! degeneracy-weighted least-squares fit in k-space.

pub mod basis;
pub mod breakup;
pub mod error;
pub mod handler;
pub mod io;
pub mod kspace;
pub mod lattice;
pub mod potentials;

// Re-export commonly used types at crate root
pub use basis::{GaussLegendre, LpqhiBasis};
pub use breakup::{
    BreakupBasis, BreakupEngine, BreakupFit, ConstrainedLeastSquaresSolver, ShellDegeneracyBuilder,
    TargetFunction,
};
pub use error::{BreakupError, Result};
pub use handler::{periodic_energy, BreakupParams, EwaldHandler, LongRangeHandler, LongRangeSplit};
pub use io::{read_breakup_config, BreakupConfig, PotentialConfig};
pub use kspace::{KContainer, KPoint, StructureFactor};
pub use lattice::Lattice;
pub use potentials::{Coulomb, Yukawa};
