//! Error type shared by the k-space, breakup and handler modules.

use thiserror::Error;

/// Errors raised while setting up or solving a long-range breakup.
///
/// Rank deficiency of the fit is not an error: it is reported through
/// [`crate::breakup::BreakupFit::dropped_singular_values`].
#[derive(Debug, Error)]
pub enum BreakupError {
    #[error("invalid cutoff: {0}")]
    InvalidCutoff(String),

    #[error("degenerate lattice or basis: {0}")]
    DegenerateLattice(String),

    #[error("constrained breakup has no free parameters")]
    AllParametersFixed,

    #[error("breakup k-vectors have not been set up")]
    NotInitialized,

    #[error("{what}: expected length {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("linear algebra error: {0}")]
    LinearAlgebra(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BreakupError>;
