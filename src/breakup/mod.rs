//! Optimized breakup: fit of a radial basis to the long-range part of an
//! interaction over a degeneracy-weighted list of |k|.

mod degeneracy;
mod engine;
mod lsq;
mod traits;

pub use degeneracy::{
    BreakupKList, BreakupKPoint, DegeneracyMeasure, ExactShellMeasure, ShellDegeneracyBuilder,
    VolumetricMeasure, MERGE_TOLERANCE, NUM_CONTINUUM_SHELLS,
};
pub use engine::{BreakupEngine, BreakupFit};
pub use lsq::{normal_equations, ConstrainedLeastSquaresSolver, LeastSquaresSolution, SVD_TOLERANCE};
pub use traits::{BreakupBasis, TargetFunction};
