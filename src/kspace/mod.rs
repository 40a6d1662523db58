//! Reciprocal space - k-vector enumeration and structure factors.

mod kcontainer;
mod structure_factor;

pub use kcontainer::{KContainer, KPoint, SHELL_RESOLUTION};
pub use structure_factor::StructureFactor;
