//! Pair interactions that can be split by the breakup.

mod coulomb;

pub use coulomb::{Coulomb, Yukawa};
