//! Short/long-range splits of periodic pair interactions and the energies
//! assembled from them.

mod ewald;
mod optimized;
mod traits;

use nalgebra::Vector3;

use crate::error::Result;
use crate::kspace::StructureFactor;
use crate::lattice::Lattice;

pub use ewald::EwaldHandler;
pub use optimized::{BreakupParams, LongRangeHandler, LR_DIM_CUTOFF};
pub use traits::LongRangeSplit;

/// Periodic interaction energy of charges `charges` at `positions` against a
/// neutralizing background.
///
/// The short-range sum runs over the 27 images nearest to each folded
/// displacement, so the short-range part must be negligible beyond them.
pub fn periodic_energy<S: LongRangeSplit + ?Sized>(
    split: &S,
    lattice: &Lattice,
    positions: &[Vector3<f64>],
    charges: &[f64],
) -> Result<f64> {
    let rhok = StructureFactor::with_charges(split.kcontainer(), positions, charges)?;

    let mut short_range = 0.0;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let d = lattice.minimum_image_distance(&positions[i], &positions[j]);
            let mut v = 0.0;
            for a in -1..=1 {
                for b in -1..=1 {
                    for c in -1..=1 {
                        let image = d + lattice.to_cartesian(&Vector3::new(a as f64, b as f64, c as f64));
                        let r = image.norm();
                        v += split.evaluate_short_range(r, 1.0 / r);
                    }
                }
            }
            short_range += charges[i] * charges[j] * v;
        }
    }

    let long_range = 0.5
        * split.evaluate_long_range(split.kcontainer().minus_k(), rhok.rhok(), rhok.rhok());
    let q2: f64 = charges.iter().map(|q| q * q).sum();
    let q: f64 = charges.iter().sum();
    let self_energy = -0.5 * q2 * split.lr_at_origin();
    let background = -0.5 * q * q * split.sr_k0();

    Ok(short_range + long_range + self_energy + background)
}
