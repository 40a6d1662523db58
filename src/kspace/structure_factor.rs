//! Structure factors ρ_k = Σ_i q_i exp(i k·r_i) over a k-list.

use nalgebra::Vector3;
use num_complex::Complex64;

use crate::error::{BreakupError, Result};
use super::kcontainer::KContainer;

#[derive(Debug, Clone)]
pub struct StructureFactor {
    rhok: Vec<Complex64>,
}

impl StructureFactor {
    /// Structure factor of unit charges.
    pub fn new(kcontainer: &KContainer, positions: &[Vector3<f64>]) -> Self {
        let rhok = kcontainer
            .kpts()
            .iter()
            .map(|kp| {
                positions
                    .iter()
                    .map(|r| Complex64::from_polar(1.0, kp.cart.dot(r)))
                    .sum()
            })
            .collect();
        Self { rhok }
    }

    pub fn with_charges(
        kcontainer: &KContainer,
        positions: &[Vector3<f64>],
        charges: &[f64],
    ) -> Result<Self> {
        if charges.len() != positions.len() {
            return Err(BreakupError::DimensionMismatch {
                what: "charges",
                expected: positions.len(),
                found: charges.len(),
            });
        }
        let rhok = kcontainer
            .kpts()
            .iter()
            .map(|kp| {
                positions
                    .iter()
                    .zip(charges)
                    .map(|(r, &q)| Complex64::from_polar(q, kp.cart.dot(r)))
                    .sum()
            })
            .collect();
        Ok(Self { rhok })
    }

    pub fn rhok(&self) -> &[Complex64] {
        &self.rhok
    }
}
