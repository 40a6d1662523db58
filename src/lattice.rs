//! Periodic simulation cell.
//!
//! Primitive vectors are stored as the rows of `lattice_vector`, reciprocal
//! vectors as the rows of `reciprocal_vector`, with a_i · b_j = 2π δ_ij.

use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

use crate::error::{BreakupError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub lattice_vector: Matrix3<f64>,
    pub reciprocal_vector: Matrix3<f64>,
    volume: f64,
}

impl Lattice {
    /// Build a lattice from a matrix whose rows are the primitive vectors.
    pub fn new(lattice_vector: Matrix3<f64>) -> Result<Self> {
        let det = lattice_vector.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return Err(BreakupError::DegenerateLattice(format!(
                "cell volume {det:e} is zero or not finite"
            )));
        }
        let inverse = lattice_vector.try_inverse().ok_or_else(|| {
            BreakupError::DegenerateLattice("lattice matrix is not invertible".into())
        })?;
        let reciprocal_vector = 2.0 * PI * inverse.transpose();

        Ok(Self {
            lattice_vector,
            reciprocal_vector,
            volume: det.abs(),
        })
    }

    pub fn from_rows(rows: &[[f64; 3]; 3]) -> Result<Self> {
        Self::new(Matrix3::from_fn(|i, j| rows[i][j]))
    }

    pub fn cubic(l: f64) -> Result<Self> {
        Self::new(Matrix3::from_diagonal_element(l))
    }

    pub fn new_bcc(a: f64) -> Result<Self> {
        Self::new(Matrix3::new(
            -a / 2.0, a / 2.0, a / 2.0,
            a / 2.0, -a / 2.0, a / 2.0,
            a / 2.0, a / 2.0, -a / 2.0,
        ))
    }

    pub fn new_fcc(a: f64) -> Result<Self> {
        Self::new(Matrix3::new(
            0.0, a / 2.0, a / 2.0,
            a / 2.0, 0.0, a / 2.0,
            a / 2.0, a / 2.0, 0.0,
        ))
    }

    /// Primitive vector `i`.
    pub fn a(&self, i: usize) -> Vector3<f64> {
        self.lattice_vector.row(i).transpose()
    }

    /// Reciprocal vector `i`.
    pub fn b(&self, i: usize) -> Vector3<f64> {
        self.reciprocal_vector.row(i).transpose()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Radius of the sphere with the same volume as the cell.
    pub fn wigner_seitz_radius(&self) -> f64 {
        (3.0 * self.volume / (4.0 * PI)).cbrt()
    }

    /// Half the shortest non-zero lattice translation, searched over
    /// combinations with coefficients in {-1, 0, 1}.
    ///
    /// A pair potential cut off at this radius sees at most one image of
    /// each particle, which is the default real-space cutoff for a breakup.
    pub fn simulation_cell_radius(&self) -> f64 {
        let mut shortest = f64::MAX;
        for i in -1..=1 {
            for j in -1..=1 {
                for k in -1..=1 {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let t = self.to_cartesian(&Vector3::new(i as f64, j as f64, k as f64));
                    shortest = shortest.min(t.norm());
                }
            }
        }
        0.5 * shortest
    }

    /// Cartesian k-vector Σ n_i b_i for an integer multi-index.
    pub fn k_cart(&self, n: &[i32; 3]) -> Vector3<f64> {
        self.reciprocal_vector.transpose()
            * Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64)
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.lattice_vector.transpose() * frac
    }

    pub fn to_fractional(&self, cart: &Vector3<f64>) -> Vector3<f64> {
        self.reciprocal_vector * cart / (2.0 * PI)
    }

    /// Displacement r1 - r2 folded back by the nearest lattice translation.
    pub fn minimum_image_distance(&self, r1: &Vector3<f64>, r2: &Vector3<f64>) -> Vector3<f64> {
        let frac = self.to_fractional(&(r1 - r2));
        self.to_cartesian(&frac.map(|x| x - x.round()))
    }
}
