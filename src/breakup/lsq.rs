//! Weighted linear least squares with optional fixed parameters.
//!
//! Minimizes Σ_k w_k (y_k - Σ_n C_kn t_n)² over the free entries of t. The
//! normal equations A t = b with A = Cᵀ W C, b = Cᵀ W y are solved through
//! the SVD of W^{1/2} C: its squared singular values are those of A, so the
//! regularization threshold applies to A while the factorization avoids
//! squaring the condition number.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{BreakupError, Result};

/// Singular values of A below this fraction of the largest are dropped.
pub const SVD_TOLERANCE: f64 = 1e-16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeastSquaresSolution {
    /// Directions projected out because their singular value was negligible.
    pub dropped_singular_values: usize,
    /// Number of parameters that were fitted.
    pub num_free: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ConstrainedLeastSquaresSolver {
    tolerance: f64,
}

impl Default for ConstrainedLeastSquaresSolver {
    fn default() -> Self {
        Self {
            tolerance: SVD_TOLERANCE,
        }
    }
}

impl ConstrainedLeastSquaresSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative threshold on the singular values of A.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Fit the entries of `t` flagged in `adjust`; the others are held at
    /// their current values.
    ///
    /// `design` is K×N, `weights` and `rhs` have length K, `t` and `adjust`
    /// length N.
    pub fn solve(
        &self,
        design: &DMatrix<f64>,
        weights: &[f64],
        rhs: &[f64],
        t: &mut [f64],
        adjust: &[bool],
    ) -> Result<LeastSquaresSolution> {
        let (nk, nbasis) = design.shape();
        check_len("weights", nk, weights.len())?;
        check_len("right-hand side", nk, rhs.len())?;
        check_len("coefficients", nbasis, t.len())?;
        check_len("adjust mask", nbasis, adjust.len())?;

        let free: Vec<usize> = (0..nbasis).filter(|&n| adjust[n]).collect();
        if free.is_empty() {
            return Err(BreakupError::AllParametersFixed);
        }

        let sqrt_w: Vec<f64> = weights.iter().map(|w| w.max(0.0).sqrt()).collect();

        // fixed columns move to the right-hand side
        let y = DVector::from_fn(nk, |k, _| {
            let fixed: f64 = (0..nbasis)
                .filter(|&n| !adjust[n])
                .map(|n| design[(k, n)] * t[n])
                .sum();
            sqrt_w[k] * (rhs[k] - fixed)
        });
        let reduced = DMatrix::from_fn(nk, free.len(), |k, m| sqrt_w[k] * design[(k, free[m])]);

        let svd = reduced.svd(true, true);
        let u = svd
            .u
            .ok_or_else(|| BreakupError::LinearAlgebra("SVD did not return U".into()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| BreakupError::LinearAlgebra("SVD did not return Vᵀ".into()))?;
        let s = svd.singular_values;

        let s_max = s.iter().cloned().fold(0.0, f64::max);
        // thresholding σ(A) = σ² against tolerance × σ_max(A)
        let cutoff = self.tolerance * s_max * s_max;

        let mut solution = DVector::zeros(free.len());
        let mut dropped = 0;
        for (i, &sigma) in s.iter().enumerate() {
            if sigma * sigma <= cutoff || sigma == 0.0 {
                dropped += 1;
                continue;
            }
            let coef = u.column(i).dot(&y) / sigma;
            solution += v_t.row(i).transpose() * coef;
        }
        // a short system (K < M) leaves M - K directions undetermined
        dropped += free.len().saturating_sub(s.len());

        for (m, &n) in free.iter().enumerate() {
            t[n] = solution[m];
        }

        debug!(
            "least squares: {} free of {} parameters, {} singular values dropped",
            free.len(),
            nbasis,
            dropped
        );

        Ok(LeastSquaresSolution {
            dropped_singular_values: dropped,
            num_free: free.len(),
        })
    }
}

/// A = Cᵀ W C and b = Cᵀ W y.
pub fn normal_equations(
    design: &DMatrix<f64>,
    weights: &[f64],
    rhs: &[f64],
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let (nk, nbasis) = design.shape();
    check_len("weights", nk, weights.len())?;
    check_len("right-hand side", nk, rhs.len())?;

    let mut a = DMatrix::zeros(nbasis, nbasis);
    let mut b = DVector::zeros(nbasis);
    for k in 0..nk {
        for l in 0..nbasis {
            let wc = weights[k] * design[(k, l)];
            b[l] += wc * rhs[k];
            for n in 0..nbasis {
                a[(l, n)] += wc * design[(k, n)];
            }
        }
    }
    Ok((a, b))
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(BreakupError::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
