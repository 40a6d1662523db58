//! Locally piecewise quintic Hermite interpolants.
//!
//! M equally spaced knots r_j = jΔ on [0, rc] carry three elements each,
//! matching value, slope and curvature; element n = 3j + α is non-zero only
//! on [r_{j-1}, r_{j+1}]. Any quintic on a knot interval is reproduced
//! exactly, and Σ_j h_{3j}(r) = 1 on [0, rc].

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::breakup::BreakupBasis;
use crate::error::{BreakupError, Result};
use super::quadrature::GaussLegendre;

/// Shape polynomials S_α(u) on [0, 1], coefficients of u⁰..u⁵.
const SHAPE: [[f64; 6]; 3] = [
    [1.0, 0.0, 0.0, -10.0, 15.0, -6.0],
    [0.0, 1.0, 0.0, -6.0, 8.0, -3.0],
    [0.0, 0.0, 0.5, -1.5, 1.5, -0.5],
];

/// Below this |kΔ| the element integrals are done by quadrature.
const ANALYTIC_THRESHOLD: f64 = 4.0;

const NUM_QUADRATURE_POINTS: usize = 20;

#[derive(Debug, Clone)]
pub struct LpqhiBasis {
    num_knots: usize,
    rc: f64,
    delta: f64,
    quadrature: GaussLegendre,
}

impl LpqhiBasis {
    pub fn new(rc: f64, num_knots: usize) -> Result<Self> {
        if !rc.is_finite() || rc <= 0.0 {
            return Err(BreakupError::InvalidCutoff(format!(
                "basis cutoff must be positive, got {rc}"
            )));
        }
        if num_knots < 2 {
            return Err(BreakupError::DegenerateLattice(format!(
                "LPQHI basis needs at least two knots, got {num_knots}"
            )));
        }
        Ok(Self {
            num_knots,
            rc,
            delta: rc / (num_knots - 1) as f64,
            quadrature: GaussLegendre::new(NUM_QUADRATURE_POINTS).reseat(0.0, 1.0),
        })
    }

    pub fn num_knots(&self) -> usize {
        self.num_knots
    }

    /// Knot spacing Δ.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// r_j = jΔ; the last knot is rc itself.
    pub fn knot(&self, j: usize) -> f64 {
        if j + 1 == self.num_knots {
            self.rc
        } else {
            j as f64 * self.delta
        }
    }

    /// Knot interval [r_i, r_{i+1}] holding r and the offset u ∈ [0, 1]
    /// within it. rc itself is the far end of the last interval.
    fn locate(&self, r: f64) -> Option<(usize, f64)> {
        if !(0.0..=self.rc).contains(&r) {
            return None;
        }
        let last = self.num_knots - 2;
        if r >= self.rc {
            return Some((last, 1.0));
        }
        let i = ((r / self.delta).floor() as usize).min(last);
        let u = ((r - self.knot(i)) / self.delta).clamp(0.0, 1.0);
        Some((i, u))
    }

    /// Element integrals ∫_0^1 r(u) S_α(u) sin(k r(u)) du, with r(u) = r_j + sΔu,
    /// summed over the elements around knot j with their parity signs. At
    /// k = 0 sin(kr)/k is replaced by r, and the result is already divided by k.
    fn element_sum(&self, j: usize, alpha: usize, k: f64) -> f64 {
        let rj = self.knot(j);
        let parity = if alpha % 2 == 0 { 1.0 } else { -1.0 };
        let mut total = 0.0;
        // (direction along r, sign of the element)
        let mut sides = Vec::with_capacity(2);
        if j + 1 < self.num_knots {
            sides.push((1.0, 1.0));
        }
        if j > 0 {
            sides.push((-1.0, parity));
        }
        for (dir, sign) in sides {
            let integral = if (k * self.delta).abs() < ANALYTIC_THRESHOLD {
                self.quadrature.integrate(|u| {
                    let r = rj + dir * self.delta * u;
                    let sinc = if k == 0.0 { r } else { (k * r).sin() / k };
                    r * shape(alpha, u) * sinc
                })
            } else {
                analytic_element(rj, dir * self.delta, alpha, k) / k
            };
            total += sign * integral;
        }
        total
    }
}

impl BreakupBasis for LpqhiBasis {
    fn num_basis_elem(&self) -> usize {
        3 * self.num_knots
    }

    fn cutoff(&self) -> f64 {
        self.rc
    }

    fn h(&self, n: usize, r: f64) -> f64 {
        let (j, alpha) = (n / 3, n % 3);
        let Some((i, u)) = self.locate(r) else {
            return 0.0;
        };
        let scale = self.delta.powi(alpha as i32);
        if j == i {
            scale * shape(alpha, u)
        } else if j == i + 1 {
            let parity = if alpha % 2 == 0 { 1.0 } else { -1.0 };
            parity * scale * shape(alpha, 1.0 - u)
        } else {
            0.0
        }
    }

    fn dh(&self, n: usize, r: f64) -> f64 {
        let (j, alpha) = (n / 3, n % 3);
        let Some((i, u)) = self.locate(r) else {
            return 0.0;
        };
        let scale = self.delta.powi(alpha as i32 - 1);
        if j == i {
            scale * shape_derivative(alpha, u)
        } else if j == i + 1 {
            let parity = if alpha % 2 == 0 { 1.0 } else { -1.0 };
            -parity * scale * shape_derivative(alpha, 1.0 - u)
        } else {
            0.0
        }
    }

    fn c(&self, n: usize, k: f64) -> f64 {
        let (j, alpha) = (n / 3, n % 3);
        let scale = self.delta.powi(alpha as i32 + 1);
        4.0 * PI * scale * self.element_sum(j, alpha, k)
    }

    fn cutoff_element(&self) -> Option<usize> {
        Some(3 * (self.num_knots - 1))
    }
}

fn shape(alpha: usize, u: f64) -> f64 {
    SHAPE[alpha].iter().rev().fold(0.0, |acc, &c| acc * u + c)
}

fn shape_derivative(alpha: usize, u: f64) -> f64 {
    SHAPE[alpha]
        .iter()
        .enumerate()
        .skip(1)
        .rev()
        .fold(0.0, |acc, (p, &c)| acc * u + p as f64 * c)
}

/// ∫_0^1 q(u) sin(k rj + k d u) du for q(u) = (rj + d u) S_α(u), by repeated
/// integration by parts of the complex exponential.
fn analytic_element(rj: f64, d: f64, alpha: usize, k: f64) -> f64 {
    // q = (rj + d u) S_α, degree 6
    let mut q = [0.0; 7];
    for (p, &c) in SHAPE[alpha].iter().enumerate() {
        q[p] += rj * c;
        q[p + 1] += d * c;
    }

    let kappa = k * d;
    let ikappa = Complex64::new(0.0, kappa);
    let antiderivative = |u: f64| -> Complex64 {
        let mut deriv = q.to_vec();
        let mut sum = Complex64::new(0.0, 0.0);
        let mut denom = ikappa;
        let mut sign = 1.0;
        while !deriv.is_empty() {
            let value = deriv.iter().rev().fold(0.0, |acc, &c| acc * u + c);
            sum += sign * value / denom;
            denom *= ikappa;
            sign = -sign;
            deriv = deriv
                .iter()
                .enumerate()
                .skip(1)
                .map(|(p, &c)| p as f64 * c)
                .collect();
        }
        Complex64::from_polar(1.0, kappa * u) * sum
    };

    let phase = Complex64::from_polar(1.0, k * rj);
    (phase * (antiderivative(1.0) - antiderivative(0.0))).im
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// (4π/k) ∫_0^rc r sin(kr) h_n(r) dr on a fine composite Gauss rule.
    fn brute_force_c(basis: &LpqhiBasis, n: usize, k: f64) -> f64 {
        let pieces = 400;
        let rule = GaussLegendre::new(20);
        let width = basis.cutoff() / pieces as f64;
        let mut total = 0.0;
        for p in 0..pieces {
            let a = p as f64 * width;
            let sub = rule.reseat(a, a + width);
            total += sub.integrate(|r| {
                let sinc = if k == 0.0 { r } else { (k * r).sin() / k };
                r * sinc * basis.h(n, r)
            });
        }
        4.0 * PI * total
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(LpqhiBasis::new(0.0, 10), Err(BreakupError::InvalidCutoff(_))));
        assert!(matches!(LpqhiBasis::new(2.0, 1), Err(BreakupError::DegenerateLattice(_))));
    }

    #[test]
    fn test_knot_values() {
        let basis = LpqhiBasis::new(2.0, 9).unwrap();
        assert_eq!(basis.num_basis_elem(), 27);
        for j in 0..9 {
            let rj = basis.knot(j);
            for m in 0..9 {
                let expected = if m == j { 1.0 } else { 0.0 };
                assert_relative_eq!(basis.h(3 * m, rj), expected, epsilon = 1e-14);
                assert_relative_eq!(basis.h(3 * m + 1, rj), 0.0, epsilon = 1e-14);
                assert_relative_eq!(basis.h(3 * m + 2, rj), 0.0, epsilon = 1e-14);
            }
        }
        // only the last value element survives at rc
        let nonzero: Vec<usize> = (0..27).filter(|&n| basis.h(n, 2.0) != 0.0).collect();
        assert_eq!(nonzero, vec![24]);
        assert_eq!(basis.h(24, 2.0 + 1e-9), 0.0);
    }

    #[test]
    fn test_single_element_at_cutoff() {
        for rc in [0.7, 1.0, 1.7, 1.9, 2.0, 2.3, 2.5, 3.0, 3.1] {
            for num_knots in 2..40 {
                let basis = LpqhiBasis::new(rc, num_knots).unwrap();
                let last = basis.cutoff_element().unwrap();
                assert_eq!(last, 3 * (num_knots - 1));
                assert_eq!(basis.knot(num_knots - 1), rc);

                let nonzero: Vec<usize> = (0..basis.num_basis_elem()).filter(|&n| basis.h(n, rc) != 0.0).collect();
                assert_eq!(nonzero, vec![last], "rc = {rc}, {num_knots} knots");
                assert_eq!(basis.h(last, rc), 1.0);
                for n in 0..basis.num_basis_elem() {
                    assert_eq!(basis.dh(n, rc), if n == last + 1 { 1.0 } else { 0.0 });
                }
            }
        }
    }

    #[test]
    fn test_partition_of_unity() {
        let basis = LpqhiBasis::new(3.0, 12).unwrap();
        for i in 0..=300 {
            let r = 3.0 * i as f64 / 300.0;
            let sum: f64 = (0..12).map(|j| basis.h(3 * j, r)).sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_reproduces_quintic() {
        let basis = LpqhiBasis::new(2.0, 6).unwrap();
        let p = |r: f64| 0.5 - r + r * r + 0.3 * r.powi(3) - 0.1 * r.powi(5);
        let dp = |r: f64| -1.0 + 2.0 * r + 0.9 * r * r - 0.5 * r.powi(4);
        let d2p = |r: f64| 2.0 + 1.8 * r - 2.0 * r.powi(3);

        let mut t = vec![0.0; basis.num_basis_elem()];
        for j in 0..basis.num_knots() {
            let rj = basis.knot(j);
            t[3 * j] = p(rj);
            t[3 * j + 1] = dp(rj);
            t[3 * j + 2] = d2p(rj);
        }
        for i in 0..=200 {
            let r = 2.0 * i as f64 / 200.0;
            let value: f64 = t.iter().enumerate().map(|(n, tn)| tn * basis.h(n, r)).sum();
            let slope: f64 = t.iter().enumerate().map(|(n, tn)| tn * basis.dh(n, r)).sum();
            assert_relative_eq!(value, p(r), epsilon = 1e-12);
            assert_relative_eq!(slope, dp(r), epsilon = 1e-11);
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let basis = LpqhiBasis::new(2.0, 7).unwrap();
        let eps = 1e-6;
        for n in [0, 1, 2, 9, 10, 11, 18, 19, 20] {
            for i in 1..40 {
                let r = i as f64 * 0.0497;
                let fd = (basis.h(n, r + eps) - basis.h(n, r - eps)) / (2.0 * eps);
                assert_relative_eq!(basis.dh(n, r), fd, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_transform_matches_brute_force() {
        let basis = LpqhiBasis::new(2.0, 11).unwrap();
        let delta = basis.delta();
        // both the quadrature and the analytic branch
        let ks = [0.0, 0.3, 2.0, 3.9 / delta, 4.1 / delta, 60.0, 250.0];
        for n in [0, 1, 2, 13, 14, 15, 30, 31, 32] {
            for &k in &ks {
                let expected = brute_force_c(&basis, n, k);
                let scale = 4.0 * PI * delta.powi(n as i32 % 3 + 1) * 4.0;
                assert!(
                    (basis.c(n, k) - expected).abs() <= 1e-10 * scale,
                    "n = {n}, k = {k}: {} vs {expected}",
                    basis.c(n, k)
                );
            }
        }
    }

    #[test]
    fn test_transform_continuous_across_threshold() {
        let basis = LpqhiBasis::new(1.5, 8).unwrap();
        let k = ANALYTIC_THRESHOLD / basis.delta();
        for n in 0..basis.num_basis_elem() {
            let below = basis.c(n, k * (1.0 - 1e-12));
            let above = basis.c(n, k);
            assert_relative_eq!(below, above, epsilon = 1e-10, max_relative = 1e-8);
        }
    }
}
