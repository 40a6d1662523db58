//! Gauss-Legendre quadrature.

use std::f64::consts::PI;

/// n-point Gauss-Legendre rule on [a, b], exact for polynomials of degree
/// 2n - 1.
#[derive(Debug, Clone)]
pub struct GaussLegendre {
    /// Nodes in increasing order.
    pub x: Vec<f64>,
    pub w: Vec<f64>,
    pub a: f64,
    pub b: f64,
}

impl GaussLegendre {
    /// Rule on [-1, 1].
    pub fn new(n: usize) -> Self {
        let (x, w) = nodes_and_weights(n);
        Self { x, w, a: -1.0, b: 1.0 }
    }

    /// The same rule mapped onto [a, b].
    pub fn reseat(&self, a: f64, b: f64) -> Self {
        let scaling = (b - a) / (self.b - self.a);
        let mid_old = 0.5 * (self.a + self.b);
        let mid_new = 0.5 * (a + b);
        Self {
            x: self.x.iter().map(|&xi| scaling * (xi - mid_old) + mid_new).collect(),
            w: self.w.iter().map(|&wi| wi * scaling).collect(),
            a,
            b,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.x.iter().zip(&self.w).map(|(&x, &w)| w * f(x)).sum()
    }
}

fn nodes_and_weights(n: usize) -> (Vec<f64>, Vec<f64>) {
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];

    // roots come in ± pairs; find the positive half by Newton iteration
    for i in 0..n.div_ceil(2) {
        let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, dp) = legendre_and_derivative(n, z);
            let step = p / dp;
            z -= step;
            if step.abs() < 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre_and_derivative(n, z);
        let weight = 2.0 / ((1.0 - z * z) * dp * dp);

        x[i] = -z;
        w[i] = weight;
        x[n - 1 - i] = z;
        w[n - 1 - i] = weight;
    }
    if n % 2 == 1 {
        x[n / 2] = 0.0;
    }
    (x, w)
}

/// P_n(x) and P_n'(x) by the three-term recurrence.
fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    // P_n' = n (x P_n - P_{n-1}) / (x² - 1)
    let dp = n as f64 * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}
