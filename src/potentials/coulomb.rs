use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::breakup::TargetFunction;

/// Bare Coulomb interaction 1/r.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coulomb;

impl TargetFunction for Coulomb {
    fn f(&self, _r: f64, rinv: f64) -> f64 {
        rinv
    }

    fn df(&self, _r: f64, rinv: f64) -> f64 {
        -rinv * rinv
    }

    fn fk(&self, k: f64, rc: f64) -> f64 {
        4.0 * PI * (k * rc).cos() / (k * k)
    }

    fn integrate_r2(&self, rc: f64) -> f64 {
        0.5 * rc * rc
    }
}

/// Screened Coulomb interaction e^{-κr}/r.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Yukawa {
    pub kappa: f64,
}

impl Yukawa {
    pub fn new(kappa: f64) -> Self {
        Self { kappa }
    }
}

impl TargetFunction for Yukawa {
    fn f(&self, r: f64, rinv: f64) -> f64 {
        (-self.kappa * r).exp() * rinv
    }

    fn df(&self, r: f64, rinv: f64) -> f64 {
        -(-self.kappa * r).exp() * (self.kappa * r + 1.0) * rinv * rinv
    }

    fn fk(&self, k: f64, rc: f64) -> f64 {
        let kappa = self.kappa;
        4.0 * PI / k * (-kappa * rc).exp() * (kappa * (k * rc).sin() + k * (k * rc).cos())
            / (kappa * kappa + k * k)
    }

    fn integrate_r2(&self, rc: f64) -> f64 {
        let kappa = self.kappa;
        (1.0 - (-kappa * rc).exp() * (1.0 + kappa * rc)) / (kappa * kappa)
    }
}
