use std::f64::consts::PI;

use log::info;
use nalgebra::Vector3;
use statrs::function::erf::erfc;

use crate::error::{BreakupError, Result};
use crate::kspace::KContainer;
use crate::lattice::Lattice;
use super::traits::LongRangeSplit;

/// Gaussian (Ewald) split of the Coulomb interaction,
/// 1/r = erfc(αr)/r + erf(αr)/r.
#[derive(Debug, Clone)]
pub struct EwaldHandler {
    lattice: Lattice,
    alpha: f64,
    rc: f64,
    kcontainer: KContainer,
    fk: Vec<f64>,
}

impl EwaldHandler {
    pub fn new(lattice: &Lattice, alpha: f64, kc: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(BreakupError::InvalidCutoff(format!(
                "Ewald splitting parameter must be positive, got {alpha}"
            )));
        }
        let kcontainer = KContainer::new(lattice, kc, true)?;
        let volume = lattice.volume();
        let fk = kcontainer
            .kpts()
            .iter()
            .map(|kp| 4.0 * PI * (-kp.ksq / (4.0 * alpha * alpha)).exp() / (kp.ksq * volume))
            .collect();
        info!(
            "Ewald split: alpha = {:.6}, kc = {:.6}, {} k-vectors",
            alpha,
            kc,
            kcontainer.len()
        );
        Ok(Self {
            lattice: *lattice,
            alpha,
            rc: lattice.simulation_cell_radius(),
            kcontainer,
            fk,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl LongRangeSplit for EwaldHandler {
    fn cutoff(&self) -> f64 {
        self.rc
    }

    fn kcontainer(&self) -> &KContainer {
        &self.kcontainer
    }

    fn fk(&self) -> &[f64] {
        &self.fk
    }

    fn evaluate_short_range(&self, r: f64, rinv: f64) -> f64 {
        erfc(self.alpha * r) * rinv
    }

    fn lr_at_origin(&self) -> f64 {
        2.0 * self.alpha / PI.sqrt()
    }

    fn sr_k0(&self) -> f64 {
        PI / (self.alpha * self.alpha * self.lattice.volume())
    }

    /// Includes the short-range interaction with the nearest images, which
    /// the Gaussian split does not truncate.
    fn madelung_constant(&self) -> f64 {
        let sum_fk: f64 = self.fk.iter().sum();
        let mut images = 0.0;
        for i in -2..=2 {
            for j in -2..=2 {
                for k in -2..=2 {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let t = self
                        .lattice
                        .to_cartesian(&Vector3::new(i as f64, j as f64, k as f64));
                    let r = t.norm();
                    images += self.evaluate_short_range(r, 1.0 / r);
                }
            }
        }
        0.5 * (sum_fk + images - self.lr_at_origin() - self.sr_k0())
    }
}
