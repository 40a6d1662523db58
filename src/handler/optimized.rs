use std::f64::consts::PI;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::breakup::{
    BreakupBasis, BreakupEngine, BreakupFit, ShellDegeneracyBuilder, TargetFunction,
    NUM_CONTINUUM_SHELLS,
};
use crate::error::Result;
use crate::kspace::KContainer;
use crate::lattice::Lattice;
use super::traits::LongRangeSplit;

/// Default kc·rc.
pub const LR_DIM_CUTOFF: f64 = 15.0;

/// Cutoffs of the optimized breakup. Unset values are derived from the
/// lattice and the basis cutoff rc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakupParams {
    /// k-space cutoff; 15/rc when unset.
    pub kc: Option<f64>,
    /// Start of the continuum approximation; 30·2π/Ω^{1/3} when unset.
    pub kcont: Option<f64>,
    /// Upper end of the fit; 3000/rc when unset.
    pub kmax: Option<f64>,
    pub num_shells: usize,
    /// Hold the long-range part equal to the interaction at rc.
    pub match_at_cutoff: bool,
}

impl Default for BreakupParams {
    fn default() -> Self {
        Self {
            kc: None,
            kcont: None,
            kmax: None,
            num_shells: NUM_CONTINUUM_SHELLS,
            match_at_cutoff: true,
        }
    }
}

impl BreakupParams {
    fn resolve(&self, lattice: &Lattice, rc: f64) -> (f64, f64, f64) {
        let kc = self.kc.unwrap_or(LR_DIM_CUTOFF / rc);
        let kcont = self
            .kcont
            .unwrap_or(30.0 * 2.0 * PI / lattice.volume().cbrt());
        let kmax = self.kmax.unwrap_or(3000.0 / rc);
        (kc, kcont, kmax)
    }
}

/// Optimized short/long-range split of `target` in the basis `B`.
///
/// Inside rc the long-range part is Σ_n t_n h_n(r), with t fitted so that its
/// transform cancels the transform of the interaction tail for |k| > kc.
pub struct LongRangeHandler<F: TargetFunction, B: BreakupBasis> {
    target: F,
    engine: BreakupEngine<B>,
    params: BreakupParams,
    kc: f64,
    kcontainer: KContainer,
    coefs: Vec<f64>,
    fk: Vec<f64>,
    fk_shell: Vec<f64>,
    fit: BreakupFit,
}

impl<F: TargetFunction, B: BreakupBasis> LongRangeHandler<F, B> {
    pub fn new(lattice: &Lattice, target: F, basis: B, params: BreakupParams) -> Result<Self> {
        let rc = basis.cutoff();
        let (kc, _, _) = params.resolve(lattice, rc);
        let mut handler = Self {
            target,
            engine: BreakupEngine::new(lattice, basis),
            params,
            kc,
            kcontainer: KContainer::new(lattice, kc, true)?,
            coefs: Vec::new(),
            fk: Vec::new(),
            fk_shell: Vec::new(),
            fit: BreakupFit {
                chi_squared: 0.0,
                dropped_singular_values: 0,
                num_free: 0,
            },
        };
        handler.fill_coefs()?;
        Ok(handler)
    }

    /// Redo the breakup for a new cell.
    pub fn reset_lattice(&mut self, lattice: &Lattice) -> Result<()> {
        let (kc, _, _) = self.params.resolve(lattice, self.rc());
        self.kc = kc;
        self.engine.set_lattice(lattice);
        self.kcontainer.rebuild(lattice, kc, true)?;
        self.fill_coefs()
    }

    fn fill_coefs(&mut self) -> Result<()> {
        let lattice = *self.engine.lattice();
        let rc = self.rc();
        let (kc, kcont, kmax) = self.params.resolve(&lattice, rc);
        let builder = ShellDegeneracyBuilder::with_num_shells(&lattice, self.params.num_shells);
        self.engine.setup_k_vectors_with(&builder, kc, kcont, kmax)?;

        let xk: Vec<f64> = self
            .engine
            .klist()
            .iter()
            .map(|e| self.target.xk(e.k, rc))
            .collect();

        let basis = self.engine.basis();
        let nbasis = basis.num_basis_elem();
        let mut t = vec![0.0; nbasis];
        let mut adjust = vec![true; nbasis];
        if self.params.match_at_cutoff {
            match basis.cutoff_element() {
                Some(n) if n < nbasis && basis.h(n, rc) != 0.0 => {
                    t[n] = self.target.f(rc, 1.0 / rc) / basis.h(n, rc);
                    adjust[n] = false;
                    debug!("fixing basis element {} to {:.10} at rc = {:.6}", n, t[n], rc);
                }
                _ => warn!("basis has no single element at rc; running an unconstrained breakup"),
            }
        }

        self.fit = self.engine.do_constrained_breakup(&xk, &mut t, &adjust)?;
        self.coefs = t;

        let volume = lattice.volume();
        self.fk = self
            .kcontainer
            .kpts()
            .iter()
            .map(|kp| self.long_range_k(kp.ksq.sqrt()) / volume)
            .collect();
        self.fk_shell = (0..self.kcontainer.num_shells())
            .map(|s| self.long_range_k(self.kcontainer.shell_ksq(s).sqrt()) / volume)
            .collect();

        info!(
            "optimized breakup: rc = {:.6}, kc = {:.6}, {} k-vectors in {} shells, chi-squared = {:.6e}",
            rc,
            kc,
            self.kcontainer.len(),
            self.kcontainer.num_shells(),
            self.fit.chi_squared
        );
        Ok(())
    }

    /// Transform of the long-range part at |k|, without the 1/Ω factor.
    fn long_range_k(&self, k: f64) -> f64 {
        let basis = self.engine.basis();
        let fit: f64 = self
            .coefs
            .iter()
            .enumerate()
            .map(|(n, t)| t * basis.c(n, k))
            .sum();
        self.target.fk(k, self.rc()) + fit
    }

    fn basis_sum(&self, r: f64) -> f64 {
        let basis = self.engine.basis();
        self.coefs
            .iter()
            .enumerate()
            .map(|(n, t)| t * basis.h(n, r))
            .sum()
    }

    /// dV_S/dr, zero beyond rc.
    pub fn evaluate_short_range_derivative(&self, r: f64, rinv: f64) -> f64 {
        if r >= self.rc() {
            return 0.0;
        }
        let basis = self.engine.basis();
        let dfit: f64 = self
            .coefs
            .iter()
            .enumerate()
            .map(|(n, t)| t * basis.dh(n, r))
            .sum();
        self.target.df(r, rinv) - dfit
    }

    /// Long-range part in real space: the fitted expansion inside rc, the
    /// interaction itself outside.
    pub fn long_range_real_space(&self, r: f64) -> f64 {
        if r < self.rc() {
            self.basis_sum(r)
        } else {
            self.target.f(r, 1.0 / r)
        }
    }

    pub fn rc(&self) -> f64 {
        self.engine.basis().cutoff()
    }

    pub fn kc(&self) -> f64 {
        self.kc
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefs
    }

    /// Long-range part per k-shell, divided by the cell volume.
    pub fn fk_shell(&self) -> &[f64] {
        &self.fk_shell
    }

    pub fn chi_squared(&self) -> f64 {
        self.fit.chi_squared
    }

    pub fn fit(&self) -> &BreakupFit {
        &self.fit
    }

    pub fn basis(&self) -> &B {
        self.engine.basis()
    }

    pub fn target(&self) -> &F {
        &self.target
    }
}

impl<F: TargetFunction, B: BreakupBasis> LongRangeSplit for LongRangeHandler<F, B> {
    fn cutoff(&self) -> f64 {
        self.rc()
    }

    fn kcontainer(&self) -> &KContainer {
        &self.kcontainer
    }

    fn fk(&self) -> &[f64] {
        &self.fk
    }

    fn evaluate_short_range(&self, r: f64, rinv: f64) -> f64 {
        if r >= self.rc() {
            return 0.0;
        }
        self.target.f(r, rinv) - self.basis_sum(r)
    }

    fn lr_at_origin(&self) -> f64 {
        self.basis_sum(0.0)
    }

    fn sr_k0(&self) -> f64 {
        let rc = self.rc();
        let basis = self.engine.basis();
        let fit: f64 = self
            .coefs
            .iter()
            .enumerate()
            .map(|(n, t)| t * basis.c(n, 0.0))
            .sum();
        (4.0 * PI * self.target.integrate_r2(rc) - fit) / self.engine.lattice().volume()
    }
}
