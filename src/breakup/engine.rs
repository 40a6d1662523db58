use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

use crate::error::{BreakupError, Result};
use crate::lattice::Lattice;
use super::degeneracy::{BreakupKList, ShellDegeneracyBuilder};
use super::lsq::{normal_equations, ConstrainedLeastSquaresSolver};
use super::traits::BreakupBasis;

/// Diagnostics of one breakup solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakupFit {
    /// Σ_k deg(k) (F(k) - Σ_n c(n,k) t_n)²
    pub chi_squared: f64,
    pub dropped_singular_values: usize,
    pub num_free: usize,
}

/// Fits basis coefficients t so that Σ_n t_n c(n,k) reproduces a target
/// over the breakup k-list, weighted by degeneracy.
///
/// The k-list must be set up with [`BreakupEngine::setup_k_vectors`] before
/// any breakup; it is cleared whenever the lattice changes.
pub struct BreakupEngine<B: BreakupBasis> {
    lattice: Lattice,
    basis: B,
    klist: BreakupKList,
    // c(n, k) for every k-list entry, rows follow the k-list
    cnk: DMatrix<f64>,
    solver: ConstrainedLeastSquaresSolver,
}

impl<B: BreakupBasis> BreakupEngine<B> {
    pub fn new(lattice: &Lattice, basis: B) -> Self {
        Self {
            lattice: *lattice,
            basis,
            klist: BreakupKList::new(),
            cnk: DMatrix::zeros(0, 0),
            solver: ConstrainedLeastSquaresSolver::new(),
        }
    }

    pub fn with_solver(mut self, solver: ConstrainedLeastSquaresSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn basis(&self) -> &B {
        &self.basis
    }

    pub fn klist(&self) -> &BreakupKList {
        &self.klist
    }

    /// Replace the lattice. The k-list is discarded and must be set up again.
    pub fn set_lattice(&mut self, lattice: &Lattice) {
        self.lattice = *lattice;
        self.klist = BreakupKList::new();
        self.cnk = DMatrix::zeros(0, 0);
    }

    /// Build the fit k-list for kc < |k| ≤ kmax with exact degeneracies up to
    /// `kcont`. Returns the number of entries.
    pub fn setup_k_vectors(&mut self, kc: f64, kcont: f64, kmax: f64) -> Result<usize> {
        let builder = ShellDegeneracyBuilder::for_lattice(&self.lattice);
        self.setup_k_vectors_with(&builder, kc, kcont, kmax)
    }

    pub fn setup_k_vectors_with(
        &mut self,
        builder: &ShellDegeneracyBuilder,
        kc: f64,
        kcont: f64,
        kmax: f64,
    ) -> Result<usize> {
        self.klist = builder.build(kc, kcont, kmax)?;
        let nbasis = self.basis.num_basis_elem();
        let ks: Vec<f64> = self.klist.iter().map(|e| e.k).collect();
        self.cnk = DMatrix::from_fn(ks.len(), nbasis, |i, n| self.basis.c(n, ks[i]));

        debug!(
            "breakup k-list: {} entries, kc = {:.6}, kcont = {:.6}, kmax = {:.6}, total degeneracy {:.3e}",
            self.klist.len(),
            kc,
            kcont,
            kmax,
            self.klist.total_degeneracy()
        );
        Ok(self.klist.len())
    }

    /// Unconstrained fit of every coefficient to `fk`, one sample per k-list
    /// entry.
    pub fn do_breakup(&self, fk: &[f64], t: &mut [f64]) -> Result<BreakupFit> {
        let adjust = vec![true; t.len()];
        self.do_constrained_breakup(fk, t, &adjust)
    }

    /// Fit only the coefficients flagged in `adjust`; the rest keep the values
    /// passed in `t`.
    pub fn do_constrained_breakup(
        &self,
        fk: &[f64],
        t: &mut [f64],
        adjust: &[bool],
    ) -> Result<BreakupFit> {
        let weights = self.check_inputs(fk, t.len())?;
        let solution = self.solver.solve(&self.cnk, &weights, fk, t, adjust)?;
        let chi_squared = self.chi_squared(fk, t);

        if solution.dropped_singular_values > 0 {
            warn!(
                "breakup is rank deficient: dropped {} singular values",
                solution.dropped_singular_values
            );
        }
        info!(
            "breakup chi-squared = {:.6e} ({} free of {} coefficients, {} k-points)",
            chi_squared,
            solution.num_free,
            t.len(),
            self.klist.len()
        );

        Ok(BreakupFit {
            chi_squared,
            dropped_singular_values: solution.dropped_singular_values,
            num_free: solution.num_free,
        })
    }

    /// Normal equations A t = b of the unconstrained fit to `fk`.
    pub fn normal_equations(&self, fk: &[f64]) -> Result<(DMatrix<f64>, DVector<f64>)> {
        let weights = self.check_inputs(fk, self.basis.num_basis_elem())?;
        normal_equations(&self.cnk, &weights, fk)
    }

    /// Σ_k deg(k) (F(k) - Σ_n c(n,k) t_n)² for arbitrary coefficients.
    pub fn chi_squared(&self, fk: &[f64], t: &[f64]) -> f64 {
        self.klist
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let fit: f64 = t.iter().enumerate().map(|(n, tn)| self.cnk[(i, n)] * tn).sum();
                let residual = fk[i] - fit;
                e.degeneracy * residual * residual
            })
            .sum()
    }

    fn check_inputs(&self, fk: &[f64], num_coefs: usize) -> Result<Vec<f64>> {
        if self.klist.is_empty() {
            return Err(BreakupError::NotInitialized);
        }
        let nbasis = self.basis.num_basis_elem();
        if nbasis == 0 {
            return Err(BreakupError::DegenerateLattice(
                "basis has no elements".into(),
            ));
        }
        if fk.len() != self.klist.len() {
            return Err(BreakupError::DimensionMismatch {
                what: "target samples",
                expected: self.klist.len(),
                found: fk.len(),
            });
        }
        if num_coefs != nbasis {
            return Err(BreakupError::DimensionMismatch {
                what: "coefficients",
                expected: nbasis,
                found: num_coefs,
            });
        }
        Ok(self.klist.iter().map(|e| e.degeneracy).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Gaussians exp(-a r²) with their exact 3D transforms.
    struct GaussianBasis {
        exponents: Vec<f64>,
        // adds a tiny multiple of a fixed Gaussian to the last element
        perturbation: Option<(f64, f64)>,
    }

    impl GaussianBasis {
        fn new(exponents: Vec<f64>) -> Self {
            Self {
                exponents,
                perturbation: None,
            }
        }

        fn transform(a: f64, k: f64) -> f64 {
            (PI / a).powf(1.5) * (-k * k / (4.0 * a)).exp()
        }
    }

    impl BreakupBasis for GaussianBasis {
        fn num_basis_elem(&self) -> usize {
            self.exponents.len()
        }

        fn cutoff(&self) -> f64 {
            f64::INFINITY
        }

        fn h(&self, n: usize, r: f64) -> f64 {
            (-self.exponents[n] * r * r).exp()
        }

        fn dh(&self, n: usize, r: f64) -> f64 {
            -2.0 * self.exponents[n] * r * self.h(n, r)
        }

        fn c(&self, n: usize, k: f64) -> f64 {
            let base = Self::transform(self.exponents[n], k);
            match self.perturbation {
                Some((eps, b)) if n + 1 == self.exponents.len() => {
                    base + eps * Self::transform(b, k)
                }
                _ => base,
            }
        }
    }

    fn setup(basis: GaussianBasis) -> BreakupEngine<GaussianBasis> {
        let l = 4.0;
        let lattice = Lattice::cubic(l).unwrap();
        let dk = 2.0 * PI / l;
        let mut engine = BreakupEngine::new(&lattice, basis);
        engine.setup_k_vectors(0.0, 2.0 * dk, 10.0 * dk).unwrap();
        engine
    }

    fn samples(engine: &BreakupEngine<GaussianBasis>, f: impl Fn(f64) -> f64) -> Vec<f64> {
        engine.klist().iter().map(|e| f(e.k)).collect()
    }

    #[test]
    fn test_breakup_before_setup() {
        let lattice = Lattice::cubic(4.0).unwrap();
        let engine = BreakupEngine::new(&lattice, GaussianBasis::new(vec![1.0]));
        let mut t = vec![0.0];
        assert!(matches!(
            engine.do_breakup(&[1.0], &mut t),
            Err(BreakupError::NotInitialized)
        ));
    }

    #[test]
    fn test_set_lattice_clears_klist() {
        let mut engine = setup(GaussianBasis::new(vec![1.0]));
        assert!(!engine.klist().is_empty());
        engine.set_lattice(&Lattice::cubic(5.0).unwrap());
        assert!(engine.klist().is_empty());
        let mut t = vec![0.0];
        assert!(matches!(
            engine.do_breakup(&[], &mut t),
            Err(BreakupError::NotInitialized)
        ));
    }

    #[test]
    fn test_empty_basis() {
        let engine = setup(GaussianBasis::new(vec![]));
        let fk = vec![0.0; engine.klist().len()];
        let mut t: Vec<f64> = vec![];
        assert!(matches!(
            engine.do_breakup(&fk, &mut t),
            Err(BreakupError::DegenerateLattice(_))
        ));
    }

    #[test]
    fn test_sample_count_mismatch() {
        let engine = setup(GaussianBasis::new(vec![1.0]));
        let fk = vec![0.0; engine.klist().len() - 1];
        let mut t = vec![0.0];
        assert!(matches!(
            engine.do_breakup(&fk, &mut t),
            Err(BreakupError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_single_element_round_trip() {
        let engine = setup(GaussianBasis::new(vec![0.7]));
        let fk = samples(&engine, |k| 3.25 * GaussianBasis::transform(0.7, k));
        let mut t = vec![0.0];
        let fit = engine.do_breakup(&fk, &mut t).unwrap();

        assert_relative_eq!(t[0], 3.25, epsilon = 1e-10);
        assert!(fit.chi_squared < 1e-12);
        assert_eq!(fit.dropped_singular_values, 0);
    }

    #[test]
    fn test_breakup_is_idempotent() {
        let engine = setup(GaussianBasis::new(vec![0.3, 1.0, 2.5]));
        let fk = samples(&engine, |k| 4.0 * PI / (k * k + 1.0));

        let mut t1 = vec![0.0; 3];
        let fit1 = engine.do_breakup(&fk, &mut t1).unwrap();
        let mut t2 = vec![0.0; 3];
        let fit2 = engine.do_breakup(&fk, &mut t2).unwrap();

        assert_eq!(t1, t2);
        assert_eq!(fit1, fit2);
    }

    #[test]
    fn test_constrained_all_free_matches_unconstrained() {
        let engine = setup(GaussianBasis::new(vec![0.3, 1.0, 2.5]));
        let fk = samples(&engine, |k| 4.0 * PI / (k * k + 1.0));

        let mut t1 = vec![0.0; 3];
        engine.do_breakup(&fk, &mut t1).unwrap();
        let mut t2 = vec![0.0; 3];
        engine
            .do_constrained_breakup(&fk, &mut t2, &[true, true, true])
            .unwrap();
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_constrained_keeps_fixed_entries() {
        let engine = setup(GaussianBasis::new(vec![0.3, 1.0, 2.5]));
        let fk = samples(&engine, |k| 4.0 * PI / (k * k + 1.0));

        let mut t = vec![0.0, 0.125, 0.0];
        let fit = engine
            .do_constrained_breakup(&fk, &mut t, &[true, false, true])
            .unwrap();
        assert_eq!(t[1], 0.125);
        assert_eq!(fit.num_free, 2);

        let mut t = vec![0.0; 3];
        assert!(matches!(
            engine.do_constrained_breakup(&fk, &mut t, &[false; 3]),
            Err(BreakupError::AllParametersFixed)
        ));
    }

    #[test]
    fn test_reported_chi_squared_matches_recomputation() {
        let engine = setup(GaussianBasis::new(vec![0.5, 2.0]));
        let fk = samples(&engine, |k| 4.0 * PI * (-k).exp());

        let mut t = vec![0.0; 2];
        let fit = engine.do_breakup(&fk, &mut t).unwrap();

        let expected: f64 = engine
            .klist()
            .iter()
            .zip(&fk)
            .map(|(e, f)| {
                let model = t[0] * GaussianBasis::transform(0.5, e.k)
                    + t[1] * GaussianBasis::transform(2.0, e.k);
                e.degeneracy * (f - model).powi(2)
            })
            .sum();
        assert_relative_eq!(fit.chi_squared, expected, max_relative = 1e-10);
        assert!(fit.chi_squared > 0.0);
    }

    #[test]
    fn test_fit_solves_normal_equations() {
        let engine = setup(GaussianBasis::new(vec![0.5, 1.5]));
        let fk = samples(&engine, |k| 1.0 / (1.0 + k * k));
        let mut t = vec![0.0; 2];
        engine.do_breakup(&fk, &mut t).unwrap();

        let (a, b) = engine.normal_equations(&fk).unwrap();
        let residual = &a * DVector::from_column_slice(&t) - &b;
        assert!(residual.norm() <= 1e-8 * b.norm());
    }

    #[test]
    fn test_near_singular_basis_degrades() {
        let mut basis = GaussianBasis::new(vec![0.8, 0.8]);
        basis.perturbation = Some((1e-12, 2.0));
        let engine = setup(basis);
        let fk = samples(&engine, |k| GaussianBasis::transform(0.8, k));

        let mut t = vec![0.0; 2];
        let fit = engine.do_breakup(&fk, &mut t).unwrap();
        assert!(fit.dropped_singular_values >= 1);
        assert!(fit.chi_squared.is_finite());
        assert!(t.iter().all(|x| x.is_finite()));
        // the retained direction still reproduces the target
        assert_relative_eq!(t[0] + t[1], 1.0, epsilon = 1e-6);
    }
}
