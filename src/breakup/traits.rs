//! Capabilities consumed by the breakup: a radial basis for the long-range
//! part inside the cutoff, and the interaction being split.

/// Radial basis with analytic Fourier transforms.
///
/// Inside `cutoff()` the long-range part of the interaction is expanded as
/// Σ_n t_n h_n(r). The transform convention is
///
///   c(n, k) = (4π / k) ∫_0^rc r sin(kr) h_n(r) dr,
///
/// which tends to 4π ∫_0^rc r² h_n(r) dr as k → 0. No 1/Ω factor is included.
pub trait BreakupBasis {
    /// Number of basis elements.
    fn num_basis_elem(&self) -> usize;

    /// Real-space cutoff radius rc.
    fn cutoff(&self) -> f64;

    /// h_n(r); zero outside [0, rc].
    fn h(&self, n: usize, r: f64) -> f64;

    /// dh_n/dr
    fn dh(&self, n: usize, r: f64) -> f64;

    /// Fourier transform of h_n at magnitude k (k = 0 allowed).
    fn c(&self, n: usize, k: f64) -> f64;

    /// The single element that is non-zero at rc, if the basis has one.
    /// Fixing its coefficient pins the expansion at the cutoff.
    fn cutoff_element(&self) -> Option<usize> {
        None
    }
}

/// The pair interaction to be split into short- and long-range parts.
///
/// Transforms follow the same convention as [`BreakupBasis::c`].
pub trait TargetFunction {
    /// F(r), with 1/r supplied by the caller.
    fn f(&self, r: f64, rinv: f64) -> f64;

    /// dF/dr
    fn df(&self, r: f64, rinv: f64) -> f64;

    /// Transform of the part of F beyond rc: (4π/k) ∫_rc^∞ r sin(kr) F(r) dr.
    fn fk(&self, k: f64, rc: f64) -> f64;

    /// Quantity the basis transforms are fitted to above the k-space cutoff.
    /// For a plain split this is `-fk`, so that the long-range part
    /// vanishes for large k.
    fn xk(&self, k: f64, rc: f64) -> f64 {
        -self.fk(k, rc)
    }

    /// ∫_0^rc r² F(r) dr
    fn integrate_r2(&self, rc: f64) -> f64;
}
