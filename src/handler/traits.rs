use num_complex::Complex64;

use crate::kspace::KContainer;

/// A periodic pair interaction split into a short-range real-space part and
/// a long-range part tabulated on a k-list.
///
/// For a cell of N particles the interaction energy is
///
///   Σ_{i<j} Σ_L V_S(|r_ij + L|) + ½ Σ_k Fk |ρ_k|² - ½ N V_L(0) - ½ N² V_S(k=0),
///
/// where the last two terms remove the self interaction and the k = 0
/// component of the short-range part against a neutralizing background.
pub trait LongRangeSplit {
    /// Real-space cutoff of the short-range part.
    fn cutoff(&self) -> f64;

    /// k-vectors on which [`LongRangeSplit::fk`] is tabulated.
    fn kcontainer(&self) -> &KContainer;

    /// Long-range part per k-vector, already divided by the cell volume.
    fn fk(&self) -> &[f64];

    /// V_S(r)
    fn evaluate_short_range(&self, r: f64, rinv: f64) -> f64;

    /// Long-range part at r = 0.
    fn lr_at_origin(&self) -> f64;

    /// k = 0 component of the short-range part, divided by the cell volume.
    fn sr_k0(&self) -> f64;

    /// Σ_k Re(ρ1_k ρ2_{-k}) Fk
    ///
    /// # Panics
    ///
    /// If `minus_k`, `rhok1` or `rhok2` is not laid out on this split's
    /// k-list, i.e. their lengths differ from `fk().len()`.
    fn evaluate_long_range(&self, minus_k: &[usize], rhok1: &[Complex64], rhok2: &[Complex64]) -> f64 {
        let nk = self.fk().len();
        assert_eq!(minus_k.len(), nk, "minus-k map does not match the k-list");
        assert_eq!(rhok1.len(), nk, "structure factor does not match the k-list");
        assert_eq!(rhok2.len(), nk, "structure factor does not match the k-list");
        self.fk()
            .iter()
            .enumerate()
            .map(|(k, fk)| (rhok1[k] * rhok2[minus_k[k]]).re * fk)
            .sum()
    }

    /// Interaction of a unit charge with its own periodic images and a
    /// neutralizing background, for a short-range part that vanishes at
    /// every non-zero lattice translation.
    fn madelung_constant(&self) -> f64 {
        let sum_fk: f64 = self.fk().iter().sum();
        0.5 * (sum_fk - self.lr_at_origin() - self.sr_k0())
    }
}
