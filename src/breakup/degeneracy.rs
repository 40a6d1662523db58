//! k-point lists for the breakup fit.
//!
//! The fit only depends on |k|, so the lattice sum over k-vectors is
//! replaced by a sum over magnitudes weighted by a degeneracy. Near the
//! origin the degeneracy is counted exactly from the lattice's shells;
//! further out the lattice is dense enough to be treated as a continuum
//! with (4πk² dk) / (8π³/Ω) vectors per shell.

use std::f64::consts::PI;

use crate::error::{BreakupError, Result};
use crate::kspace::KContainer;
use crate::lattice::Lattice;

/// Magnitudes closer than this are merged into one entry.
pub const MERGE_TOLERANCE: f64 = 1e-12;

/// Default number of continuum shells.
pub const NUM_CONTINUUM_SHELLS: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakupKPoint {
    pub k: f64,
    pub degeneracy: f64,
}

/// (|k|, degeneracy) pairs, kept sorted by |k|.
#[derive(Debug, Clone, Default)]
pub struct BreakupKList {
    entries: Vec<BreakupKPoint>,
}

impl BreakupKList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `degeneracy` vectors of magnitude `k`, merging with an existing
    /// entry within [`MERGE_TOLERANCE`].
    pub fn add(&mut self, k: f64, degeneracy: f64) {
        let pos = self.entries.partition_point(|e| e.k < k - MERGE_TOLERANCE);
        match self.entries.get_mut(pos) {
            Some(entry) if (entry.k - k).abs() < MERGE_TOLERANCE => {
                entry.degeneracy += degeneracy;
            }
            _ => self.entries.insert(pos, BreakupKPoint { k, degeneracy }),
        }
    }

    pub fn entries(&self) -> &[BreakupKPoint] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreakupKPoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_degeneracy(&self) -> f64 {
        self.entries.iter().map(|e| e.degeneracy).sum()
    }
}

/// A way of counting k-vectors between two magnitudes.
pub trait DegeneracyMeasure {
    /// Add samples covering kmin < |k| ≤ kmax to `klist`.
    fn accumulate(&self, kmin: f64, kmax: f64, klist: &mut BreakupKList) -> Result<()>;
}

/// Counting measure: every shell of the physical lattice, with its size as
/// the degeneracy.
#[derive(Debug, Clone, Copy)]
pub struct ExactShellMeasure {
    lattice: Lattice,
}

impl ExactShellMeasure {
    pub fn new(lattice: &Lattice) -> Self {
        Self { lattice: *lattice }
    }
}

impl DegeneracyMeasure for ExactShellMeasure {
    fn accumulate(&self, kmin: f64, kmax: f64, klist: &mut BreakupKList) -> Result<()> {
        if kmax <= kmin {
            return Ok(());
        }
        let kcont = KContainer::new(&self.lattice, kmax, true)?;
        for s in 0..kcont.num_shells() {
            let k = kcont.shell_ksq(s).sqrt();
            if k > kmin && k <= kmax {
                klist.add(k, kcont.shell(s).len() as f64);
            }
        }
        Ok(())
    }
}

/// Volumetric measure: equal-width spherical shells sampled at their
/// midpoints.
#[derive(Debug, Clone, Copy)]
pub struct VolumetricMeasure {
    cell_volume: f64,
    num_shells: usize,
}

impl VolumetricMeasure {
    pub fn new(cell_volume: f64, num_shells: usize) -> Self {
        Self {
            cell_volume,
            num_shells,
        }
    }
}

impl DegeneracyMeasure for VolumetricMeasure {
    fn accumulate(&self, kmin: f64, kmax: f64, klist: &mut BreakupKList) -> Result<()> {
        if kmax <= kmin || self.num_shells == 0 {
            return Ok(());
        }
        let dk = (kmax - kmin) / self.num_shells as f64;
        // k-space volume per lattice vector
        let cell_k_volume = 8.0 * PI.powi(3) / self.cell_volume;
        for i in 0..self.num_shells {
            let a = kmin + i as f64 * dk;
            let b = a + dk;
            let shell_volume = 4.0 / 3.0 * PI * (b.powi(3) - a.powi(3));
            klist.add(0.5 * (a + b), shell_volume / cell_k_volume);
        }
        Ok(())
    }
}

/// Two-tier k-list construction: `exact` below the continuum boundary,
/// `continuum` above it.
pub struct ShellDegeneracyBuilder {
    exact: Box<dyn DegeneracyMeasure>,
    continuum: Box<dyn DegeneracyMeasure>,
}

impl ShellDegeneracyBuilder {
    pub fn new(exact: Box<dyn DegeneracyMeasure>, continuum: Box<dyn DegeneracyMeasure>) -> Self {
        Self { exact, continuum }
    }

    /// Exact shells of `lattice` plus [`NUM_CONTINUUM_SHELLS`] volumetric shells.
    pub fn for_lattice(lattice: &Lattice) -> Self {
        Self::with_num_shells(lattice, NUM_CONTINUUM_SHELLS)
    }

    pub fn with_num_shells(lattice: &Lattice, num_shells: usize) -> Self {
        Self::new(
            Box::new(ExactShellMeasure::new(lattice)),
            Box::new(VolumetricMeasure::new(lattice.volume(), num_shells)),
        )
    }

    /// Build the fit k-list for kc < |k| ≤ kmax, switching from exact to
    /// approximate degeneracies at `kcont`.
    pub fn build(&self, kc: f64, kcont: f64, kmax: f64) -> Result<BreakupKList> {
        if !kc.is_finite() || kc < 0.0 {
            return Err(BreakupError::InvalidCutoff(format!(
                "breakup kc must be non-negative, got {kc}"
            )));
        }
        if !kcont.is_finite() || kcont <= 0.0 {
            return Err(BreakupError::InvalidCutoff(format!(
                "continuum boundary must be positive, got {kcont}"
            )));
        }
        if !kmax.is_finite() || kmax <= kcont {
            return Err(BreakupError::InvalidCutoff(format!(
                "kmax = {kmax} must exceed the continuum boundary {kcont}"
            )));
        }
        if kc >= kmax {
            return Err(BreakupError::InvalidCutoff(format!(
                "kc = {kc} leaves no k-vectors below kmax = {kmax}"
            )));
        }

        let mut klist = BreakupKList::new();
        self.exact.accumulate(kc, kcont, &mut klist)?;
        self.continuum.accumulate(kc.max(kcont), kmax, &mut klist)?;
        Ok(klist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_klist_merges_equal_magnitudes() {
        let mut klist = BreakupKList::new();
        klist.add(2.0, 3.0);
        klist.add(1.0, 1.0);
        klist.add(2.0 + 1e-14, 4.0);
        klist.add(1.5, 2.0);
        klist.add(2.0 + 1e-9, 1.0);

        let ks: Vec<f64> = klist.iter().map(|e| e.k).collect();
        assert_eq!(ks, vec![1.0, 1.5, 2.0, 2.0 + 1e-9]);
        assert_relative_eq!(klist.entries()[2].degeneracy, 7.0);
        assert_relative_eq!(klist.total_degeneracy(), 11.0);
    }

    #[test]
    fn test_exact_measure_counts_lattice_vectors() {
        // unit reciprocal spacing
        let lattice = Lattice::cubic(2.0 * PI).unwrap();
        let mut klist = BreakupKList::new();
        ExactShellMeasure::new(&lattice)
            .accumulate(0.0, 1.5, &mut klist)
            .unwrap();

        assert_eq!(klist.len(), 2);
        assert_relative_eq!(klist.entries()[0].k, 1.0, epsilon = 1e-12);
        assert_relative_eq!(klist.entries()[0].degeneracy, 6.0);
        assert_relative_eq!(klist.entries()[1].k, 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(klist.entries()[1].degeneracy, 12.0);

        // lower bound is exclusive
        let mut upper = BreakupKList::new();
        ExactShellMeasure::new(&lattice)
            .accumulate(1.0, 1.5, &mut upper)
            .unwrap();
        assert_eq!(upper.len(), 1);
    }

    #[test]
    fn test_exact_measure_total_matches_container() {
        let lattice = Lattice::new_bcc(3.51).unwrap();
        let mut klist = BreakupKList::new();
        ExactShellMeasure::new(&lattice)
            .accumulate(0.0, 8.0, &mut klist)
            .unwrap();
        let kcont = KContainer::new(&lattice, 8.0, true).unwrap();
        assert_relative_eq!(klist.total_degeneracy(), kcont.len() as f64);
    }

    #[test]
    fn test_volumetric_measure_total_volume() {
        let volume = 64.0;
        let (kmin, kmax) = (3.0, 20.0);
        let mut klist = BreakupKList::new();
        VolumetricMeasure::new(volume, NUM_CONTINUUM_SHELLS)
            .accumulate(kmin, kmax, &mut klist)
            .unwrap();

        assert_eq!(klist.len(), NUM_CONTINUUM_SHELLS);
        let expected = volume * (kmax.powi(3) - kmin.powi(3)) / (6.0 * PI * PI);
        assert_relative_eq!(klist.total_degeneracy(), expected, max_relative = 1e-10);
        assert!(klist.iter().all(|e| e.k > kmin && e.k < kmax));
    }

    #[test]
    fn test_builder_splits_at_continuum_boundary() {
        let l = 4.0;
        let lattice = Lattice::cubic(l).unwrap();
        let dk = 2.0 * PI / l;
        let builder = ShellDegeneracyBuilder::with_num_shells(&lattice, 100);
        let klist = builder.build(0.0, 2.0 * dk, 20.0 * dk).unwrap();

        // exact shells |n|² = 1, 2, 3, 4 then 100 continuum shells
        assert_eq!(klist.len(), 4 + 100);
        let exact: Vec<f64> = klist.iter().take(4).map(|e| e.degeneracy).collect();
        assert_eq!(exact, vec![6.0, 12.0, 8.0, 6.0]);
        for pair in klist.entries().windows(2) {
            assert!(pair[0].k < pair[1].k);
        }
    }

    #[test]
    fn test_builder_rejects_bad_cutoffs() {
        let lattice = Lattice::cubic(4.0).unwrap();
        let builder = ShellDegeneracyBuilder::for_lattice(&lattice);
        assert!(matches!(builder.build(-1.0, 2.0, 10.0), Err(BreakupError::InvalidCutoff(_))));
        assert!(matches!(builder.build(0.0, 0.0, 10.0), Err(BreakupError::InvalidCutoff(_))));
        assert!(matches!(builder.build(0.0, 2.0, 2.0), Err(BreakupError::InvalidCutoff(_))));
        assert!(matches!(builder.build(20.0, 2.0, 10.0), Err(BreakupError::InvalidCutoff(_))));
        assert!(matches!(builder.build(10.0, 2.0, 10.0), Err(BreakupError::InvalidCutoff(_))));
    }

    #[test]
    fn test_builder_with_custom_measures() {
        struct Single;
        impl DegeneracyMeasure for Single {
            fn accumulate(&self, kmin: f64, _kmax: f64, klist: &mut BreakupKList) -> Result<()> {
                klist.add(kmin + 1.0, 1.0);
                Ok(())
            }
        }
        let builder = ShellDegeneracyBuilder::new(Box::new(Single), Box::new(Single));
        let klist = builder.build(1.0, 2.0, 3.0).unwrap();
        let ks: Vec<f64> = klist.iter().map(|e| e.k).collect();
        assert_eq!(ks, vec![2.0, 3.0]);
        assert_relative_eq!(klist.total_degeneracy(), 2.0);
    }
}
