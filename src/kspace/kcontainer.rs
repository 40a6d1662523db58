//! Reciprocal lattice enumeration.
//!
//! Generates the k-vectors of a lattice inside a cutoff, orders them into
//! shells of (quantized) equal magnitude and records for every k the index
//! of -k, which structure-factor sums need to pair ρ_k with ρ_{-k}.

use log::debug;
use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::ops::Range;

use crate::error::{BreakupError, Result};
use crate::lattice::Lattice;

/// Resolution used to quantize |k|² into shell keys. Distinct magnitudes
/// closer than this end up in the same shell.
pub const SHELL_RESOLUTION: f64 = 1e-3;

/// A single reciprocal lattice vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KPoint {
    /// Integer coordinates in the reciprocal basis.
    pub index: [i32; 3],
    /// Cartesian vector Σ n_i b_i.
    pub cart: Vector3<f64>,
    /// |k|²
    pub ksq: f64,
}

/// k-vectors of a lattice up to a cutoff, grouped into shells.
#[derive(Debug, Clone, Default)]
pub struct KContainer {
    kcutoff: f64,
    use_sphere: bool,
    mmax: [i32; 3],
    kpts: Vec<KPoint>,
    /// Shell `s` spans `kpts[kshell[s]..kshell[s + 1]]`.
    kshell: Vec<usize>,
    minus_k: Vec<usize>,
}

impl KContainer {
    pub fn new(lattice: &Lattice, kc: f64, use_sphere: bool) -> Result<Self> {
        let mut container = Self::default();
        container.rebuild(lattice, kc, use_sphere)?;
        Ok(container)
    }

    /// Regenerate the k-list for a new lattice or cutoff.
    ///
    /// With `use_sphere` only non-zero vectors with |k| ≤ kc are kept.
    /// Otherwise the full rectangular grid bounding the cutoff sphere is
    /// kept, k = 0 included, in FFT order along each axis.
    pub fn rebuild(&mut self, lattice: &Lattice, kc: f64, use_sphere: bool) -> Result<()> {
        if !kc.is_finite() || kc <= 0.0 {
            return Err(BreakupError::InvalidCutoff(format!(
                "k-space cutoff must be positive, got {kc}"
            )));
        }

        // |n_d| = |a_d · k| / 2π ≤ |a_d| kc / 2π
        let mut bound = [0i32; 3];
        for (d, m) in bound.iter_mut().enumerate() {
            *m = (lattice.a(d).norm() * kc / (2.0 * PI)).floor() as i32 + 1;
        }

        let (kpts, mmax) = if use_sphere {
            enumerate_sphere(lattice, kc, &bound)
        } else {
            (enumerate_grid(lattice, &bound), bound)
        };
        let (kpts, kshell) = group_shells(kpts);
        let minus_k = build_minus_k(&kpts, &mmax, use_sphere)?;

        debug!(
            "k-list rebuilt: kc = {:.4}, {} vectors in {} shells, mmax = {:?}",
            kc,
            kpts.len(),
            kshell.len() - 1,
            mmax
        );

        self.kcutoff = kc;
        self.use_sphere = use_sphere;
        self.mmax = mmax;
        self.kpts = kpts;
        self.kshell = kshell;
        self.minus_k = minus_k;
        Ok(())
    }

    pub fn kpts(&self) -> &[KPoint] {
        &self.kpts
    }

    pub fn len(&self) -> usize {
        self.kpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kpts.is_empty()
    }

    pub fn kcutoff(&self) -> f64 {
        self.kcutoff
    }

    pub fn uses_sphere(&self) -> bool {
        self.use_sphere
    }

    /// Largest |n_d| present along each reciprocal axis.
    pub fn mmax(&self) -> [i32; 3] {
        self.mmax
    }

    pub fn num_shells(&self) -> usize {
        self.kshell.len().saturating_sub(1)
    }

    /// Prefix sums of the shell sizes (length `num_shells() + 1`).
    pub fn kshell(&self) -> &[usize] {
        &self.kshell
    }

    pub fn shell(&self, s: usize) -> Range<usize> {
        self.kshell[s]..self.kshell[s + 1]
    }

    /// |k|² of the first vector in shell `s`.
    pub fn shell_ksq(&self, s: usize) -> f64 {
        self.kpts[self.kshell[s]].ksq
    }

    pub fn minus_k(&self) -> &[usize] {
        &self.minus_k
    }

    /// FFT grid dimensions, available when the full grid was generated.
    pub fn fft_grid_dims(&self) -> Option<[usize; 3]> {
        if self.use_sphere {
            return None;
        }
        Some(self.mmax.map(|m| 2 * m as usize))
    }

    /// Row-major offset of k-point `i` in the FFT grid.
    pub fn fft_offset(&self, i: usize) -> Option<usize> {
        let dims = self.fft_grid_dims()?;
        let n = self.kpts.get(i)?.index;
        let wrap = |d: usize| n[d].rem_euclid(dims[d] as i32) as usize;
        Some((wrap(0) * dims[1] + wrap(1)) * dims[2] + wrap(2))
    }
}

fn shell_key(ksq: f64) -> i64 {
    (ksq / SHELL_RESOLUTION).round() as i64
}

fn enumerate_sphere(lattice: &Lattice, kc: f64, bound: &[i32; 3]) -> (Vec<KPoint>, [i32; 3]) {
    let kc2 = kc * kc;
    let mut used = [0i32; 3];
    let mut kpts = Vec::new();

    for i in -bound[0]..=bound[0] {
        for j in -bound[1]..=bound[1] {
            for k in -bound[2]..=bound[2] {
                if i == 0 && j == 0 && k == 0 {
                    continue;
                }
                let index = [i, j, k];
                let cart = lattice.k_cart(&index);
                let ksq = cart.norm_squared();
                if ksq > kc2 {
                    continue;
                }
                for d in 0..3 {
                    used[d] = used[d].max(index[d].abs());
                }
                kpts.push(KPoint { index, cart, ksq });
            }
        }
    }
    (kpts, used)
}

/// 0, 1, ..., m, -m+1, ..., -1
fn fft_axis(m: i32) -> impl Iterator<Item = i32> + Clone {
    (0..=m).chain(-m + 1..0)
}

fn enumerate_grid(lattice: &Lattice, mmax: &[i32; 3]) -> Vec<KPoint> {
    let mut kpts = Vec::with_capacity(mmax.iter().map(|&m| 2 * m as usize).product());
    for i in fft_axis(mmax[0]) {
        for j in fft_axis(mmax[1]) {
            for k in fft_axis(mmax[2]) {
                let index = [i, j, k];
                let cart = lattice.k_cart(&index);
                kpts.push(KPoint {
                    index,
                    cart,
                    ksq: cart.norm_squared(),
                });
            }
        }
    }
    kpts
}

fn group_shells(mut kpts: Vec<KPoint>) -> (Vec<KPoint>, Vec<usize>) {
    // stable: generation order is kept inside a shell
    kpts.sort_by_key(|kp| shell_key(kp.ksq));

    let mut kshell = vec![0];
    for i in 1..kpts.len() {
        if shell_key(kpts[i].ksq) != shell_key(kpts[i - 1].ksq) {
            kshell.push(i);
        }
    }
    if !kpts.is_empty() {
        kshell.push(kpts.len());
    }
    (kpts, kshell)
}

fn build_minus_k(kpts: &[KPoint], mmax: &[i32; 3], use_sphere: bool) -> Result<Vec<usize>> {
    let position: BTreeMap<[i32; 3], usize> = kpts
        .iter()
        .enumerate()
        .map(|(i, kp)| (kp.index, i))
        .collect();

    kpts.iter()
        .map(|kp| {
            let mut neg = kp.index.map(|n| -n);
            if !use_sphere {
                // the grid holds +m but not -m along each axis; they alias
                for d in 0..3 {
                    if neg[d] == -mmax[d] {
                        neg[d] = mmax[d];
                    }
                }
            }
            position.get(&neg).copied().ok_or_else(|| {
                BreakupError::DegenerateLattice(format!(
                    "k-point {:?} has no partner {:?}",
                    kp.index, neg
                ))
            })
        })
        .collect()
}
