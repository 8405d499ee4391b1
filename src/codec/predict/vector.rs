// src/codec/predict/vector.rs

//! Adaptive vector predictor (effort 2).
//!
//! For every pixel a 6-tap linear model over the causal neighbours is fitted
//! by ridge-regularised least squares. The normal equations come from
//! exponentially decayed moment accumulators kept per column at two time
//! scales, summed over a small horizontal window. Two ridge strengths are
//! solved side by side and the shared `bias` drifts toward whichever one
//! predicted better, so the model settles on its own stability/agility
//! trade-off per image.
//!
//! Everything here is integer arithmetic: the decoder has to reproduce the
//! encoder's state bit for bit on any platform.

use crate::codec::neighbors::NeighborSet;
use crate::codec::{MAX_VAL, MID_VAL};
use crate::utils::error::Result;

/// Number of model taps: W, N, NW, NE, WW, NN.
pub const TAPS: usize = 6;

const FAST_SHIFT: u32 = 1;
const SLOW_SHIFT: u32 = 5;
const FAST_GAIN: i64 = 4;

/// Columns on each side of the current one that contribute statistics.
const WINDOW: usize = 2;

/// Rows coded with the fallback predictor while statistics build up.
const WARMUP_ROWS: usize = 2;

/// Model coefficients are Q12.
const COEF_SHIFT: u32 = 12;

/// `bias` is Q8.
const BIAS_FRAC: u32 = 8;
const BIAS_INIT: i64 = 16;
const BIAS_MIN: i64 = 2;
const BIAS_MAX: i64 = 1024;
const BIAS_DRIFT_SHIFT: u32 = 4;

/// Decayed second-order statistics of (features, target) pairs.
#[derive(Clone, Copy, Debug)]
struct Moments {
    mat: [i64; TAPS * TAPS],
    vec: [i64; TAPS],
}

impl Default for Moments {
    fn default() -> Self {
        Self {
            mat: [0; TAPS * TAPS],
            vec: [0; TAPS],
        }
    }
}

impl Moments {
    fn decay_add(&mut self, shift: u32, features: &[i64; TAPS], target: i64) {
        for r in 0..TAPS {
            for c in 0..TAPS {
                let m = &mut self.mat[r * TAPS + c];
                *m = *m - (*m >> shift) + features[r] * features[c];
            }
            let v = &mut self.vec[r];
            *v = *v - (*v >> shift) + features[r] * target;
        }
    }

    fn add_scaled_into(&self, gain: i64, mat: &mut [i64; TAPS * TAPS], vec: &mut [i64; TAPS]) {
        for (dst, src) in mat.iter_mut().zip(self.mat.iter()) {
            *dst += gain * src;
        }
        for (dst, src) in vec.iter_mut().zip(self.vec.iter()) {
            *dst += gain * src;
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ColumnStats {
    fast: Moments,
    slow: Moments,
}

/// The two candidate predictions made for one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorPrediction {
    /// Rounded mean of the two candidates; this is what gets coded against.
    pub value: i32,
    /// Candidate under the weaker ridge (`bias / 2`).
    pub light: i32,
    /// Candidate under the stronger ridge (`2 * bias`).
    pub heavy: i32,
}

/// Per-image state of the adaptive vector predictor.
pub struct VectorPredictor {
    columns: Vec<ColumnStats>,
    bias: i64,
}

impl VectorPredictor {
    /// Allocates per-column accumulators for an image `width` pixels wide.
    ///
    /// Each column holds two `Moments` of `6*6 + 6` `i64`s, 672 bytes, so
    /// the widest image the header allows needs about 44 MB.
    pub fn new(width: usize) -> Result<Self> {
        let mut columns = Vec::new();
        columns.try_reserve_exact(width)?;
        columns.resize(width, ColumnStats::default());
        Ok(Self {
            columns,
            bias: BIAS_INIT,
        })
    }

    /// Current ridge bias, Q8.
    pub fn bias(&self) -> i64 {
        self.bias
    }

    fn features(nb: &NeighborSet) -> [i64; TAPS] {
        [nb.a, nb.b, nb.c, nb.d, nb.e, nb.f].map(|v| (v - MID_VAL) as i64)
    }

    /// Fits and evaluates the model at (`row`, `col`).
    ///
    /// Returns `None` when the caller should fall back to the edge-directed
    /// predictor: during warm-up, without statistics, or when either system
    /// is singular.
    pub fn predict(&self, row: usize, col: usize, nb: &NeighborSet) -> Option<VectorPrediction> {
        if row < WARMUP_ROWS || col >= self.columns.len() {
            return None;
        }

        let mut mat = [0i64; TAPS * TAPS];
        let mut vec = [0i64; TAPS];
        let lo = col.saturating_sub(WINDOW);
        let hi = (col + WINDOW).min(self.columns.len() - 1);
        for stats in &self.columns[lo..=hi] {
            stats.fast.add_scaled_into(FAST_GAIN, &mut mat, &mut vec);
            stats.slow.add_scaled_into(1, &mut mat, &mut vec);
        }

        let trace: i64 = (0..TAPS).map(|k| mat[k * TAPS + k]).sum();
        if trace == 0 {
            return None;
        }
        let diag_mean = trace / TAPS as i64;

        let features = Self::features(nb);
        let light_bias = (self.bias / 2).max(1);
        let heavy_bias = self.bias * 2;
        let light = solve_ridge(&mat, &vec, ridge(diag_mean, light_bias))?;
        let heavy = solve_ridge(&mat, &vec, ridge(diag_mean, heavy_bias))?;

        let light = evaluate(&light, &features);
        let heavy = evaluate(&heavy, &features);
        Some(VectorPrediction {
            value: (light + heavy + 1) >> 1,
            light,
            heavy,
        })
    }

    /// Folds the reconstructed value of (`row`, `col`) into the statistics and
    /// lets `bias` drift toward the better of the two ridge strengths.
    pub fn update(
        &mut self,
        col: usize,
        nb: &NeighborSet,
        actual: i32,
        prediction: Option<&VectorPrediction>,
    ) {
        if let Some(p) = prediction {
            let light_err = (actual - p.light).abs();
            let heavy_err = (actual - p.heavy).abs();
            if light_err < heavy_err {
                self.bias -= (self.bias >> BIAS_DRIFT_SHIFT).max(1);
            } else if heavy_err < light_err {
                self.bias += (self.bias >> BIAS_DRIFT_SHIFT).max(1);
            }
            self.bias = self.bias.clamp(BIAS_MIN, BIAS_MAX);
        }

        let Some(stats) = self.columns.get_mut(col) else {
            return;
        };
        let features = Self::features(nb);
        let target = (actual - MID_VAL) as i64;
        stats.fast.decay_add(FAST_SHIFT, &features, target);
        stats.slow.decay_add(SLOW_SHIFT, &features, target);
    }
}

fn ridge(diag_mean: i64, bias: i64) -> i64 {
    ((diag_mean * bias) >> BIAS_FRAC) + 1
}

/// Solves `(mat + lambda * I) * coef = vec` with Q12 coefficients.
fn solve_ridge(
    mat: &[i64; TAPS * TAPS],
    vec: &[i64; TAPS],
    lambda: i64,
) -> Option<[i64; TAPS]> {
    let mut a = *mat;
    for k in 0..TAPS {
        a[k * TAPS + k] = a[k * TAPS + k].checked_add(lambda)?;
    }
    let mut b = [0i64; TAPS];
    for k in 0..TAPS {
        b[k] = vec[k].checked_mul(1 << COEF_SHIFT)?;
    }
    solve(&mut a, &mut b)?;
    Some(b)
}

/// `lhs - x * y / div`, computed in 128 bits. `None` if the result leaves `i64`.
#[inline]
fn eliminate(lhs: i64, x: i64, y: i64, div: i64) -> Option<i64> {
    let v = lhs as i128 - (x as i128 * y as i128) / div as i128;
    i64::try_from(v).ok()
}

/// Gaussian elimination with partial pivoting on an `n x n` system, in place.
///
/// On success `b` holds the rounded integer solution. Returns `None` for a
/// zero pivot or arithmetic overflow.
fn solve(a: &mut [i64; TAPS * TAPS], b: &mut [i64; TAPS]) -> Option<()> {
    let n = TAPS;

    for k in 0..n - 1 {
        let mut pivot = k;
        for i in k + 1..n {
            if a[i * n + k].unsigned_abs() > a[pivot * n + k].unsigned_abs() {
                pivot = i;
            }
        }
        if pivot != k {
            b.swap(k, pivot);
            for j in k..n {
                a.swap(k * n + j, pivot * n + j);
            }
        }

        let akk = a[k * n + k];
        if akk == 0 {
            return None;
        }
        for i in k + 1..n {
            let aik = a[i * n + k];
            a[i * n + k] = 0;
            if aik != 0 {
                for j in k + 1..n {
                    a[i * n + j] = eliminate(a[i * n + j], a[k * n + j], aik, akk)?;
                }
                b[i] = eliminate(b[i], b[k], aik, akk)?;
            }
        }
    }

    for k in (1..n).rev() {
        let akk = a[k * n + k];
        if akk == 0 {
            return None;
        }
        for i in 0..k {
            let aik = a[i * n + k];
            a[i * n + k] = 0;
            if aik != 0 {
                b[i] = eliminate(b[i], b[k], aik, akk)?;
            }
        }
    }

    for k in 0..n {
        let akk = a[k * n + k];
        if akk == 0 {
            return None;
        }
        b[k] = b[k].checked_add(akk >> 1)? / akk;
    }
    Some(())
}

fn evaluate(coef: &[i64; TAPS], features: &[i64; TAPS]) -> i32 {
    let dot: i128 = coef
        .iter()
        .zip(features.iter())
        .map(|(&c, &f)| c as i128 * f as i128)
        .sum();
    let centered = ((dot + (1 << (COEF_SHIFT - 1))) >> COEF_SHIFT)
        .clamp(-(MID_VAL as i128), (MAX_VAL - MID_VAL) as i128);
    centered as i32 + MID_VAL
}
