// src/codec/context.rs

//! Activity quantization, context addressing and per-context bias.

use crate::codec::neighbors::NeighborSet;
use crate::codec::{MAX_BIAS, MAX_VAL, N_CONTEXT, N_QD, N_QW};

/// Upper boundary of each activity bin.
const Q_MID: [i32; N_QD] = [0, 2, 4, 7, 10, 14, 20, 26, 34, 42, 52, 64, 78, 95, 135, 200];

/// Accumulator fraction bits in the bias table.
const CTX_SCALE: u32 = 8;
/// Decay shift: each update keeps 127/128 of the old value.
const CTX_COEF: u32 = 7;

/// Two adjacent activity bins and the share of statistics taken from the
/// secondary one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuantizedContext {
    /// Bin that carries at least half of the weight.
    pub primary: usize,
    /// Neighbouring bin; equal to `primary` when `weight` is 0.
    pub secondary: usize,
    /// Weight of `secondary` in `[0, N_QW / 2]`.
    pub weight: u32,
}

/// Quantizes local gradient activity plus the previous residual `err`.
pub fn quantize(nb: &NeighborSet, err: i32) -> QuantizedContext {
    let delta = (nb.a - nb.e).abs()
        + (nb.b - nb.c).abs()
        + (nb.b - nb.d).abs()
        + (nb.a - nb.c).abs()
        + (nb.b - nb.f).abs()
        + (nb.d - nb.g).abs()
        + 2 * err.abs();

    let qd = Q_MID[..N_QD - 1]
        .iter()
        .position(|&m| delta <= m)
        .unwrap_or(N_QD - 1);

    let mut q = QuantizedContext {
        primary: qd,
        secondary: qd,
        weight: 0,
    };

    // delta is never below Q_MID[0], so qd > 0 here
    if delta < Q_MID[qd] {
        let lo = Q_MID[qd - 1];
        let w = (N_QW as i32 * (delta - lo) / (Q_MID[qd] - lo)) as u32;
        if w < N_QW / 2 {
            q.primary = qd - 1;
            q.weight = w;
        } else {
            q.secondary = qd - 1;
            q.weight = N_QW - w;
        }
    }
    q
}

/// Context address of a pixel from its primary bin and the sign pattern of
/// the raw prediction `px` against the neighbourhood.
pub fn context_address(nb: &NeighborSet, primary: usize, px: i32) -> usize {
    let tests = [
        nb.a,
        nb.b,
        nb.c,
        nb.d,
        nb.e,
        nb.f,
        2 * nb.a - nb.e,
        2 * nb.b - nb.f,
    ];
    let signs = tests
        .iter()
        .enumerate()
        .fold(0usize, |acc, (bit, &t)| acc | (((px > t) as usize) << bit));
    ((primary >> 1) << 8) | signs
}

/// One decaying bias accumulator per context address.
#[derive(Clone, Debug)]
pub struct BiasTable {
    entries: Vec<i32>,
}

impl Default for BiasTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BiasTable {
    pub fn new() -> Self {
        Self {
            entries: vec![0; N_CONTEXT],
        }
    }

    /// Applies the learned bias of `addr` to `px`. Returns the corrected
    /// prediction and the sign bit used to break residual ties.
    pub fn correct(&self, addr: usize, px: i32) -> (i32, bool) {
        let v = self.entries[addr];
        let sign = (v >> (CTX_SCALE - 1)) & 1;
        let bias = (v >> CTX_SCALE) + sign;
        ((px + bias).clamp(0, MAX_VAL), sign == 1)
    }

    /// Folds the clipped residual `err` into the accumulator of `addr`.
    pub fn update(&mut self, addr: usize, err: i32) {
        let v = &mut self.entries[addr];
        let err = err.clamp(-MAX_BIAS, MAX_BIAS);
        *v = (*v * ((1 << CTX_COEF) - 1) + (err << CTX_SCALE) + (1 << (CTX_COEF - 1))) >> CTX_COEF;
    }

    #[cfg(test)]
    fn raw(&self, addr: usize) -> i32 {
        self.entries[addr]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(v: i32) -> NeighborSet {
        NeighborSet {
            a: v,
            b: v,
            c: v,
            d: v,
            e: v,
            f: v,
            g: v,
            h: v,
            q: v,
            r: v,
            s: v,
        }
    }

    #[test]
    fn test_flat_area_is_bin_zero() {
        let q = quantize(&flat(90), 0);
        assert_eq!(q, QuantizedContext { primary: 0, secondary: 0, weight: 0 });
    }

    #[test]
    fn test_exact_boundary_has_no_secondary() {
        // |a-e| = 7 lands exactly on a boundary
        let mut nb = flat(100);
        nb.e = 93;
        let q = quantize(&nb, 0);
        assert_eq!(q.primary, 3);
        assert_eq!(q.secondary, 3);
        assert_eq!(q.weight, 0);
    }

    #[test]
    fn test_interpolation_between_bins() {
        // delta = 12, between 10 and 14: w = 32 * 2 / 4 = 16, upper half
        let mut nb = flat(100);
        nb.e = 88;
        let q = quantize(&nb, 0);
        assert_eq!(q.primary, 5);
        assert_eq!(q.secondary, 4);
        assert_eq!(q.weight, 16);

        // delta = 11: w = 8, lower half
        nb.e = 89;
        let q = quantize(&nb, 0);
        assert_eq!(q.primary, 4);
        assert_eq!(q.secondary, 5);
        assert_eq!(q.weight, 8);
    }

    #[test]
    fn test_previous_error_counts_twice() {
        let q = quantize(&flat(100), 100);
        assert_eq!(q.primary, N_QD - 1);
        assert_eq!(q.weight, 0);
    }

    #[test]
    fn test_address_range() {
        for primary in 0..N_QD {
            for px in [0, 1, 127, 128, 254, 255] {
                let mut nb = flat(128);
                nb.e = 0;
                nb.f = 255;
                let addr = context_address(&nb, primary, px);
                assert!(addr < N_CONTEXT);
                assert_eq!(addr >> 8, primary >> 1);
            }
        }
    }

    #[test]
    fn test_address_sign_bits() {
        let nb = flat(100);
        assert_eq!(context_address(&nb, 0, 101) & 0xff, 0xff);
        assert_eq!(context_address(&nb, 0, 100) & 0xff, 0);
    }

    #[test]
    fn test_bias_converges_toward_residual() {
        let mut table = BiasTable::new();
        assert_eq!(table.correct(7, 100), (100, false));
        for _ in 0..2000 {
            table.update(7, 5);
        }
        let (px, _) = table.correct(7, 100);
        assert!((104..=106).contains(&px), "px = {px}");
        assert!(table.raw(7) <= 5 << CTX_SCALE);
    }

    #[test]
    fn test_bias_correction_is_clipped() {
        let mut table = BiasTable::new();
        for _ in 0..2000 {
            table.update(3, -127);
        }
        assert_eq!(table.correct(3, 10).0, 0);
        assert_eq!(table.correct(3, 250).0, 250 - 127);
    }
}
