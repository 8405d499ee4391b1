// src/codec/residual.rs

//! Folding of prediction residuals into non-negative codes.
//!
//! Residuals are first quantized to steps of `2·near + 1`. Magnitudes that
//! fit on both sides of the prediction interleave by sign; larger ones can
//! only go one way and follow on directly, which keeps the alphabet tight
//! near the ends of the sample range.

use crate::codec::{MAX_VAL, MID_VAL};

/// Largest quantized magnitude that is reachable on both sides of `px`.
fn two_sided_limit(px: i32, near: i32) -> i32 {
    (px.min(MAX_VAL - px) + near) / (2 * near + 1)
}

/// Maps sample `x` to its code relative to the corrected prediction `px`.
pub fn fold(x: i32, px: i32, sign: bool, near: u8) -> u32 {
    let near = near as i32;
    let ty = two_sided_limit(px, near);
    let above = x >= px;
    let y = ((x - px).abs() + near) / (2 * near + 1);

    if y <= 0 {
        0
    } else if y <= ty {
        (2 * y - (above ^ sign) as i32) as u32
    } else {
        (y + ty) as u32
    }
}

/// Reconstructs the sample coded as `z`. With `near > 0` this is within
/// `near` of the input sample, not necessarily equal to it.
pub fn unfold(z: u32, px: i32, sign: bool, near: u8) -> i32 {
    let near = near as i32;
    let ty = two_sided_limit(px, near);
    let z = z as i32;

    let (y, above) = if z <= 0 {
        (0, false)
    } else if z <= 2 * ty {
        ((z + 1) / 2, ((z & 1) == 1) ^ sign)
    } else {
        (z - ty, px < MID_VAL)
    };

    let step = y * (2 * near + 1);
    let x = if above { px + step } else { px - step };
    x.clamp(0, MAX_VAL)
}
