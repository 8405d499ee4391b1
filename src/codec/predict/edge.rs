// src/codec/predict/edge.rs

//! Stateless edge-directed predictor.
//!
//! A smooth linear estimate is blended with the best of seven directional
//! estimates. The blend weight grows with how clearly the winning direction
//! beats the others, so flat or noisy areas stay close to the linear
//! estimate and strong edges follow the edge.

use crate::codec::MAX_VAL;
use crate::codec::neighbors::NeighborSet;

/// Dominance thresholds selecting the directional blend weight (0..=8).
const DOMINANCE_THRESHOLDS: [i32; 8] = [
    1 * (MAX_VAL / 8),
    3 * (MAX_VAL / 8),
    9 * (MAX_VAL / 8),
    20 * (MAX_VAL / 8),
    50 * (MAX_VAL / 8),
    110 * (MAX_VAL / 8),
    300 * (MAX_VAL / 8),
    800 * (MAX_VAL / 8),
];

/// Predicts the current pixel from its causal neighbours. Output is in `0..=255`.
pub fn predict(nb: &NeighborSet) -> i32 {
    let NeighborSet {
        a,
        b,
        c,
        d,
        e,
        f,
        g,
        h,
        q,
        r,
        s,
    } = *nb;

    // 16x scaled linear estimate
    let linear = (9 * a + 9 * b + 2 * d - 2 * c - e - f).clamp(0, 16 * MAX_VAL);

    // (cost, 2x scaled estimate) for each direction
    let directions = [
        (
            2 * ((a - e).abs() + (c - q).abs() + (b - c).abs() + (d - b).abs()),
            2 * a,
        ),
        (
            2 * ((a - c).abs() + (c - h).abs() + (b - f).abs() + (d - g).abs()),
            2 * b,
        ),
        (
            2 * ((a - q).abs() + (c - s).abs() + (b - h).abs() + (d - f).abs()),
            2 * c,
        ),
        (
            2 * ((a - b).abs() + (c - f).abs() + (b - g).abs() + (d - r).abs()),
            2 * d,
        ),
        (
            (2 * a - e - q).abs()
                + (2 * c - q - s).abs()
                + (2 * b - c - h).abs()
                + (2 * d - b - f).abs(),
            a + c,
        ),
        (
            (2 * a - q - c).abs()
                + (2 * c - s - h).abs()
                + (2 * b - h - f).abs()
                + (2 * d - f - g).abs(),
            c + b,
        ),
        (
            (2 * a - c - b).abs()
                + (2 * c - h - f).abs()
                + (2 * b - f - g).abs()
                + (2 * d - g - r).abs(),
            b + d,
        ),
    ];

    let mut cost_sum = 0;
    let mut cost_min = i32::MAX;
    let mut angular = 0;
    for &(cost, estimate) in &directions {
        cost_sum += cost;
        // first minimum wins ties
        if cost < cost_min {
            cost_min = cost;
            angular = estimate;
        }
    }
    let dominance = cost_sum - 7 * cost_min;

    let weight = DOMINANCE_THRESHOLDS
        .iter()
        .position(|&t| t > dominance)
        .unwrap_or(DOMINANCE_THRESHOLDS.len()) as i32;

    ((8 * weight * angular + (8 - weight) * linear + 64) >> 7).clamp(0, MAX_VAL)
}
