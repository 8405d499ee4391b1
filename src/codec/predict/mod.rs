// src/codec/predict/mod.rs

//! Pixel predictors.
//!
//! Two strategies share one interface: the stateless edge-directed blend
//! and the adaptive vector predictor, which falls back to the edge-directed
//! one whenever its fit is unavailable. The `effort` parameter picks one.

pub mod edge;
pub mod vector;

use crate::codec::neighbors::NeighborSet;
use crate::utils::error::Result;
use vector::{VectorPrediction, VectorPredictor};

/// Lowest accepted effort level.
pub const MIN_EFFORT: u8 = 1;
/// Highest accepted effort level.
pub const MAX_EFFORT: u8 = 2;

/// Which predictor an effort level selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictorKind {
    /// Edge-directed blend only. Fast, and safe to precompute in parallel.
    EdgeDirected,
    /// Per-pixel least-squares fit with edge-directed fallback.
    AdaptiveVector,
}

impl PredictorKind {
    /// Maps a (clamped) effort level to its predictor.
    pub fn from_effort(effort: u8) -> Self {
        if effort >= MAX_EFFORT {
            PredictorKind::AdaptiveVector
        } else {
            PredictorKind::EdgeDirected
        }
    }
}

/// Prediction for one pixel, before context bias correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub value: i32,
    vector: Option<VectorPrediction>,
}

impl Prediction {
    /// A prediction that carries no adaptive state (edge-directed or fallback).
    pub fn stateless(value: i32) -> Self {
        Self {
            value,
            vector: None,
        }
    }
}

/// Per-image predictor state.
pub enum Predictor {
    EdgeDirected,
    AdaptiveVector(VectorPredictor),
}

impl Predictor {
    /// Creates the predictor for an image `width` pixels wide.
    pub fn new(kind: PredictorKind, width: usize) -> Result<Self> {
        Ok(match kind {
            PredictorKind::EdgeDirected => Predictor::EdgeDirected,
            PredictorKind::AdaptiveVector => {
                Predictor::AdaptiveVector(VectorPredictor::new(width)?)
            }
        })
    }

    pub fn kind(&self) -> PredictorKind {
        match self {
            Predictor::EdgeDirected => PredictorKind::EdgeDirected,
            Predictor::AdaptiveVector(_) => PredictorKind::AdaptiveVector,
        }
    }

    /// Predicts the pixel at (`row`, `col`).
    pub fn predict(&self, row: usize, col: usize, nb: &NeighborSet) -> Prediction {
        match self {
            Predictor::EdgeDirected => Prediction::stateless(edge::predict(nb)),
            Predictor::AdaptiveVector(vp) => match vp.predict(row, col, nb) {
                Some(v) => Prediction {
                    value: v.value,
                    vector: Some(v),
                },
                None => Prediction::stateless(edge::predict(nb)),
            },
        }
    }

    /// Feeds back the reconstructed value of the pixel just coded.
    pub fn update(&mut self, col: usize, nb: &NeighborSet, actual: i32, prediction: &Prediction) {
        if let Predictor::AdaptiveVector(vp) = self {
            vp.update(col, nb, actual, prediction.vector.as_ref());
        }
    }
}
