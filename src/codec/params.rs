// src/codec/params.rs

use crate::codec::predict::{MAX_EFFORT, MIN_EFFORT};
use crate::codec::MAX_NEAR;
use crate::utils::error::{NblicError, Result};

/// Largest dimension the 16-bit header fields can carry.
pub const MAX_DIMENSION: usize = u16::MAX as usize;
/// Default dimension limit for encoding and decoding.
pub const DEFAULT_MAX_DIMENSION: usize = 10240;
/// Upper bound on worker threads picked automatically.
pub const MAX_AUTO_THREADS: usize = 8;
/// Default rows per parallel block.
pub const DEFAULT_BLOCK_ROWS: usize = 16;

/// Entropy back-end, stored in the stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Adaptive binary arithmetic coder over a magnitude tree.
    #[default]
    Arithmetic,
    /// Two-pass static histograms with rANS.
    Histogram,
}

impl Backend {
    pub fn to_byte(self) -> u8 {
        match self {
            Backend::Arithmetic => 0,
            Backend::Histogram => 1,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Backend::Arithmetic),
            1 => Ok(Backend::Histogram),
            other => Err(NblicError::Format(format!("unknown backend id {other}"))),
        }
    }
}

/// Maximum accepted image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_height: usize,
    pub max_width: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_height: DEFAULT_MAX_DIMENSION,
            max_width: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl Limits {
    /// Limits capped at what the header can represent.
    pub fn new(max_height: usize, max_width: usize) -> Self {
        Self {
            max_height: max_height.min(MAX_DIMENSION),
            max_width: max_width.min(MAX_DIMENSION),
        }
    }

    /// Checks `height x width` against these limits.
    pub fn check(&self, height: usize, width: usize) -> Result<()> {
        if height == 0 || width == 0 {
            return Err(NblicError::InvalidParameter(format!(
                "empty image {height}x{width}"
            )));
        }
        if height > self.max_height.min(MAX_DIMENSION) || width > self.max_width.min(MAX_DIMENSION)
        {
            return Err(NblicError::InvalidParameter(format!(
                "image {height}x{width} exceeds limit {}x{}",
                self.max_height, self.max_width
            )));
        }
        Ok(())
    }
}

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct EncodeParams {
    /// Per-pixel error bound, 0 for lossless (clamped to `0..=25`).
    pub near: u8,
    /// 1 = edge-directed predictor, 2 = adaptive vector predictor.
    pub effort: u8,
    pub backend: Backend,
    /// Worker threads for the parallel pipeline: 0 = auto, 1 = sequential.
    pub threads: usize,
    /// Rows per block handed to a worker.
    pub block_rows: usize,
    pub limits: Limits,
}

impl Default for EncodeParams {
    fn default() -> Self {
        Self {
            near: 0,
            effort: MIN_EFFORT,
            backend: Backend::default(),
            threads: 1,
            block_rows: DEFAULT_BLOCK_ROWS,
            limits: Limits::default(),
        }
    }
}

impl EncodeParams {
    /// Sets the near-lossless tolerance.
    pub fn with_near(mut self, near: u8) -> Self {
        self.near = near.min(MAX_NEAR);
        self
    }

    /// Sets the effort level.
    pub fn with_effort(mut self, effort: u8) -> Self {
        self.effort = effort.clamp(MIN_EFFORT, MAX_EFFORT);
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the worker count (0 = one per core, at most 8).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_block_rows(mut self, rows: usize) -> Self {
        self.block_rows = rows.max(1);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Copy with `near` and `effort` clamped into range.
    pub(crate) fn clamped(&self) -> Self {
        Self {
            near: self.near.min(MAX_NEAR),
            effort: self.effort.clamp(MIN_EFFORT, MAX_EFFORT),
            block_rows: self.block_rows.max(1),
            ..self.clone()
        }
    }

    /// Worker count after resolving "auto".
    pub fn resolved_threads(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(MAX_AUTO_THREADS),
            n => n,
        }
    }
}
