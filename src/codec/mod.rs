//! NBLIC lossless / near-lossless gray image codec.
//!
//! ## Architecture
//!
//! Every pixel goes through the same causal pipeline on both sides:
//! 1. **Sampling** (`neighbors`) - eleven already coded neighbours
//! 2. **Prediction** (`predict`) - edge-directed or adaptive vector
//! 3. **Context** (`context`) - activity bins, sign address, bias correction
//! 4. **Mapping** (`residual`, `auto_mapper`) - fold and rank the residual
//! 5. **Entropy coding** (`arith` or `ans`)
//!
//! ## Module Map
//!
//! - `model` - the per-pixel pipeline shared by `encoder` and `decoder`
//! - `pipeline` - row-parallel precompute for lossless edge-directed encoding
//! - `header` - the 17-byte stream header
//! - `params` - `EncodeParams`, `Limits`, `Backend`

pub mod ans;
pub mod arith;
pub mod auto_mapper;
pub mod context;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod model;
pub mod neighbors;
pub mod params;
pub mod pipeline;
pub mod predict;
pub mod residual;

pub use context::QuantizedContext;
pub use decoder::{decompress, decompress_with, DecodedImage};
pub use encoder::{compress, compress_with};
pub use params::{Backend, EncodeParams, Limits};
pub use predict::PredictorKind;

use crate::utils::error::Result;

/// Largest sample value.
pub const MAX_VAL: i32 = 255;
/// Mid-gray, used where no causal neighbour exists.
pub const MID_VAL: i32 = (MAX_VAL + 1) / 2;
/// Bound on the residual fed to the bias table and the quantizer.
pub const MAX_BIAS: i32 = MAX_VAL - MID_VAL;
/// Largest accepted near-lossless tolerance.
pub const MAX_NEAR: u8 = (MAX_VAL / 10) as u8;

/// Number of activity bins.
pub const N_QD: usize = 16;
/// Number of context addresses: halved bin index above 8 sign bits.
pub const N_CONTEXT: usize = (N_QD >> 1) * 256;
/// Interpolation steps between two adjacent bins.
pub const N_QW: u32 = 32;
/// Largest weight the secondary bin can carry.
pub const W_MAX: u32 = N_QW / 2;
/// Size of the rank remapper alphabet.
pub const N_MAPPER: usize = 20;

/// Tree branching parameter derived from the near-lossless tolerance.
pub fn k_step_for(near: u8) -> u8 {
    (3 + 2 * near as u32).clamp(3, N_QD as u32) as u8
}

/// Entropy coder for mapped residual codes, driven in raster order.
///
/// The arithmetic back-end codes each symbol immediately; the histogram
/// back-end only records it and codes the whole sequence at the end.
pub trait SymbolEncoder {
    fn encode_symbol(&mut self, ctx: &QuantizedContext, z: u32) -> Result<()>;
}

/// Decoding counterpart of [`SymbolEncoder`].
pub trait SymbolDecoder {
    fn decode_symbol(&mut self, ctx: &QuantizedContext) -> Result<u32>;
}
