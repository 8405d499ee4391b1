//! Lossless and near-lossless compression of 8-bit grayscale images.
//!
//! Pixels are coded in raster order. Each one is predicted from its causal
//! neighbours, the residual is bias corrected, folded and rank mapped in one
//! of 2048 contexts, then entropy coded either with a binary adaptive
//! arithmetic coder or with a static histogram and rANS.
//!
//! # Quick Start
//!
//! ```ignore
//! use nblic::{compress, decompress, load_image};
//!
//! let image = load_image("scan.pgm")?;
//! let bytes = compress(image.pixels(), image.height(), image.width(), 0, 1)?;
//!
//! let decoded = decompress(&bytes)?;
//! assert_eq!(decoded.pixels, image.pixels());
//! ```
//!
//! # Features
//!
//! - **Near-lossless mode**: `near = n` bounds every reconstructed pixel to
//!   within `n` of the input
//! - **Two predictors**: a stateless edge-directed one (`effort = 1`) and an
//!   adaptive vector predictor (`effort = 2`)
//! - **Two entropy back-ends**: adaptive arithmetic or static histogram + rANS
//! - **Optional parallelism**: enable the `rayon` feature for the worker pool
//!   used by lossless edge-directed encoding
//!
//! # Image Formats
//!
//! With the `image` feature (on by default), `load_image` reads anything
//! the `image` crate recognises and converts it to luminance; `save_image`
//! writes binary PGM, or 8-bit BMP for a `.bmp` path.

pub mod codec;
pub mod image;
pub mod utils;

// Codec entry points
pub use codec::{compress, compress_with, decompress, decompress_with, DecodedImage};

// Parameters
pub use codec::{Backend, EncodeParams, Limits, PredictorKind};

// Image types
pub use image::{read_bytes, write_bytes, GrayImage};
#[cfg(feature = "image")]
pub use image::{load_image, save_image};

// Error types
pub use utils::error::{NblicError, Result};
