// src/utils/error.rs

use thiserror::Error;

/// The primary error type for every compress, decompress and file operation.
#[derive(Error, Debug)]
pub enum NblicError {
    /// An error occurred during I/O operations (e.g., file not found, permission denied).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller-supplied parameter is out of range (detected before any coding).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The pixel buffer does not hold `height * width` bytes.
    #[error("Dimension mismatch: expected {expected} pixels, but got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The compressed stream header is not one we can decode.
    #[error("Format error: {0}")]
    Format(String),

    /// A serialized histogram is malformed.
    #[error("Malformed histogram: {0}")]
    Histogram(String),

    /// The entropy decoder ran past the end of the compressed stream.
    #[error("Compressed stream truncated at byte offset {offset}")]
    Truncated { offset: usize },

    /// The entropy stream decoded to a state no encoder can produce.
    #[error("Corrupt entropy stream: {0}")]
    Corrupt(String),

    /// Scratch memory or worker threads could not be obtained.
    #[error("Resource error: {0}")]
    Resource(String),

    /// An image file could not be parsed or written.
    #[error("Image file error: {0}")]
    Image(String),
}

#[cfg(feature = "image")]
impl From<::image::ImageError> for NblicError {
    fn from(err: ::image::ImageError) -> Self {
        match err {
            ::image::ImageError::IoError(e) => NblicError::Io(e),
            other => NblicError::Image(other.to_string()),
        }
    }
}

impl From<std::collections::TryReserveError> for NblicError {
    fn from(err: std::collections::TryReserveError) -> Self {
        NblicError::Resource(format!("allocation failed: {}", err))
    }
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, NblicError>;
