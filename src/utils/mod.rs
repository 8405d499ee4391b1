//! General-purpose utility modules.

pub mod error;

// Re-export commonly used items
pub use error::{NblicError, Result};
