//! Entropy back-end A: adaptive binary arithmetic coding of a magnitude tree.

pub mod coder;
pub mod tree;

pub use coder::{ArithDecoder, ArithEncoder};
pub use tree::{BinCounter, TreeDecoder, TreeEncoder};
