//! Gray image container and the file collaborators around the codec.

pub mod gray_image;
pub mod grid;

pub use gray_image::{read_bytes, write_bytes, GrayImage};
#[cfg(feature = "image")]
pub use gray_image::{load_image, save_image};
pub use grid::PixelGrid;
