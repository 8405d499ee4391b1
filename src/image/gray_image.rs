// src/image/gray_image.rs

//! Owned 8-bit gray image and the file collaborators around the codec.

use crate::image::grid::PixelGrid;
#[cfg(feature = "image")]
use crate::utils::error::NblicError;
use crate::utils::error::Result;
#[cfg(feature = "image")]
use log::debug;
use std::fs;
use std::path::Path;

/// A row-major 8-bit single channel image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl GrayImage {
    /// Wraps `pixels`, which must hold exactly `width * height` samples.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        PixelGrid::new(&pixels, width, height)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    pub fn grid(&self) -> PixelGrid<'_> {
        PixelGrid::view(&self.pixels, self.width)
    }
}

/// Reads a whole file.
pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Writes `bytes` to a file, replacing it.
pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    Ok(fs::write(path, bytes)?)
}

/// Loads any raster the `image` crate can sniff from the file contents
/// (PGM and BMP among them) and converts it to 8-bit luminance.
#[cfg(feature = "image")]
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    let decoded = ::image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .into_luma8();
    let (width, height) = decoded.dimensions();
    let image = GrayImage::new(width as usize, height as usize, decoded.into_raw())?;
    debug!("loaded {} ({}x{})", path.display(), image.width, image.height);
    Ok(image)
}

/// Saves as 8-bit BMP when the extension is `.bmp`, as binary PGM otherwise.
#[cfg(feature = "image")]
pub fn save_image<P: AsRef<Path>>(path: P, image: &GrayImage) -> Result<()> {
    let path = path.as_ref();
    let is_bmp = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("bmp"));
    let format = if is_bmp {
        ::image::ImageFormat::Bmp
    } else {
        ::image::ImageFormat::Pnm
    };

    let too_large = || {
        NblicError::Image(format!(
            "{}x{} image is too large to save",
            image.width, image.height
        ))
    };
    let width = u32::try_from(image.width).map_err(|_| too_large())?;
    let height = u32::try_from(image.height).map_err(|_| too_large())?;
    let buffer = ::image::GrayImage::from_raw(width, height, image.pixels.clone())
        .ok_or_else(too_large)?;
    buffer.save_with_format(path, format)?;
    debug!("saved {} as {:?}", path.display(), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::NblicError;

    #[test]
    fn test_new_checks_length() {
        assert!(GrayImage::new(3, 2, vec![0; 6]).is_ok());
        assert!(matches!(
            GrayImage::new(3, 2, vec![0; 5]),
            Err(NblicError::DimensionMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_get() {
        let img = GrayImage::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(img.get(1, 0), Some(2));
        assert_eq!(img.get(0, 1), Some(3));
        assert_eq!(img.get(2, 0), None);
        assert_eq!(img.grid().get(1, 1), Some(4));
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.raw");
        write_bytes(&path, b"hello").unwrap();
        assert!(matches!(load_image(&path), Err(NblicError::Image(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_bytes(dir.path().join("missing")),
            Err(NblicError::Io(_))
        ));
    }
}
