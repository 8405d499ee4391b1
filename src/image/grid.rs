// src/image/grid.rs

//! Bounds-checked, read-only view over a row-major 8-bit pixel buffer.

use crate::utils::error::{NblicError, Result};

/// A borrowed `height x width` grid of 8-bit samples stored row by row.
///
/// Coordinates are signed so that causal neighbours above or left of the
/// image can be requested directly; anything outside the grid reads back as
/// the caller's fallback value.
#[derive(Clone, Copy, Debug)]
pub struct PixelGrid<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> PixelGrid<'a> {
    /// Wraps `data`, checking that it holds exactly `height * width` samples.
    pub fn new(data: &'a [u8], width: usize, height: usize) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| NblicError::InvalidParameter("image size overflows".to_string()))?;
        if data.len() != expected {
            return Err(NblicError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::view(data, width))
    }

    /// Wraps a buffer whose length is a whole number of rows.
    ///
    /// Used by the decoder on its partially reconstructed output, where the
    /// rows below the current one exist but are not yet meaningful.
    pub(crate) fn view(data: &'a [u8], width: usize) -> Self {
        let height = if width == 0 { 0 } else { data.len() / width };
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the sample at (`row`, `col`), or `None` outside the grid.
    #[inline]
    pub fn get(&self, row: isize, col: isize) -> Option<u8> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Returns the sample at (`row`, `col`) widened to `i32`, or `fallback`.
    #[inline]
    pub fn get_or(&self, row: isize, col: isize, fallback: i32) -> i32 {
        match self.get(row, col) {
            Some(v) => v as i32,
            None => fallback,
        }
    }

    /// Returns one full row.
    pub fn row(&self, row: usize) -> &'a [u8] {
        &self.data[row * self.width..(row + 1) * self.width]
    }
}
