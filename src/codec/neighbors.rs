// src/codec/neighbors.rs

//! Causal neighbourhood sampling.
//!
//! Every stage of the per-pixel pipeline looks at the same eleven already
//! coded samples around the current position:
//!
//! ```text
//!           s  h  f  g  r
//!              q  c  b  d
//!                 e  a  x
//! ```
//!
//! Missing samples are replaced by the nearest neighbour that does exist, so
//! only the very first pixel of an image ever sees the mid-gray fallback.

use crate::codec::MID_VAL;
use crate::image::grid::PixelGrid;

/// The eleven causal neighbours of one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborSet {
    /// West.
    pub a: i32,
    /// North.
    pub b: i32,
    /// North-west.
    pub c: i32,
    /// North-east.
    pub d: i32,
    /// West-west.
    pub e: i32,
    /// North-north.
    pub f: i32,
    /// North-north-east.
    pub g: i32,
    /// North-north-west.
    pub h: i32,
    /// North-west-west.
    pub q: i32,
    /// North-north-east-east.
    pub r: i32,
    /// North-north-west-west.
    pub s: i32,
}

impl NeighborSet {
    /// Samples the neighbourhood of (`row`, `col`).
    ///
    /// Only rows `< row` and the first `col` samples of `row` are read.
    pub fn sample(grid: &PixelGrid<'_>, row: usize, col: usize) -> Self {
        let (i, j) = (row as isize, col as isize);

        let mut a = grid.get_or(i, j - 1, MID_VAL);
        let mut b = grid.get_or(i - 1, j, MID_VAL);
        if i == 0 {
            b = a;
        } else if j == 0 {
            a = b;
        }
        let e = grid.get_or(i, j - 2, a);
        let c = grid.get_or(i - 1, j - 1, b);
        let d = grid.get_or(i - 1, j + 1, b);
        let f = grid.get_or(i - 2, j, b);
        let g = grid.get_or(i - 2, j + 1, f);
        let h = grid.get_or(i - 2, j - 1, f);
        let q = grid.get_or(i - 1, j - 2, c);
        let r = grid.get_or(i - 2, j + 2, g);
        let s = grid.get_or(i - 2, j - 2, h);

        Self {
            a,
            b,
            c,
            d,
            e,
            f,
            g,
            h,
            q,
            r,
            s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Vec<u8> {
        (0..width * height).map(|v| v as u8).collect()
    }

    #[test]
    fn test_first_pixel_is_mid_gray() {
        let data = ramp(4, 4);
        let grid = PixelGrid::new(&data, 4, 4).unwrap();
        let nb = NeighborSet::sample(&grid, 0, 0);
        assert_eq!(nb.a, MID_VAL);
        assert_eq!(nb.b, MID_VAL);
        assert_eq!(nb.s, MID_VAL);
    }

    #[test]
    fn test_first_row_north_follows_west() {
        let data = ramp(4, 4);
        let grid = PixelGrid::new(&data, 4, 4).unwrap();
        let nb = NeighborSet::sample(&grid, 0, 2);
        assert_eq!(nb.a, 1);
        assert_eq!(nb.b, 1);
        assert_eq!(nb.e, 0);
        assert_eq!(nb.c, 1);
        assert_eq!(nb.d, 1);
        assert_eq!(nb.f, 1);
    }

    #[test]
    fn test_first_column_west_follows_north() {
        let data = ramp(4, 4);
        let grid = PixelGrid::new(&data, 4, 4).unwrap();
        let nb = NeighborSet::sample(&grid, 2, 0);
        assert_eq!(nb.b, 4);
        assert_eq!(nb.a, 4);
        assert_eq!(nb.d, 5);
        assert_eq!(nb.f, 0);
        assert_eq!(nb.g, 1);
        assert_eq!(nb.r, 2);
        // north-west falls back to north
        assert_eq!(nb.c, 4);
    }

    #[test]
    fn test_interior_pixel() {
        let data = ramp(5, 3);
        let grid = PixelGrid::new(&data, 5, 3).unwrap();
        let nb = NeighborSet::sample(&grid, 2, 2);
        assert_eq!(
            nb,
            NeighborSet {
                a: 11,
                b: 7,
                c: 6,
                d: 8,
                e: 10,
                f: 2,
                g: 3,
                h: 1,
                q: 5,
                r: 4,
                s: 0,
            }
        );
    }

    #[test]
    fn test_right_edge_north_east_falls_back() {
        let data = ramp(3, 3);
        let grid = PixelGrid::new(&data, 3, 3).unwrap();
        let nb = NeighborSet::sample(&grid, 2, 2);
        assert_eq!(nb.d, nb.b);
        assert_eq!(nb.g, nb.f);
        assert_eq!(nb.r, nb.g);
    }
}
