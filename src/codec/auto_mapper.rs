// src/codec/auto_mapper.rs

//! Move-toward-front ranking of small residual codes.

use crate::codec::N_MAPPER;

/// Rank <-> code permutation over `[0, N_MAPPER)` with a count per rank.
/// Codes at or above `N_MAPPER` pass through untouched.
#[derive(Clone, Debug)]
pub struct AutoMapper {
    y2z: [u8; N_MAPPER],
    z2y: [u8; N_MAPPER],
    hist: [u32; N_MAPPER],
}

impl Default for AutoMapper {
    fn default() -> Self {
        let mut m = Self {
            y2z: [0; N_MAPPER],
            z2y: [0; N_MAPPER],
            hist: [0; N_MAPPER],
        };
        for i in 0..N_MAPPER {
            m.y2z[i] = i as u8;
            m.z2y[i] = i as u8;
            m.hist[i] = ((N_MAPPER - 1 - i) * 2) as u32;
        }
        m
    }
}

impl AutoMapper {
    /// Code to rank.
    pub fn to_rank(&self, y: u32) -> u32 {
        match self.y2z.get(y as usize) {
            Some(&z) => z as u32,
            None => y,
        }
    }

    /// Rank to code.
    pub fn from_rank(&self, z: u32) -> u32 {
        match self.z2y.get(z as usize) {
            Some(&y) => y as u32,
            None => z,
        }
    }

    /// Counts one occurrence of code `y`, swapping it one rank forward when
    /// it has overtaken its neighbour.
    pub fn observe(&mut self, y: u32) {
        let Some(&z) = self.y2z.get(y as usize) else {
            return;
        };
        let z = z as usize;
        self.hist[z] += 1;
        if z == 0 || self.hist[z - 1] >= self.hist[z] {
            return;
        }
        let y2 = self.z2y[z - 1];
        self.hist.swap(z, z - 1);
        self.z2y[z] = y2;
        self.z2y[z - 1] = y as u8;
        self.y2z[y as usize] = (z - 1) as u8;
        self.y2z[y2 as usize] = z as u8;
    }

    #[cfg(test)]
    fn is_permutation(&self) -> bool {
        (0..N_MAPPER).all(|y| self.z2y[self.y2z[y] as usize] as usize == y)
    }
}

/// One mapper per (corrected prediction, sign bit).
#[derive(Clone, Debug)]
pub struct AutoMapperBank {
    maps: Vec<AutoMapper>,
}

impl Default for AutoMapperBank {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoMapperBank {
    pub fn new() -> Self {
        Self {
            maps: vec![AutoMapper::default(); 256 * 2],
        }
    }

    pub fn get(&self, px: i32, sign: bool) -> &AutoMapper {
        &self.maps[Self::index(px, sign)]
    }

    pub fn get_mut(&mut self, px: i32, sign: bool) -> &mut AutoMapper {
        &mut self.maps[Self::index(px, sign)]
    }

    fn index(px: i32, sign: bool) -> usize {
        (px.clamp(0, 255) as usize) << 1 | sign as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_as_identity() {
        let m = AutoMapper::default();
        for y in 0..40 {
            assert_eq!(m.to_rank(y), y);
            assert_eq!(m.from_rank(y), y);
        }
    }

    #[test]
    fn test_frequent_code_moves_forward() {
        let mut m = AutoMapper::default();
        // rank 3 starts at 32, rank 2 at 34
        m.observe(3);
        m.observe(3);
        assert_eq!(m.to_rank(3), 3);
        m.observe(3);
        assert_eq!(m.to_rank(3), 2);
        assert_eq!(m.from_rank(2), 3);
        assert_eq!(m.to_rank(2), 3);
        assert!(m.is_permutation());
    }

    #[test]
    fn test_moves_one_rank_per_update() {
        let mut m = AutoMapper::default();
        for _ in 0..200 {
            let before = m.to_rank(19);
            m.observe(19);
            assert!(before - m.to_rank(19) <= 1);
        }
        assert_eq!(m.to_rank(19), 0);
    }

    #[test]
    fn test_permutation_survives_mixed_updates() {
        let mut m = AutoMapper::default();
        let mut seed = 12345u32;
        for _ in 0..5000 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            m.observe((seed >> 16) % 24);
            assert!(m.is_permutation());
        }
    }

    #[test]
    fn test_large_codes_pass_through() {
        let mut m = AutoMapper::default();
        m.observe(200);
        assert_eq!(m.to_rank(200), 200);
        assert_eq!(m.from_rank(N_MAPPER as u32), N_MAPPER as u32);
    }
}
