// src/codec/ans/histogram.rs

//! Static symbol histograms: normalisation, lookup tables and the packed
//! 16-bit serialisation.
//!
//! Serialised form, one 16-bit word per code:
//!
//! ```text
//! 0AAAAAAAAAAAAAAA   one 15-bit count
//! 10BBBBBBBCCCCCCC   two 7-bit counts
//! 1111DDDDEEEEFFFF   three 4-bit counts
//! 11XXKKKKRRRRRRRR   XX (0..=2) repeated R+4 times, then KKKK unless KKKK == XX
//! ```
//!
//! Codes are emitted until the running sum reaches [`NORM_SUM`]; everything
//! after that is implicitly zero.

use super::WordReader;
use crate::utils::error::{NblicError, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

/// Symbols per histogram.
pub const ALPHABET: usize = 256;
/// Normalised histograms sum to `1 << NORM_BITS`.
pub const NORM_BITS: u32 = 15;
pub const NORM_SUM: u32 = 1 << NORM_BITS;
pub const NORM_MASK: u32 = NORM_SUM - 1;

pub type Histogram = [u32; ALPHABET];

/// Scales raw counts to sum to exactly [`NORM_SUM`], keeping every seen
/// symbol codable. A histogram with fewer than two symbols still gets two
/// non-zero entries.
pub fn normalize(counts: &Histogram) -> Histogram {
    let mut hist = *counts;
    let sum: u64 = hist.iter().map(|&h| h as u64).sum();
    let nonzero = hist.iter().filter(|&&h| h > 0).count();

    match nonzero {
        0 => {
            hist[0] = NORM_SUM - 1;
            hist[1] = 1;
        }
        1 => {
            let j = hist.iter().position(|&h| h > 0).unwrap_or(0);
            hist[j] = NORM_SUM - 1;
            hist[(j + 1) % ALPHABET] = 1;
        }
        _ => {
            let mut total = 0u32;
            for h in hist.iter_mut().filter(|h| **h > 0) {
                // round(h * NORM_SUM / sum) with a 0.49 bias
                let scaled = (100 * *h as u64 * NORM_SUM as u64 + 49 * sum) / (100 * sum);
                *h = (scaled as u32).max(1);
                total += *h;
            }
            let mut i = 0;
            while total > NORM_SUM {
                if hist[i] > 1 {
                    hist[i] -= 1;
                    total -= 1;
                }
                i = (i + 1) % ALPHABET;
            }
            while total < NORM_SUM {
                if hist[i] > 0 {
                    hist[i] += 1;
                    total += 1;
                }
                i = (i + 1) % ALPHABET;
            }
        }
    }
    hist
}

/// Writes a normalised histogram.
pub fn write_histogram<W: Write>(writer: &mut W, hist: &Histogram) -> Result<()> {
    let mut i = 0;
    let mut sum = 0u32;
    while i < ALPHABET && sum < NORM_SUM {
        let h0 = hist[i];
        let run_end = (i + 1..ALPHABET).find(|&j| hist[j] != h0).unwrap_or(ALPHABET);
        let run = run_end - i;

        let (code, next) = if h0 <= 2 && run >= 4 {
            let (tail, next) = match hist.get(run_end) {
                Some(&he) if he <= 15 => (he, run_end + 1),
                _ => (h0, run_end),
            };
            ((3 << 14) | (h0 << 12) | (tail << 8) | (run as u32 - 4), next)
        } else {
            let h1 = hist.get(i + 1).copied();
            let h2 = hist.get(i + 2).copied();
            match (h1, h2) {
                (Some(h1), Some(h2)) if h0 <= 15 && h1 <= 15 && h2 <= 15 => {
                    ((15 << 12) | (h0 << 8) | (h1 << 4) | h2, i + 3)
                }
                (Some(h1), _) if h0 <= 127 && h1 <= 127 => ((2 << 14) | (h0 << 7) | h1, i + 2),
                _ if h0 < NORM_SUM => (h0, i + 1),
                _ => {
                    return Err(NblicError::Histogram(format!(
                        "count {h0} at symbol {i} cannot be serialised"
                    )));
                }
            }
        };

        writer.write_u16::<LittleEndian>(code as u16)?;
        sum += hist[i..next].iter().sum::<u32>();
        i = next;
    }
    Ok(())
}

/// Reads one histogram and checks that it sums to exactly [`NORM_SUM`].
pub fn read_histogram(reader: &mut WordReader<'_>) -> Result<Histogram> {
    let mut hist = [0u32; ALPHABET];
    let mut i = 0;
    let mut sum = 0u32;

    fn push(hist: &mut Histogram, i: &mut usize, sum: &mut u32, v: u32) -> Result<()> {
        let slot = hist.get_mut(*i).ok_or_else(|| {
            NblicError::Histogram(format!("histogram overruns {ALPHABET} symbols"))
        })?;
        *slot = v;
        *sum += v;
        *i += 1;
        Ok(())
    }

    while i < ALPHABET && sum < NORM_SUM {
        let code = reader.next_word()? as u32;
        if code >> 15 == 0 {
            push(&mut hist, &mut i, &mut sum, code)?;
        } else if code >> 14 == 2 {
            push(&mut hist, &mut i, &mut sum, (code >> 7) & 0x7f)?;
            push(&mut hist, &mut i, &mut sum, code & 0x7f)?;
        } else if code >> 12 == 15 {
            push(&mut hist, &mut i, &mut sum, (code >> 8) & 0xf)?;
            push(&mut hist, &mut i, &mut sum, (code >> 4) & 0xf)?;
            push(&mut hist, &mut i, &mut sum, code & 0xf)?;
        } else {
            let run = (code & 0xff) + 4;
            let tail = (code >> 8) & 0xf;
            let h0 = (code >> 12) & 0x3;
            for _ in 0..run {
                push(&mut hist, &mut i, &mut sum, h0)?;
            }
            if tail != h0 {
                push(&mut hist, &mut i, &mut sum, tail)?;
            }
        }
    }

    if sum != NORM_SUM {
        return Err(NblicError::Histogram(format!(
            "histogram sums to {sum}, expected {NORM_SUM}"
        )));
    }
    Ok(hist)
}

/// Frequencies, cumulative frequencies and (for decoding) the slot to
/// symbol lookup of one normalised histogram.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    freq: Histogram,
    cum: Histogram,
    lookup: Vec<u8>,
}

impl SymbolTable {
    /// Builds the encode-side table.
    pub fn new(freq: Histogram) -> Self {
        let mut cum = [0u32; ALPHABET];
        for i in 1..ALPHABET {
            cum[i] = cum[i - 1] + freq[i - 1];
        }
        Self {
            freq,
            cum,
            lookup: Vec::new(),
        }
    }

    /// Builds the table including the decode lookup.
    pub fn with_lookup(freq: Histogram) -> Result<Self> {
        let total: u64 = freq.iter().map(|&f| f as u64).sum();
        if total != NORM_SUM as u64 {
            return Err(NblicError::Histogram(format!(
                "histogram sums to {total}, expected {NORM_SUM}"
            )));
        }
        let mut table = Self::new(freq);
        let mut lookup = Vec::new();
        lookup.try_reserve_exact(NORM_SUM as usize)?;
        for v in 0..ALPHABET - 1 {
            lookup.extend(std::iter::repeat_n(v as u8, table.freq[v] as usize));
        }
        lookup.resize(NORM_SUM as usize, (ALPHABET - 1) as u8);
        table.lookup = lookup;
        Ok(table)
    }

    #[inline]
    pub fn freq(&self, symbol: usize) -> u32 {
        self.freq[symbol]
    }

    #[inline]
    pub fn cum(&self, symbol: usize) -> u32 {
        self.cum[symbol]
    }

    /// Symbol owning `slot`, which must be below [`NORM_SUM`].
    #[inline]
    pub fn symbol_at(&self, slot: u32) -> usize {
        self.lookup[slot as usize] as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(hist: &Histogram) -> Histogram {
        let mut buf = Vec::new();
        write_histogram(&mut buf, hist).unwrap();
        let mut reader = WordReader::new(&buf, 0);
        let back = read_histogram(&mut reader).unwrap();
        assert_eq!(reader.position(), buf.len());
        back
    }

    fn sums_to_norm(hist: &Histogram) -> bool {
        hist.iter().sum::<u32>() == NORM_SUM
    }

    #[test]
    fn test_normalize_empty_and_single() {
        let h = normalize(&[0; ALPHABET]);
        assert_eq!((h[0], h[1]), (NORM_SUM - 1, 1));

        let mut counts = [0; ALPHABET];
        counts[255] = 40;
        let h = normalize(&counts);
        assert_eq!((h[255], h[0]), (NORM_SUM - 1, 1));
        assert!(sums_to_norm(&h));
    }

    #[test]
    fn test_normalize_keeps_rare_symbols() {
        let mut counts = [0; ALPHABET];
        counts[0] = 1_000_000;
        counts[1] = 1;
        counts[200] = 3;
        let h = normalize(&counts);
        assert!(sums_to_norm(&h));
        assert!(h[1] >= 1 && h[200] >= 1);
        assert_eq!(h[2], 0);
    }

    #[test]
    fn test_normalize_many_symbols() {
        let mut counts = [0; ALPHABET];
        for (i, c) in counts.iter_mut().enumerate() {
            *c = (i as u32 * 7919) % 97 + 1;
        }
        let h = normalize(&counts);
        assert!(sums_to_norm(&h));
        assert!(h.iter().all(|&v| v > 0));
    }

    #[test]
    fn test_serialisation_roundtrip_shapes() {
        // geometric decay: large head, long tail of ones and zeros
        let mut counts = [0; ALPHABET];
        let mut v = 1u32 << 20;
        for c in counts.iter_mut().take(60) {
            *c = v;
            v = v * 7 / 8 + 1;
        }
        counts[250] = 2;
        let h = normalize(&counts);
        assert_eq!(roundtrip(&h), h);

        let mut counts = [0; ALPHABET];
        for (i, c) in counts.iter_mut().enumerate() {
            *c = (i as u32 % 5) + 1;
        }
        let h = normalize(&counts);
        assert_eq!(roundtrip(&h), h);

        let h = normalize(&[0; ALPHABET]);
        assert_eq!(roundtrip(&h), h);
    }

    #[test]
    fn test_lookup_covers_every_slot() {
        let mut counts = [0; ALPHABET];
        counts[3] = 10;
        counts[4] = 30;
        counts[255] = 5;
        let table = SymbolTable::with_lookup(normalize(&counts)).unwrap();
        for slot in 0..NORM_SUM {
            let s = table.symbol_at(slot);
            assert!(table.freq(s) > 0, "slot {slot} maps to empty symbol {s}");
            assert!(table.cum(s) <= slot && slot < table.cum(s) + table.freq(s));
        }
    }

    #[test]
    fn test_read_rejects_bad_sum() {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(100).unwrap();
        for _ in 0..255 {
            buf.write_u16::<LittleEndian>(0).unwrap();
        }
        let err = read_histogram(&mut WordReader::new(&buf, 0)).unwrap_err();
        assert!(matches!(err, NblicError::Histogram(_)));
    }

    #[test]
    fn test_read_rejects_overrun() {
        // a run of 259 zeros starting at the last symbol
        let mut buf = Vec::new();
        for _ in 0..255 {
            buf.write_u16::<LittleEndian>(1).unwrap();
        }
        buf.write_u16::<LittleEndian>(0xc0ff).unwrap();
        let err = read_histogram(&mut WordReader::new(&buf, 0)).unwrap_err();
        assert!(matches!(err, NblicError::Histogram(_)));
    }

    #[test]
    fn test_read_truncated() {
        let buf = [0x00u8, 0x10];
        let err = read_histogram(&mut WordReader::new(&buf, 9)).unwrap_err();
        assert!(matches!(err, NblicError::Truncated { offset: 11 }));
    }
}
