//! Entropy back-end B: two-pass static histograms with rANS.
//!
//! The encoder runs the whole pixel pipeline first, only recording
//! `(primary bin, code)` pairs. Once the image is done it writes one
//! normalised histogram per activity bin and rANS codes the recorded
//! sequence back to front. The decoder rebuilds the tables and then
//! decodes forward in raster order.

pub mod coder;
pub mod histogram;

pub use coder::{RansDecoder, RansEncoder};
pub use histogram::{normalize, read_histogram, write_histogram, Histogram, SymbolTable};

use crate::codec::context::QuantizedContext;
use crate::codec::{SymbolDecoder, SymbolEncoder, N_QD};
use crate::utils::error::{NblicError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use histogram::ALPHABET;
use log::trace;
use std::io::{Cursor, Write};

/// Checked little-endian 16-bit word reader. `base` is the offset of the
/// slice in the full stream and only feeds error reports.
pub struct WordReader<'a> {
    cursor: Cursor<&'a [u8]>,
    base: usize,
}

impl<'a> WordReader<'a> {
    pub fn new(data: &'a [u8], base: usize) -> Self {
        Self {
            cursor: Cursor::new(data),
            base,
        }
    }

    pub fn next_word(&mut self) -> Result<u16> {
        let offset = self.base + self.position();
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| NblicError::Truncated { offset })
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }
}

/// First pass of the histogram back-end: records every symbol.
pub struct HistogramEncoder {
    counts: Vec<Histogram>,
    symbols: Vec<(u8, u8)>,
}

impl HistogramEncoder {
    /// `expected` is the number of symbols that will be recorded.
    pub fn new(expected: usize) -> Result<Self> {
        let mut symbols = Vec::new();
        symbols.try_reserve_exact(expected)?;
        Ok(Self {
            counts: vec![[0; ALPHABET]; N_QD],
            symbols,
        })
    }

    /// Writes the histograms and the rANS stream for everything recorded.
    pub fn finish<W: Write>(self, writer: &mut W) -> Result<()> {
        let mut tables = Vec::with_capacity(N_QD);
        for (bin, counts) in self.counts.iter().enumerate() {
            let hist = normalize(counts);
            trace!(
                "bin {bin}: {} symbols, {} distinct",
                counts.iter().sum::<u32>(),
                counts.iter().filter(|&&c| c > 0).count()
            );
            write_histogram(writer, &hist)?;
            tables.push(SymbolTable::new(hist));
        }

        let mut rans = RansEncoder::new();
        for &(bin, z) in self.symbols.iter().rev() {
            rans.put(&tables[bin as usize], z as usize)?;
        }
        for word in rans.finish()? {
            writer.write_u16::<LittleEndian>(word)?;
        }
        Ok(())
    }
}

impl SymbolEncoder for HistogramEncoder {
    fn encode_symbol(&mut self, ctx: &QuantizedContext, z: u32) -> Result<()> {
        let symbol = u8::try_from(z)
            .map_err(|_| NblicError::InvalidParameter(format!("code {z} exceeds the alphabet")))?;
        self.counts[ctx.primary][symbol as usize] += 1;
        self.symbols.try_reserve(1)?;
        self.symbols.push((ctx.primary as u8, symbol));
        Ok(())
    }
}

/// Histogram back-end decoder.
pub struct HistogramDecoder<'a> {
    tables: Vec<SymbolTable>,
    rans: RansDecoder<'a>,
}

impl<'a> HistogramDecoder<'a> {
    pub fn new(data: &'a [u8], base: usize) -> Result<Self> {
        let mut reader = WordReader::new(data, base);
        let mut tables = Vec::with_capacity(N_QD);
        for _ in 0..N_QD {
            tables.push(SymbolTable::with_lookup(read_histogram(&mut reader)?)?);
        }
        Ok(Self {
            tables,
            rans: RansDecoder::new(reader)?,
        })
    }

    /// Fails unless the stream ended exactly where the encoder stopped.
    pub fn finish(self) -> Result<()> {
        if self.rans.is_exhausted() {
            Ok(())
        } else {
            Err(NblicError::Corrupt(format!(
                "rANS stream not exhausted at byte {}",
                self.rans.position()
            )))
        }
    }
}

impl SymbolDecoder for HistogramDecoder<'_> {
    fn decode_symbol(&mut self, ctx: &QuantizedContext) -> Result<u32> {
        let table = &self.tables[ctx.primary];
        Ok(self.rans.get(table)? as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(primary: usize) -> QuantizedContext {
        QuantizedContext {
            primary,
            secondary: primary,
            weight: 0,
        }
    }

    #[test]
    fn test_two_pass_roundtrip() {
        let mut symbols = Vec::new();
        for i in 0..5000u32 {
            let bin = (i * 13 % N_QD as u32) as usize;
            let z = (i * i + bin as u32) % (4 + 16 * bin as u32);
            symbols.push((bin, z.min(255)));
        }

        let mut enc = HistogramEncoder::new(symbols.len()).unwrap();
        for &(bin, z) in &symbols {
            enc.encode_symbol(&ctx(bin), z).unwrap();
        }
        let mut out = Vec::new();
        enc.finish(&mut out).unwrap();

        let mut dec = HistogramDecoder::new(&out, 0).unwrap();
        for &(bin, z) in &symbols {
            assert_eq!(dec.decode_symbol(&ctx(bin)).unwrap(), z);
        }
        dec.finish().unwrap();
    }

    #[test]
    fn test_unused_bins_still_decode() {
        let mut enc = HistogramEncoder::new(1).unwrap();
        enc.encode_symbol(&ctx(4), 9).unwrap();
        let mut out = Vec::new();
        enc.finish(&mut out).unwrap();

        let mut dec = HistogramDecoder::new(&out, 0).unwrap();
        assert_eq!(dec.decode_symbol(&ctx(4)).unwrap(), 9);
        dec.finish().unwrap();
    }

    #[test]
    fn test_truncated_histogram_block() {
        let mut enc = HistogramEncoder::new(1).unwrap();
        enc.encode_symbol(&ctx(0), 0).unwrap();
        let mut out = Vec::new();
        enc.finish(&mut out).unwrap();
        let err = HistogramDecoder::new(&out[..5], 17).err().unwrap();
        assert!(matches!(err, NblicError::Truncated { .. }));
    }
}
