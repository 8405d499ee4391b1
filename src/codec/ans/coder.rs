// src/codec/ans/coder.rs

//! Range ANS over 16-bit words.
//!
//! The state lives in `[2^16, 2^32)`. Symbols are pushed in reverse order;
//! the finished word stream is reversed so the decoder reads forward.

use super::histogram::{SymbolTable, NORM_BITS, NORM_MASK};
use super::WordReader;
use crate::utils::error::{NblicError, Result};

const WORD_BITS: u32 = 16;
const WORD_MASK: u32 = (1 << WORD_BITS) - 1;
/// Lower bound of the normalised state; also the initial encoder state.
pub const STATE_LOW: u32 = 1 << WORD_BITS;
/// `state / freq` above this must shed a word before encoding.
const QUOTIENT_HIGH: u32 = (1 << (2 * WORD_BITS - NORM_BITS)) - 1;

/// rANS encoder collecting its output words in memory.
pub struct RansEncoder {
    state: u32,
    words: Vec<u16>,
}

impl Default for RansEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RansEncoder {
    pub fn new() -> Self {
        Self {
            state: STATE_LOW,
            words: Vec::new(),
        }
    }

    /// Pushes `symbol`. Symbols must arrive last-decoded-first.
    pub fn put(&mut self, table: &SymbolTable, symbol: usize) -> Result<()> {
        let freq = table.freq(symbol);
        if freq == 0 {
            return Err(NblicError::Histogram(format!(
                "symbol {symbol} has zero frequency"
            )));
        }
        let mut quotient = self.state / freq;
        if quotient > QUOTIENT_HIGH {
            self.words.try_reserve(1)?;
            self.words.push((self.state & WORD_MASK) as u16);
            self.state >>= WORD_BITS;
            quotient = self.state / freq;
        }
        self.state = (self.state % freq) + (quotient << NORM_BITS) + table.cum(symbol);
        Ok(())
    }

    /// Appends the final state and returns the words in decoding order.
    pub fn finish(mut self) -> Result<Vec<u16>> {
        self.words.try_reserve(2)?;
        self.words.push((self.state & WORD_MASK) as u16);
        self.words.push((self.state >> WORD_BITS) as u16);
        self.words.reverse();
        Ok(self.words)
    }
}

/// rANS decoder reading words from a [`WordReader`].
pub struct RansDecoder<'a> {
    state: u32,
    reader: WordReader<'a>,
}

impl<'a> RansDecoder<'a> {
    pub fn new(mut reader: WordReader<'a>) -> Result<Self> {
        let hi = reader.next_word()? as u32;
        let lo = reader.next_word()? as u32;
        Ok(Self {
            state: (hi << WORD_BITS) | lo,
            reader,
        })
    }

    pub fn get(&mut self, table: &SymbolTable) -> Result<usize> {
        let slot = self.state & NORM_MASK;
        let symbol = table.symbol_at(slot);
        self.state = (self.state >> NORM_BITS) * table.freq(symbol) + slot - table.cum(symbol);
        if self.state < STATE_LOW {
            self.state = (self.state << WORD_BITS) | self.reader.next_word()? as u32;
        }
        Ok(symbol)
    }

    /// True once the state is back at the encoder's starting point and
    /// every word has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.state == STATE_LOW && self.reader.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.reader.position()
    }
}

#[cfg(test)]
mod tests {
    use super::super::histogram::{normalize, ALPHABET};
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};

    fn to_bytes(words: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        for &w in words {
            out.write_u16::<LittleEndian>(w).unwrap();
        }
        out
    }

    fn skewed_table() -> SymbolTable {
        let mut counts = [0u32; ALPHABET];
        for (i, c) in counts.iter_mut().enumerate().take(40) {
            *c = (4000 >> (i / 3)) + 1;
        }
        counts[255] = 1;
        SymbolTable::with_lookup(normalize(&counts)).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let table = skewed_table();
        let mut seed = 99u32;
        let mut symbols = Vec::new();
        for _ in 0..30_000 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let s = ((seed >> 16) % 40) as usize;
            symbols.push(if seed % 997 == 0 { 255 } else { s });
        }

        let mut enc = RansEncoder::new();
        for &s in symbols.iter().rev() {
            enc.put(&table, s).unwrap();
        }
        let bytes = to_bytes(&enc.finish().unwrap());

        let mut dec = RansDecoder::new(WordReader::new(&bytes, 0)).unwrap();
        for (i, &s) in symbols.iter().enumerate() {
            assert_eq!(dec.get(&table).unwrap(), s, "symbol {i}");
        }
        assert!(dec.is_exhausted());
    }

    #[test]
    fn test_empty_sequence() {
        let words = RansEncoder::new().finish().unwrap();
        assert_eq!(words, vec![1, 0]);
        let bytes = to_bytes(&words);
        let dec = RansDecoder::new(WordReader::new(&bytes, 0)).unwrap();
        assert!(dec.is_exhausted());
    }

    #[test]
    fn test_zero_frequency_is_rejected() {
        let table = skewed_table();
        let mut enc = RansEncoder::new();
        assert!(matches!(enc.put(&table, 100), Err(NblicError::Histogram(_))));
    }
}
