// src/codec/arith/coder.rs

//! Base-255 binary arithmetic coder.
//!
//! The interval register works in two base-255 digits (`0..255*255`).
//! Output is delayed by two digits so a carry can still be folded into
//! bytes that have not been written yet.

use crate::utils::error::{NblicError, Result};
use byteorder::WriteBytesExt;
use std::io::Write;

/// Probability scale: `prob` arguments are `P(bit = 0) * PROB_ONE`.
pub const PROB_ONE: u32 = 1 << 16;

/// Full interval, two base-255 digits.
const RANGE_TOP: u32 = 0xff * 0xff;
/// Renormalise once the interval is this small.
const RANGE_MIN: u32 = 0xff;

const SPLIT_THRESHOLDS: [u32; 30] = [
    0x7800, 0x7000, 0x6800, 0x6000, 0x5800, 0x5000, 0x4800, 0x4000, 0x3c00, 0x3800, 0x3400,
    0x3000, 0x2c00, 0x2800, 0x2400, 0x2000, 0x1c00, 0x1800, 0x1400, 0x1000, 0x0e00, 0x0c00,
    0x0a00, 0x0800, 0x0600, 0x0400, 0x0300, 0x0200, 0x0180, 0x0101,
];

const SPLIT_WIDTHS: [u32; 31] = [
    0x7ab6, 0x7068, 0x6678, 0x5ce2, 0x53a6, 0x4ac0, 0x4230, 0x39f4, 0x33fc, 0x301a, 0x2c4c,
    0x2892, 0x24ea, 0x2156, 0x1dd6, 0x1a66, 0x170a, 0x13c0, 0x1086, 0x0d60, 0x0b0e, 0x0986,
    0x0804, 0x0686, 0x050a, 0x0394, 0x027e, 0x01c6, 0x013e, 0x0100, 0x0002,
];

/// Width of the MPS sub-interval of `range` for an LPS probability
/// `lps_prob` (at most `PROB_ONE / 2`).
fn mps_width(range: u32, lps_prob: u32) -> u32 {
    let i = SPLIT_THRESHOLDS
        .iter()
        .position(|&th| th < lps_prob)
        .unwrap_or(SPLIT_THRESHOLDS.len());
    let mut lps = SPLIT_WIDTHS[i];

    let mut half = 0x8000;
    while half > range {
        if lps > 0x0002 {
            lps >>= 1;
        }
        half >>= 1;
    }

    let mps = range - lps;
    if mps < half { (mps + half) / 2 } else { mps }
}

/// Splits a `P(0)` into the more probable bit and its LPS probability.
#[inline]
fn classify(prob0: u32) -> (bool, u32) {
    let mps = prob0 < PROB_ONE / 2;
    (mps, if mps { prob0 } else { PROB_ONE - prob0 })
}

/// Arithmetic encoder writing to any byte sink.
pub struct ArithEncoder<W: Write> {
    writer: W,
    low: u32,
    range: u32,
    // delayed output digits, `pending` is older than `last`
    last: u8,
    pending: u8,
}

impl<W: Write> ArithEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            low: 0,
            range: RANGE_TOP,
            last: 0,
            pending: 0,
        }
    }

    /// Codes `bit` with probability `prob0` of it being 0.
    #[inline]
    pub fn encode(&mut self, bit: bool, prob0: u32) -> Result<()> {
        let (mps, lps_prob) = classify(prob0);
        let split = mps_width(self.range, lps_prob);
        if bit == mps {
            self.range = split;
        } else {
            self.range -= split;
            self.low += split;
        }
        if self.range <= RANGE_MIN {
            self.shift_digit()?;
            self.range *= 0xff;
        }
        Ok(())
    }

    fn shift_digit(&mut self) -> Result<()> {
        if self.low >= RANGE_TOP {
            self.low -= RANGE_TOP;
            self.last = self.last.wrapping_add(1);
            if self.last == 0xff {
                self.last = 0;
                self.pending = self.pending.wrapping_add(1);
            }
        }
        self.writer.write_u8(self.pending)?;
        self.pending = self.last;
        self.last = (((self.low >> 8) + self.low + 1) >> 8) as u8;
        self.low = ((self.low + self.last as u32) & 0xff) * 0xff;
        Ok(())
    }

    /// Flushes the remaining digits and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        for _ in 0..4 {
            self.shift_digit()?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Arithmetic decoder over a byte slice; `base` is the slice's offset in
/// the full stream and only feeds error reports.
pub struct ArithDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    code: u32,
    range: u32,
}

impl<'a> ArithDecoder<'a> {
    pub fn new(data: &'a [u8], base: usize) -> Result<Self> {
        let mut dec = Self {
            data,
            pos: 2,
            base,
            code: 0,
            range: RANGE_TOP,
        };
        let hi = dec.next_byte()? as u32;
        let lo = dec.next_byte()? as u32;
        dec.code = hi * 0xff + lo;
        dec.check_code()?;
        Ok(dec)
    }

    /// Any encoder output keeps `code` inside the interval.
    fn check_code(&self) -> Result<()> {
        if self.code < self.range {
            Ok(())
        } else {
            Err(NblicError::Corrupt(format!(
                "arithmetic code left its interval at byte {}",
                self.base + self.pos
            )))
        }
    }

    fn next_byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or(NblicError::Truncated {
            offset: self.base + self.pos,
        })?;
        self.pos += 1;
        Ok(b)
    }

    /// Decodes one bit coded with probability `prob0` of being 0.
    #[inline]
    pub fn decode(&mut self, prob0: u32) -> Result<bool> {
        let (mps, lps_prob) = classify(prob0);
        let split = mps_width(self.range, lps_prob);
        let bit = if self.code < split {
            self.range = split;
            mps
        } else {
            self.range -= split;
            self.code -= split;
            !mps
        };
        if self.range <= RANGE_MIN {
            self.code = self.code * 0xff + self.next_byte()? as u32;
            self.range *= 0xff;
            self.check_code()?;
        }
        Ok(bit)
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}
