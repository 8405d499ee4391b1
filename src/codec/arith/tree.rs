// src/codec/arith/tree.rs

//! Unary-prefix / binary-suffix magnitude code over blended counters.
//!
//! A code `z` is split into a unary part `z >> k` and a `k`-bit suffix,
//! where `k` grows with the activity bin: busy areas expect larger codes.
//! Each decision reads two counters, one per activity bin of the
//! [`QuantizedContext`], mixed by its weight.

use super::coder::{ArithDecoder, ArithEncoder, PROB_ONE};
use crate::codec::context::QuantizedContext;
use crate::codec::{SymbolDecoder, SymbolEncoder, N_QD, N_QW};
use crate::utils::error::{NblicError, Result};
use std::io::Write;

/// Slots per activity bin.
const TREE_SLOTS: usize = 256;
/// Counter pairs are halved once their total passes this.
const COUNT_LIMIT: u32 = N_QW * 256;

/// Adaptive bit counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinCounter {
    c0: u32,
    c1: u32,
}

impl Default for BinCounter {
    fn default() -> Self {
        Self { c0: N_QW, c1: N_QW }
    }
}

impl BinCounter {
    /// `P(bit = 0)` scaled to `PROB_ONE`.
    pub fn prob0(&self) -> u32 {
        PROB_ONE * self.c0 / (self.c0 + self.c1)
    }

    pub fn update(&mut self, bit: bool, weight: u32) {
        if bit {
            self.c1 += weight;
        } else {
            self.c0 += weight;
        }
        if self.c0 + self.c1 > COUNT_LIMIT {
            self.c0 = (self.c0 + 1) >> 1;
            self.c1 = (self.c1 + 1) >> 1;
        }
    }
}

/// Counters for every (activity bin, tree slot).
#[derive(Clone, Debug)]
pub struct CounterTree {
    slots: Vec<BinCounter>,
}

impl Default for CounterTree {
    fn default() -> Self {
        Self {
            slots: vec![BinCounter::default(); N_QD * TREE_SLOTS],
        }
    }
}

impl CounterTree {
    fn prob0(&self, walk: &Walk, slot: usize) -> u32 {
        let u = self.slots[walk.primary * TREE_SLOTS + slot].prob0();
        let v = self.slots[walk.secondary * TREE_SLOTS + slot].prob0();
        (u * (N_QW - walk.weight) + v * walk.weight + N_QW / 2) / N_QW
    }

    fn update(&mut self, walk: &Walk, slot: usize, bit: bool) {
        self.slots[walk.primary * TREE_SLOTS + slot].update(bit, N_QW - walk.weight);
        self.slots[walk.secondary * TREE_SLOTS + slot].update(bit, walk.weight);
    }
}

/// Position of one symbol's walk through the tree.
#[derive(Clone, Copy, Debug)]
struct Walk {
    primary: usize,
    secondary: usize,
    weight: u32,
    k_step: usize,
    k_max: usize,
    slot: usize,
}

impl Walk {
    fn new(ctx: &QuantizedContext, k_step: usize) -> Self {
        let secondary = if ctx.secondary / k_step != ctx.primary / k_step {
            ctx.primary
        } else {
            ctx.secondary
        };
        Self {
            primary: ctx.primary,
            secondary,
            weight: ctx.weight,
            k_step,
            k_max: (N_QD - 1) / k_step,
            slot: 0,
        }
    }

    /// Suffix width for the current bin.
    fn suffix_bits(&self) -> usize {
        self.primary / self.k_step
    }

    /// Moves past a "continue" decision. Escalates to a wider suffix when
    /// the unary run leaves the tree.
    fn advance(&mut self) {
        self.slot += 1 << self.k_max;
        if self.slot >= TREE_SLOTS {
            self.slot >>= 1;
            self.primary = (self.suffix_bits() + 1) * self.k_step;
            self.secondary = self.primary;
        }
    }
}

/// Back-end A encoder: tree walk over an [`ArithEncoder`].
pub struct TreeEncoder<W: Write> {
    coder: ArithEncoder<W>,
    tree: CounterTree,
    k_step: usize,
}

impl<W: Write> TreeEncoder<W> {
    pub fn new(writer: W, k_step: u8) -> Self {
        Self {
            coder: ArithEncoder::new(writer),
            tree: CounterTree::default(),
            k_step: k_step as usize,
        }
    }

    fn code_bit(&mut self, walk: &Walk, bit: bool) -> Result<()> {
        let prob0 = self.tree.prob0(walk, walk.slot);
        self.coder.encode(bit, prob0)?;
        self.tree.update(walk, walk.slot, bit);
        Ok(())
    }

    pub fn finish(self) -> Result<W> {
        self.coder.finish()
    }
}

impl<W: Write> SymbolEncoder for TreeEncoder<W> {
    fn encode_symbol(&mut self, ctx: &QuantizedContext, z: u32) -> Result<()> {
        let mut walk = Walk::new(ctx, self.k_step);
        loop {
            let more = (walk.slot >> walk.k_max) < (z as usize >> walk.suffix_bits());
            self.code_bit(&walk, more)?;
            if !more {
                break;
            }
            walk.advance();
            if walk.primary >= N_QD {
                return Err(NblicError::InvalidParameter(format!(
                    "code {z} does not fit the magnitude tree"
                )));
            }
        }

        walk.slot += 1;
        for kk in (0..walk.suffix_bits()).rev() {
            let bit = (z >> kk) & 1 == 1;
            self.code_bit(&walk, bit)?;
            walk.slot += if bit { 1 << kk } else { 1 };
        }
        Ok(())
    }
}

/// Back-end A decoder.
pub struct TreeDecoder<'a> {
    coder: ArithDecoder<'a>,
    tree: CounterTree,
    k_step: usize,
}

impl<'a> TreeDecoder<'a> {
    pub fn new(data: &'a [u8], base: usize, k_step: u8) -> Result<Self> {
        Ok(Self {
            coder: ArithDecoder::new(data, base)?,
            tree: CounterTree::default(),
            k_step: k_step as usize,
        })
    }

    fn code_bit(&mut self, walk: &Walk) -> Result<bool> {
        let prob0 = self.tree.prob0(walk, walk.slot);
        let bit = self.coder.decode(prob0)?;
        self.tree.update(walk, walk.slot, bit);
        Ok(bit)
    }
}

impl SymbolDecoder for TreeDecoder<'_> {
    fn decode_symbol(&mut self, ctx: &QuantizedContext) -> Result<u32> {
        let mut walk = Walk::new(ctx, self.k_step);
        while self.code_bit(&walk)? {
            walk.advance();
            if walk.primary >= N_QD {
                return Err(NblicError::Corrupt(format!(
                    "magnitude tree escalated to bin {}",
                    walk.primary
                )));
            }
        }

        let k = walk.suffix_bits();
        let mut z = ((walk.slot >> walk.k_max) << k) as u32;
        walk.slot += 1;
        for kk in (0..k).rev() {
            let bit = self.code_bit(&walk)?;
            if bit {
                z += 1 << kk;
                walk.slot += 1 << kk;
            } else {
                walk.slot += 1;
            }
        }
        if z > 255 {
            return Err(NblicError::Corrupt(format!("decoded code {z} out of range")));
        }
        Ok(z)
    }
}
