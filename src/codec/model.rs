// src/codec/model.rs

//! Per-pixel modelling shared by the encoder and the decoder.
//!
//! For each pixel, [`PixelModel::analyze`] (or [`PixelModel::resume`] for
//! precomputed pixels) derives everything the entropy coder needs from
//! causal data only. Once the pixel's code is known on either side,
//! [`PixelModel::commit`] updates every adaptive table in the same order.

use crate::codec::auto_mapper::AutoMapperBank;
use crate::codec::context::{context_address, quantize, BiasTable, QuantizedContext};
use crate::codec::neighbors::NeighborSet;
use crate::codec::predict::{Prediction, Predictor, PredictorKind};
use crate::codec::residual::{fold, unfold};
use crate::codec::MAX_BIAS;
use crate::image::grid::PixelGrid;
use crate::utils::error::Result;

/// Stateless analysis of one pixel, small enough to precompute for whole
/// blocks of rows. Only valid for the edge-directed predictor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Precomputed {
    /// Raw prediction.
    pub raw: u8,
    pub addr: u16,
    pub primary: u8,
    pub secondary: u8,
    pub weight: u8,
}

impl Precomputed {
    pub fn quant(&self) -> QuantizedContext {
        QuantizedContext {
            primary: self.primary as usize,
            secondary: self.secondary as usize,
            weight: self.weight as u32,
        }
    }
}

/// Edge-directed analysis of (`row`, `col`) given the previous residual.
pub fn precompute(grid: &PixelGrid<'_>, row: usize, col: usize, err: i32) -> Precomputed {
    let nb = NeighborSet::sample(grid, row, col);
    let raw = crate::codec::predict::edge::predict(&nb);
    let quant = quantize(&nb, err);
    let addr = context_address(&nb, quant.primary, raw);
    Precomputed {
        raw: raw as u8,
        addr: addr as u16,
        primary: quant.primary as u8,
        secondary: quant.secondary as u8,
        weight: quant.weight as u8,
    }
}

/// Everything known about a pixel before its value.
#[derive(Clone, Copy, Debug)]
pub struct PixelContext {
    nb: NeighborSet,
    prediction: Prediction,
    /// Activity bins driving the entropy coder.
    pub quant: QuantizedContext,
    addr: usize,
    /// Bias corrected prediction.
    px: i32,
    sign: bool,
}

/// Adaptive state for one image.
pub struct PixelModel {
    predictor: Predictor,
    bias: BiasTable,
    mappers: AutoMapperBank,
    near: u8,
}

impl PixelModel {
    pub fn new(kind: PredictorKind, width: usize, near: u8) -> Result<Self> {
        Ok(Self {
            predictor: Predictor::new(kind, width)?,
            bias: BiasTable::new(),
            mappers: AutoMapperBank::new(),
            near,
        })
    }

    pub fn kind(&self) -> PredictorKind {
        self.predictor.kind()
    }

    pub fn near(&self) -> u8 {
        self.near
    }

    /// Analyses (`row`, `col`) of `grid`, whose causal part must already
    /// hold reconstructed samples. `err` is the residual of the pixel to
    /// the left (0 at the start of a row).
    pub fn analyze(&self, grid: &PixelGrid<'_>, row: usize, col: usize, err: i32) -> PixelContext {
        let nb = NeighborSet::sample(grid, row, col);
        let prediction = self.predictor.predict(row, col, &nb);
        let quant = quantize(&nb, err);
        let addr = context_address(&nb, quant.primary, prediction.value);
        self.correct(nb, prediction, quant, addr)
    }

    /// Continues from a [`Precomputed`] analysis.
    pub fn resume(&self, pre: &Precomputed) -> PixelContext {
        self.correct(
            NeighborSet::default(),
            Prediction::stateless(pre.raw as i32),
            pre.quant(),
            pre.addr as usize,
        )
    }

    fn correct(
        &self,
        nb: NeighborSet,
        prediction: Prediction,
        quant: QuantizedContext,
        addr: usize,
    ) -> PixelContext {
        let (px, sign) = self.bias.correct(addr, prediction.value);
        PixelContext {
            nb,
            prediction,
            quant,
            addr,
            px,
            sign,
        }
    }

    /// Encoder side: the residual code of sample `x` and its rank.
    pub fn code_for(&self, ctx: &PixelContext, x: i32) -> (u32, u32) {
        let y = fold(x, ctx.px, ctx.sign, self.near);
        (y, self.mappers.get(ctx.px, ctx.sign).to_rank(y))
    }

    /// Decoder side: the residual code behind a decoded rank.
    pub fn code_from_rank(&self, ctx: &PixelContext, z: u32) -> u32 {
        self.mappers.get(ctx.px, ctx.sign).from_rank(z)
    }

    /// Applies residual code `y` at column `col`. Returns the reconstructed
    /// sample and the residual to carry to the next pixel of the row.
    pub fn commit(&mut self, ctx: &PixelContext, col: usize, y: u32) -> (u8, i32) {
        self.mappers.get_mut(ctx.px, ctx.sign).observe(y);
        let x = unfold(y, ctx.px, ctx.sign, self.near);
        let err = (x - ctx.prediction.value).clamp(-MAX_BIAS, MAX_BIAS);
        self.bias.update(ctx.addr, err);
        self.predictor.update(col, &ctx.nb, x, &ctx.prediction);
        (x as u8, err)
    }
}
