// src/codec/decoder.rs

use crate::codec::ans::HistogramDecoder;
use crate::codec::arith::TreeDecoder;
use crate::codec::header::{Header, HEADER_LEN};
use crate::codec::model::PixelModel;
use crate::codec::params::{Backend, Limits};
use crate::codec::predict::PredictorKind;
use crate::codec::SymbolDecoder;
use crate::image::grid::PixelGrid;
use crate::utils::error::Result;
use log::debug;

/// A decoded image together with the parameters it was coded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub height: usize,
    pub width: usize,
    pub near: u8,
    pub effort: u8,
    pub backend: Backend,
}

/// Decompresses a stream produced by [`compress`](crate::codec::compress).
pub fn decompress(data: &[u8]) -> Result<DecodedImage> {
    decompress_with(data, &Limits::default())
}

/// Decompresses, rejecting images larger than `limits`.
pub fn decompress_with(data: &[u8], limits: &Limits) -> Result<DecodedImage> {
    let header = Header::read(data, limits)?;
    debug!(
        "decoding {}x{}, near={}, effort={}, backend={:?}",
        header.width, header.height, header.near, header.effort, header.backend
    );

    let mut pixels = Vec::new();
    pixels.try_reserve_exact(header.height * header.width)?;
    pixels.resize(header.height * header.width, 0);

    let kind = PredictorKind::from_effort(header.effort);
    let mut model = PixelModel::new(kind, header.width, header.near)?;
    let payload = &data[HEADER_LEN..];

    match header.backend {
        Backend::Arithmetic => {
            let mut coder = TreeDecoder::new(payload, HEADER_LEN, header.k_step)?;
            decode_pixels(&mut pixels, header.width, &mut model, &mut coder)?;
        }
        Backend::Histogram => {
            let mut coder = HistogramDecoder::new(payload, HEADER_LEN)?;
            decode_pixels(&mut pixels, header.width, &mut model, &mut coder)?;
            coder.finish()?;
        }
    }

    Ok(DecodedImage {
        pixels,
        height: header.height,
        width: header.width,
        near: header.near,
        effort: header.effort,
        backend: header.backend,
    })
}

fn decode_pixels<D: SymbolDecoder>(
    pixels: &mut [u8],
    width: usize,
    model: &mut PixelModel,
    coder: &mut D,
) -> Result<()> {
    let height = pixels.len() / width;
    for row in 0..height {
        let mut err = 0;
        for col in 0..width {
            let ctx = model.analyze(&PixelGrid::view(pixels, width), row, col, err);
            let z = coder.decode_symbol(&ctx.quant)?;
            let y = model.code_from_rank(&ctx, z);
            let (value, e) = model.commit(&ctx, col, y);
            pixels[row * width + col] = value;
            err = e;
        }
    }
    Ok(())
}
