// src/codec/encoder.rs

use crate::codec::ans::HistogramEncoder;
use crate::codec::arith::TreeEncoder;
use crate::codec::header::{Header, HEADER_LEN};
use crate::codec::model::PixelModel;
use crate::codec::params::{Backend, EncodeParams};
use crate::codec::predict::PredictorKind;
use crate::codec::{pipeline, SymbolEncoder};
use crate::image::grid::PixelGrid;
use crate::utils::error::Result;
use log::{debug, warn};

/// Compresses a row-major 8-bit gray image with the arithmetic back-end.
///
/// `near` is clamped to `0..=25` and `effort` to `1..=2`.
pub fn compress(pixels: &[u8], height: usize, width: usize, near: u8, effort: u8) -> Result<Vec<u8>> {
    let params = EncodeParams::default().with_near(near).with_effort(effort);
    compress_with(pixels, height, width, &params)
}

/// Compresses with explicit parameters.
pub fn compress_with(
    pixels: &[u8],
    height: usize,
    width: usize,
    params: &EncodeParams,
) -> Result<Vec<u8>> {
    let params = params.clamped();
    params.limits.check(height, width)?;
    let grid = PixelGrid::new(pixels, width, height)?;
    let kind = PredictorKind::from_effort(params.effort);
    let header = Header::new(height, width, params.near, params.effort, params.backend);
    debug!(
        "encoding {width}x{height}, near={}, effort={}, k_step={}, backend={:?}",
        header.near, header.effort, header.k_step, header.backend
    );

    let mut out = Vec::new();
    out.try_reserve(HEADER_LEN + pixels.len() / 2)?;
    header.write(&mut out)?;

    let mut model = PixelModel::new(kind, width, params.near)?;
    let workers = worker_count(&params, kind);

    match params.backend {
        Backend::Arithmetic => {
            let mut coder = TreeEncoder::new(out, header.k_step);
            encode_pixels(&grid, &mut model, &mut coder, workers, params.block_rows)?;
            out = coder.finish()?;
        }
        Backend::Histogram => {
            let mut coder = HistogramEncoder::new(pixels.len())?;
            encode_pixels(&grid, &mut model, &mut coder, workers, params.block_rows)?;
            coder.finish(&mut out)?;
        }
    }

    debug!(
        "encoded {} pixels into {} bytes ({:.3} bpp)",
        pixels.len(),
        out.len(),
        8.0 * (out.len() - HEADER_LEN) as f64 / pixels.len() as f64
    );
    Ok(out)
}

/// Workers for the parallel pipeline; 1 means sequential.
fn worker_count(params: &EncodeParams, kind: PredictorKind) -> usize {
    let requested = params.resolved_threads();
    if requested <= 1 {
        return 1;
    }
    if params.near != 0 || kind != PredictorKind::EdgeDirected {
        warn!(
            "parallel encoding needs near=0 and effort=1 (got near={}, effort={}), encoding sequentially",
            params.near, params.effort
        );
        return 1;
    }
    requested
}

fn encode_pixels<E: SymbolEncoder>(
    grid: &PixelGrid<'_>,
    model: &mut PixelModel,
    coder: &mut E,
    workers: usize,
    block_rows: usize,
) -> Result<()> {
    if workers > 1 {
        return pipeline::run(grid, workers, block_rows, |row, pre| {
            let line = grid.row(row);
            for (col, (p, &x)) in pre.iter().zip(line).enumerate() {
                let ctx = model.resume(p);
                let (y, z) = model.code_for(&ctx, x as i32);
                coder.encode_symbol(&ctx.quant, z)?;
                model.commit(&ctx, col, y);
            }
            Ok(())
        });
    }

    let width = grid.width();
    // near > 0: later pixels must see reconstructed values, not the input
    let mut recon = None;
    if model.near() > 0 {
        let mut buf = Vec::new();
        buf.try_reserve_exact(grid.height() * width)?;
        for row in 0..grid.height() {
            buf.extend_from_slice(grid.row(row));
        }
        recon = Some(buf);
    }

    for row in 0..grid.height() {
        let mut err = 0;
        for col in 0..width {
            let ctx = match recon.as_deref() {
                Some(buf) => model.analyze(&PixelGrid::view(buf, width), row, col, err),
                None => model.analyze(grid, row, col, err),
            };
            let x = grid.row(row)[col];
            let (y, z) = model.code_for(&ctx, x as i32);
            coder.encode_symbol(&ctx.quant, z)?;
            let (value, e) = model.commit(&ctx, col, y);
            if let Some(buf) = recon.as_mut() {
                buf[row * width + col] = value;
            }
            err = e;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::NblicError;

    #[test]
    fn test_rejects_wrong_length() {
        let err = compress(&[1, 2, 3], 2, 2, 0, 1).unwrap_err();
        assert!(matches!(err, NblicError::DimensionMismatch { expected: 4, actual: 3 }));
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(matches!(compress(&[], 0, 4, 0, 1), Err(NblicError::InvalidParameter(_))));
        let params = EncodeParams::default().with_limits(crate::codec::Limits::new(2, 2));
        assert!(matches!(
            compress_with(&[0; 9], 3, 3, &params),
            Err(NblicError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_header_reflects_clamping() {
        let out = compress(&[10; 6], 2, 3, 99, 0).unwrap();
        let header = Header::read(&out, &Default::default()).unwrap();
        assert_eq!((header.height, header.width), (2, 3));
        assert_eq!(header.near, crate::codec::MAX_NEAR);
        assert_eq!(header.effort, 1);
        assert_eq!(header.backend, Backend::Arithmetic);
    }
}
