// src/codec/pipeline.rs

//! Row-parallel precompute for lossless edge-directed encoding.
//!
//! With `near == 0` the reconstruction equals the input and the
//! edge-directed predictor keeps no state, so prediction, activity bins and
//! context addresses of every pixel can be worked out from the input alone.
//! Rows are split into blocks dealt round-robin to the workers. Each worker
//! owns a channel holding at most one finished block, and the caller
//! drains the channels in block order while it does the sequential coding.

use crate::codec::model::{precompute, Precomputed};
use crate::codec::MAX_BIAS;
use crate::image::grid::PixelGrid;
use crate::utils::error::{NblicError, Result};
use log::debug;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

type Block = Result<Vec<Precomputed>>;

/// Block geometry shared by the producers and the consumer.
#[derive(Clone, Copy, Debug)]
struct Layout {
    height: usize,
    width: usize,
    block_rows: usize,
    workers: usize,
}

impl Layout {
    fn blocks(&self) -> usize {
        self.height.div_ceil(self.block_rows)
    }

    fn rows(&self, block: usize) -> std::ops::Range<usize> {
        let start = block * self.block_rows;
        start..(start + self.block_rows).min(self.height)
    }
}

fn compute_block(grid: &PixelGrid<'_>, layout: &Layout, block: usize) -> Block {
    let rows = layout.rows(block);
    let mut out = Vec::new();
    out.try_reserve_exact(rows.len() * layout.width)?;
    for row in rows {
        let line = grid.row(row);
        let mut err = 0;
        for (col, &x) in line.iter().enumerate() {
            let pre = precompute(grid, row, col, err);
            err = (x as i32 - pre.raw as i32).clamp(-MAX_BIAS, MAX_BIAS);
            out.push(pre);
        }
    }
    Ok(out)
}

fn produce(grid: PixelGrid<'_>, layout: Layout, worker: usize, tx: SyncSender<Block>) {
    for block in (worker..layout.blocks()).step_by(layout.workers) {
        let result = compute_block(&grid, &layout, block);
        let failed = result.is_err();
        // the consumer hung up
        if tx.send(result).is_err() || failed {
            return;
        }
    }
}

fn consume<F>(receivers: &[Receiver<Block>], layout: &Layout, on_row: &mut F) -> Result<()>
where
    F: FnMut(usize, &[Precomputed]) -> Result<()>,
{
    for block in 0..layout.blocks() {
        let data = receivers[block % layout.workers]
            .recv()
            .map_err(|_| NblicError::Resource(format!("worker for block {block} stopped")))??;
        for (row, line) in layout.rows(block).zip(data.chunks_exact(layout.width)) {
            on_row(row, line)?;
        }
    }
    Ok(())
}

/// Precomputes every pixel of `grid` on `workers` threads and hands the
/// results to `on_row` one row at a time, in raster order, on the calling
/// thread.
pub fn run<F>(grid: &PixelGrid<'_>, workers: usize, block_rows: usize, mut on_row: F) -> Result<()>
where
    F: FnMut(usize, &[Precomputed]) -> Result<()>,
{
    let layout = Layout {
        height: grid.height(),
        width: grid.width(),
        block_rows: block_rows.max(1),
        workers: workers.max(1),
    };
    debug!(
        "parallel precompute: {} blocks of {} rows on {} workers",
        layout.blocks(),
        layout.block_rows,
        layout.workers
    );
    spawn_and_consume(*grid, layout, &mut on_row)
}

#[cfg(feature = "rayon")]
fn spawn_and_consume<F>(grid: PixelGrid<'_>, layout: Layout, on_row: &mut F) -> Result<()>
where
    F: FnMut(usize, &[Precomputed]) -> Result<()>,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(layout.workers)
        .build()
        .map_err(|e| NblicError::Resource(format!("cannot build worker pool: {e}")))?;

    pool.in_place_scope(|s| {
        let mut receivers = Vec::with_capacity(layout.workers);
        for worker in 0..layout.workers {
            let (tx, rx) = sync_channel(1);
            receivers.push(rx);
            s.spawn(move |_| produce(grid, layout, worker, tx));
        }
        let result = consume(&receivers, &layout, on_row);
        // unblocks producers still waiting to send
        drop(receivers);
        result
    })
}

#[cfg(not(feature = "rayon"))]
fn spawn_and_consume<F>(grid: PixelGrid<'_>, layout: Layout, on_row: &mut F) -> Result<()>
where
    F: FnMut(usize, &[Precomputed]) -> Result<()>,
{
    std::thread::scope(|s| {
        let mut receivers = Vec::with_capacity(layout.workers);
        for worker in 0..layout.workers {
            let (tx, rx) = sync_channel(1);
            receivers.push(rx);
            s.spawn(move || produce(grid, layout, worker, tx));
        }
        let result = consume(&receivers, &layout, on_row);
        drop(receivers);
        result
    })
}
