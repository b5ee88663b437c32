//! Canvas assembly and the all-or-nothing result gate.

use compositor::Canvas;
use mosaic_common::{MosaicError, MosaicResult, TileGrid};
use tracing::{debug, error};

use crate::FetchOutcome;

/// Paste every successful outcome onto a fresh transparent canvas.
///
/// Failed outcomes are skipped here; [`gate`] decides whether the canvas
/// may be used.
pub fn assemble(grid: TileGrid, tile_edge: u32, outcomes: &[FetchOutcome]) -> MosaicResult<Canvas> {
    let mut canvas = Canvas::new(grid, tile_edge)?;

    let mut pasted = 0usize;
    for outcome in outcomes {
        if let Ok(raster) = &outcome.result {
            canvas.paste(outcome.request.pos, raster)?;
            pasted += 1;
        }
    }

    debug!(pasted = pasted, total = outcomes.len(), "Canvas assembled");
    Ok(canvas)
}

/// Hand the canvas on only if every tile succeeded.
///
/// Otherwise fails with `IncompleteGrid` listing every failed tile.
pub fn gate(canvas: Canvas, outcomes: &[FetchOutcome]) -> MosaicResult<Canvas> {
    let failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().cloned())
        .collect();

    if failures.is_empty() {
        return Ok(canvas);
    }

    let total = outcomes.len();
    for failure in &failures {
        error!(
            tile_x = failure.coord.x,
            tile_y = failure.coord.y,
            attempts = failure.attempts,
            error = %failure.last_error,
            "Missing tile"
        );
    }
    error!(
        failed = failures.len(),
        total = total,
        "Discarding incomplete snapshot"
    );

    Err(MosaicError::IncompleteGrid { failures, total })
}
