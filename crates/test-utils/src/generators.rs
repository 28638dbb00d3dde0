//! Synthetic sparse grids and frames with predictable values.

use climate_common::{CellKey, GridExtent, RasterFrame, SparseGrid};

/// Keys of every cell centre inside the extent, row by row from the south.
pub fn cell_keys(extent: &GridExtent) -> Vec<CellKey> {
    let half = extent.cell_size / 2.0;
    let cols = (extent.width() / extent.cell_size).round() as i64;
    let rows = (extent.height() / extent.cell_size).round() as i64;
    let mut keys = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let x = extent.x_min + half + col as f64 * extent.cell_size;
            let y = extent.y_min + half + row as f64 * extent.cell_size;
            if let Some(key) = extent.cell_key(x, y) {
                keys.push(key);
            }
        }
    }
    keys
}

/// A full grid whose value is `f(col, row)`, with col/row counted in cells
/// from the south-west corner.
pub fn grid_from_fn(extent: &GridExtent, f: impl Fn(i64, i64) -> f32) -> SparseGrid {
    let x0 = extent.x_min + extent.cell_size / 2.0;
    let y0 = extent.y_min + extent.cell_size / 2.0;
    cell_keys(extent)
        .into_iter()
        .map(|key| {
            let col = ((key.x as f64 - x0) / extent.cell_size).round() as i64;
            let row = ((key.y as f64 - y0) / extent.cell_size).round() as i64;
            (key, f(col, row))
        })
        .collect()
}

/// Values increasing west to east: `base + col * step`.
pub fn eastward_ramp(extent: &GridExtent, base: f32, step: f32) -> SparseGrid {
    grid_from_fn(extent, |col, _| base + col as f32 * step)
}

/// Values increasing south to north: `base + row * step`.
pub fn northward_ramp(extent: &GridExtent, base: f32, step: f32) -> SparseGrid {
    grid_from_fn(extent, |_, row| base + row as f32 * step)
}

/// Drop every `nth` cell (by sorted key) to simulate missing data.
pub fn with_gaps(grid: &SparseGrid, nth: usize) -> SparseGrid {
    let mut cells: Vec<(CellKey, f32)> = grid.iter().collect();
    cells.sort_by_key(|(k, _)| *k);
    cells
        .into_iter()
        .enumerate()
        .filter(|(i, _)| nth == 0 || i % nth != 0)
        .map(|(_, cell)| cell)
        .collect()
}

/// Frame split into a left and right half of two colours.
pub fn two_tone_frame(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> RasterFrame {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for _ in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(if x < width / 2 { &left } else { &right });
        }
    }
    RasterFrame {
        width,
        height,
        pixels,
    }
}
