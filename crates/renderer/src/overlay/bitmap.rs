use climate_common::{ClimateError, ClimateResult, GridExtent};
use projection::{BritishNationalGrid, GeoBounds, GeoPoint};
use rayon::prelude::*;
use tracing::debug;

use super::{GeoOverlayRenderer, MapViewport, OverlayOutput, OverlayStrategy};
use crate::field::{ColorField, Palette, TRANSPARENT_INDEX};

/// Fixed-size bitmap over fixed lat/lon bounds.
#[derive(Debug, Clone)]
pub struct CompositedBitmap {
    bng: BritishNationalGrid,
    extent: GridExtent,
    bounds: GeoBounds,
    width: u32,
    height: u32,
}

impl CompositedBitmap {
    /// Bounds are derived once from the extent by projecting its edges.
    pub fn new(extent: GridExtent, width: u32, height: u32) -> ClimateResult<Self> {
        let bng = BritishNationalGrid::new();
        let bounds = bng.geodetic_bounds(&extent).ok_or_else(|| {
            ClimateError::InitializationFailure("extent does not project to lat/lon".to_string())
        })?;
        Self::with_bounds(extent, bounds, width, height)
    }

    pub fn with_bounds(extent: GridExtent, bounds: GeoBounds, width: u32, height: u32) -> ClimateResult<Self> {
        if width == 0 || height == 0 {
            return Err(ClimateError::invalid_parameter(
                "bitmap_size",
                "overlay bitmap needs non-zero dimensions",
            ));
        }
        Ok(Self {
            bng: BritishNationalGrid::new(),
            extent,
            bounds,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Geodetic position of pixel `(col, row)`, sampled at the pixel centre
    /// by linear interpolation between the declared bounds.
    pub fn pixel_geodetic(&self, col: u32, row: u32) -> GeoPoint {
        let u = (col as f64 + 0.5) / self.width as f64;
        let v = (row as f64 + 0.5) / self.height as f64;
        self.bounds.lerp(u, v)
    }

    fn sample(&self, field: &ColorField, col: u32, row: u32) -> u8 {
        let p = self.pixel_geodetic(col, row);
        self.bng
            .backward(p.lat, p.lon)
            .and_then(|(x, y)| self.extent.cell_key(x, y))
            .and_then(|key| field.index_at(key))
            .unwrap_or(TRANSPARENT_INDEX)
    }
}

impl GeoOverlayRenderer for CompositedBitmap {
    fn strategy(&self) -> OverlayStrategy {
        OverlayStrategy::Bitmap
    }

    fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    fn render(&self, field: &ColorField, _viewport: Option<&MapViewport>) -> ClimateResult<OverlayOutput> {
        let width = self.width as usize;
        let mut indices = vec![TRANSPARENT_INDEX; width * self.height as usize];

        indices
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, line)| {
                for (col, slot) in line.iter_mut().enumerate() {
                    *slot = self.sample(field, col as u32, row as u32);
                }
            });

        let bitmap = OverlayBitmap {
            width: self.width,
            height: self.height,
            bounds: self.bounds,
            indices,
            palette: field.palette().clone(),
        };
        debug!(
            width = self.width,
            height = self.height,
            painted = bitmap.painted_pixels(),
            "Composited overlay bitmap"
        );
        Ok(OverlayOutput::Bitmap(bitmap))
    }
}

/// Palette-indexed bitmap plus the lat/lon bounds it is pinned to.
#[derive(Debug, Clone)]
pub struct OverlayBitmap {
    pub width: u32,
    pub height: u32,
    pub bounds: GeoBounds,
    pub indices: Vec<u8>,
    pub palette: Palette,
}

impl OverlayBitmap {
    pub fn index_at(&self, col: u32, row: u32) -> Option<u8> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.indices
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }

    pub fn painted_pixels(&self) -> usize {
        self.indices.iter().filter(|&&i| i != TRANSPARENT_INDEX).count()
    }

    /// Opacity only touches the palette alpha, not the pixel data.
    pub fn to_png(&self, opacity: f32) -> ClimateResult<Vec<u8>> {
        crate::png::encode_indexed(&self.indices, self.width, self.height, &self.palette.to_rgba(opacity))
    }
}
