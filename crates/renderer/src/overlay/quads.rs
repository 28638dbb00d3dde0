use climate_common::{CellKey, ClimateError, ClimateResult, Color, GridExtent, RasterFrame};
use projection::{BritishNationalGrid, GeoBounds, GeoPoint};
use rayon::prelude::*;
use serde::Serialize;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use tracing::debug;

use super::{GeoOverlayRenderer, MapViewport, OverlayOutput, OverlayStrategy};
use crate::canvas::pixmap_to_frame;
use crate::field::{ColorField, Palette};

/// One cell reprojected as a free quadrilateral.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellQuad {
    pub key: CellKey,
    /// SW, SE, NE, NW corners in WGS84
    pub corners: [GeoPoint; 4],
    pub palette_index: u8,
    pub color: String,
}

impl CellQuad {
    fn geo_bounds(&self) -> GeoBounds {
        // four points, never empty
        GeoBounds::enclosing(self.corners).unwrap_or(GeoBounds::new(0.0, 0.0, 0.0, 0.0))
    }
}

#[derive(Debug, Clone)]
pub struct QuadSet {
    pub quads: Vec<CellQuad>,
    pub palette: Palette,
}

impl QuadSet {
    /// Fill every quad onto a Web-Mercator viewport with uniform opacity.
    pub fn rasterize(&self, viewport: &MapViewport, opacity: f32) -> ClimateResult<RasterFrame> {
        let mut pixmap = Pixmap::new(viewport.width, viewport.height).ok_or_else(|| {
            ClimateError::RenderError(format!(
                "cannot allocate {}x{} viewport",
                viewport.width, viewport.height
            ))
        })?;

        let mut paint = Paint::default();
        // adjacent quads share edges; anti-aliasing would leave hairline seams
        paint.anti_alias = false;

        for quad in &self.quads {
            let mut pb = PathBuilder::new();
            for (i, corner) in quad.corners.iter().enumerate() {
                let (x, y) = viewport.to_screen(*corner);
                if i == 0 {
                    pb.move_to(x, y);
                } else {
                    pb.line_to(x, y);
                }
            }
            pb.close();

            if let Some(path) = pb.finish() {
                let c = self.palette.color(quad.palette_index).with_opacity(opacity);
                paint.set_color_rgba8(c.r, c.g, c.b, c.a);
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }

        pixmap_to_frame(&pixmap)
    }
}

/// Per-cell quad strategy.
#[derive(Debug, Clone)]
pub struct CellQuads {
    bng: BritishNationalGrid,
    extent: GridExtent,
    bounds: GeoBounds,
}

impl CellQuads {
    pub fn new(extent: GridExtent) -> ClimateResult<Self> {
        let bng = BritishNationalGrid::new();
        let bounds = bng.geodetic_bounds(&extent).ok_or_else(|| {
            ClimateError::InitializationFailure("extent does not project to lat/lon".to_string())
        })?;
        Ok(Self { bng, extent, bounds })
    }

    /// Project the four corners of a cell; `None` when any corner is degenerate.
    pub fn quad_for(&self, key: CellKey, palette_index: u8, color: Color) -> Option<CellQuad> {
        let b = self.extent.cell_bounds(key);
        let corners = [
            self.bng.forward(b.min_x, b.min_y)?,
            self.bng.forward(b.max_x, b.min_y)?,
            self.bng.forward(b.max_x, b.max_y)?,
            self.bng.forward(b.min_x, b.max_y)?,
        ];
        Some(CellQuad {
            key,
            corners,
            palette_index,
            color: color.to_hex(),
        })
    }
}

fn intersects(a: &GeoBounds, b: &GeoBounds) -> bool {
    a.west <= b.east && a.east >= b.west && a.south <= b.north && a.north >= b.south
}

impl GeoOverlayRenderer for CellQuads {
    fn strategy(&self) -> OverlayStrategy {
        OverlayStrategy::Quads
    }

    fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    fn render(&self, field: &ColorField, viewport: Option<&MapViewport>) -> ClimateResult<OverlayOutput> {
        let view_geo = viewport.map(MapViewport::geo_bounds);
        // coarse cull in native metres, one cell of slack for curved edges
        let view_native = viewport
            .and_then(|vp| vp.native_bounds(&self.bng))
            .map(|bb| bb.expanded(self.extent.cell_size));

        let cells: Vec<(CellKey, u8)> = field.iter().collect();
        let palette = field.palette();

        let mut quads: Vec<CellQuad> = cells
            .par_iter()
            .filter(|(key, _)| match &view_native {
                Some(bb) => bb.intersects(&self.extent.cell_bounds(*key)),
                None => true,
            })
            .filter_map(|&(key, index)| self.quad_for(key, index, palette.color(index)))
            .filter(|quad| match &view_geo {
                Some(vg) => intersects(&quad.geo_bounds(), vg),
                None => true,
            })
            .collect();
        quads.sort_by_key(|q| q.key);

        debug!(total = cells.len(), drawn = quads.len(), "Projected cell quads");
        Ok(OverlayOutput::Quads(QuadSet {
            quads,
            palette: palette.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_corners_are_not_a_rectangle() {
        let quads = CellQuads::new(GridExtent::haduk_1km()).unwrap();
        let q = quads
            .quad_for(CellKey::new(650_000, 1_200_000), 1, Color::rgb(0, 0, 0))
            .unwrap();

        let [sw, se, ne, nw] = q.corners;
        // far from the central meridian the grid is rotated against lat/lon
        assert!((sw.lat - se.lat).abs() > 1e-5);
        assert!(ne.lat > se.lat && nw.lat > sw.lat);
    }
}
