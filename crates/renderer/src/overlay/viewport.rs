use climate_common::BoundingBox;
use projection::{BritishNationalGrid, GeoBounds, GeoPoint, WebMercator};
use serde::{Deserialize, Serialize};

const EDGE_SAMPLES: usize = 8;

/// Visible region of a slippy map: zoom level plus the world-pixel position
/// of the top-left screen corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub zoom: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: u32,
    pub height: u32,
}

impl MapViewport {
    pub fn centered(center: GeoPoint, zoom: f64, width: u32, height: u32) -> Self {
        let (cx, cy) = WebMercator::default().to_world_pixel(center, zoom);
        Self {
            zoom,
            origin_x: cx - width as f64 / 2.0,
            origin_y: cy - height as f64 / 2.0,
            width,
            height,
        }
    }

    pub fn to_screen(&self, point: GeoPoint) -> (f32, f32) {
        let (x, y) = WebMercator::default().to_world_pixel(point, self.zoom);
        ((x - self.origin_x) as f32, (y - self.origin_y) as f32)
    }

    pub fn geo_bounds(&self) -> GeoBounds {
        let wm = WebMercator::default();
        let nw = wm.from_world_pixel(self.origin_x, self.origin_y, self.zoom);
        let se = wm.from_world_pixel(
            self.origin_x + self.width as f64,
            self.origin_y + self.height as f64,
            self.zoom,
        );
        GeoBounds::new(se.lat, nw.lon, nw.lat, se.lon)
    }

    /// Native-grid rectangle covering the viewport, for coarse culling.
    pub fn native_bounds(&self, bng: &BritishNationalGrid) -> Option<BoundingBox> {
        let bounds = self.geo_bounds();
        let mut points = Vec::with_capacity(4 * (EDGE_SAMPLES + 1));
        for i in 0..=EDGE_SAMPLES {
            let t = i as f64 / EDGE_SAMPLES as f64;
            for p in [
                bounds.lerp(t, 0.0),
                bounds.lerp(t, 1.0),
                bounds.lerp(0.0, t),
                bounds.lerp(1.0, t),
            ] {
                points.push(p);
            }
        }
        BoundingBox::enclosing(points.into_iter().filter_map(|p| bng.backward(p.lat, p.lon)))
    }
}
