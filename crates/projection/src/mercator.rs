//! Spherical Web Mercator (EPSG:3857) as used by slippy-map tile pyramids.

use std::f64::consts::PI;

use crate::geodetic::GeoPoint;

/// Latitude beyond which Web Mercator is clipped.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    /// Tile edge in pixels
    pub tile_size: f64,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self { tile_size: 256.0 }
    }
}

impl WebMercator {
    /// World size in pixels at a zoom level.
    pub fn world_size(&self, zoom: f64) -> f64 {
        self.tile_size * 2f64.powf(zoom)
    }

    /// Geodetic point to world pixel coordinates at `zoom`.
    ///
    /// Origin is the top-left (north-west) corner of the world.
    pub fn to_world_pixel(&self, point: GeoPoint, zoom: f64) -> (f64, f64) {
        let size = self.world_size(zoom);
        let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (point.lon + 180.0) / 360.0 * size;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
        (x, y)
    }

    pub fn from_world_pixel(&self, x: f64, y: f64, zoom: f64) -> GeoPoint {
        let size = self.world_size(zoom);
        let lon = x / size * 360.0 - 180.0;
        let n = PI * (1.0 - 2.0 * y / size);
        let lat = n.sinh().atan().to_degrees();
        GeoPoint::new(lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_world_centre() {
        let wm = WebMercator::default();
        let (x, y) = wm.to_world_pixel(GeoPoint::new(0.0, 0.0), 0.0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_roundtrip() {
        let wm = WebMercator::default();
        let p = GeoPoint::new(51.5074, -0.1278);
        let (x, y) = wm.to_world_pixel(p, 7.0);
        let back = wm.from_world_pixel(x, y, 7.0);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lon - p.lon).abs() < 1e-9);
    }
}
