//! British National Grid (EPSG:27700) <-> WGS84.
//!
//! Forward: easting/northing -> OSGB36 lat/lon on Airy 1830 -> cartesian ->
//! Helmert shift -> WGS84 lat/lon. Backward runs the same chain in reverse.
//! Ellipsoidal heights are taken as zero on entry and dropped on exit; the
//! horizontal error this introduces is well below a millimetre.

use climate_common::GridExtent;

use crate::ellipsoid::{AIRY_1830, WGS84};
use crate::geodetic::{GeoBounds, GeoPoint};
use crate::helmert::{Helmert, WGS84_TO_OSGB36};
use crate::transverse_mercator::TransverseMercator;

/// Samples per extent edge when computing geodetic bounds.
const EDGE_SAMPLES: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct BritishNationalGrid {
    tm: TransverseMercator,
    to_osgb36: Helmert,
    to_wgs84: Helmert,
}

impl Default for BritishNationalGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl BritishNationalGrid {
    pub fn new() -> Self {
        Self {
            tm: TransverseMercator::national_grid(),
            to_osgb36: WGS84_TO_OSGB36,
            to_wgs84: WGS84_TO_OSGB36.inverse(),
        }
    }

    /// Native (easting, northing) in metres to WGS84 degrees.
    ///
    /// Returns `None` for non-finite input or when an iteration degenerates.
    pub fn forward(&self, x: f64, y: f64) -> Option<GeoPoint> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (lat, lon) = self.tm.unproject(x, y)?;
        let osgb = AIRY_1830.to_cartesian(lat, lon, 0.0);
        let wgs = self.to_wgs84.apply(&osgb);
        let (lat, lon, _) = WGS84.from_cartesian(&wgs)?;
        Some(GeoPoint::new(lat.to_degrees(), lon.to_degrees()))
    }

    /// WGS84 degrees to native (easting, northing) in metres.
    ///
    /// Returns `None` for non-finite input, latitudes beyond the poles, or a
    /// degenerate result.
    pub fn backward(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() >= 90.0 {
            return None;
        }
        let wgs = WGS84.to_cartesian(lat.to_radians(), lon.to_radians(), 0.0);
        let osgb = self.to_osgb36.apply(&wgs);
        let (lat, lon, _) = AIRY_1830.from_cartesian(&osgb)?;
        let (x, y) = self.tm.project(lat, lon);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Lat/lon rectangle enclosing the whole extent.
    ///
    /// The projected extent is not a rectangle in lat/lon, so every edge is
    /// sampled rather than only the corners.
    pub fn geodetic_bounds(&self, extent: &GridExtent) -> Option<GeoBounds> {
        let mut points = Vec::with_capacity(4 * (EDGE_SAMPLES + 1));
        for t in 0..=EDGE_SAMPLES {
            let frac = t as f64 / EDGE_SAMPLES as f64;
            let x = extent.x_min + frac * extent.width();
            let y = extent.y_min + frac * extent.height();
            points.push((x, extent.y_min));
            points.push((x, extent.y_max));
            points.push((extent.x_min, y));
            points.push((extent.x_max, y));
        }
        GeoBounds::enclosing(points.into_iter().filter_map(|(x, y)| self.forward(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    // Caister Water Tower, OS "A guide to coordinate systems in Great
    // Britain": ETRS89 52°39'28.8282"N 1°42'57.8663"E, OSTN15 grid
    // reference E 651409.804 N 313177.450
    const CAISTER_LAT: f64 = 52.0 + 39.0 / 60.0 + 28.8282 / 3600.0;
    const CAISTER_LON: f64 = 1.0 + 42.0 / 60.0 + 57.8663 / 3600.0;
    const CAISTER_E: f64 = 651_409.804;
    const CAISTER_N: f64 = 313_177.450;

    #[test]
    fn test_control_point_backward_within_ten_metres() {
        let bng = BritishNationalGrid::new();
        let (x, y) = bng.backward(CAISTER_LAT, CAISTER_LON).unwrap();

        assert_coords_approx_eq!((x, y), (CAISTER_E, CAISTER_N), 10.0);
    }

    #[test]
    fn test_control_point_forward_within_ten_metres() {
        let bng = BritishNationalGrid::new();
        let p = bng.forward(CAISTER_E, CAISTER_N).unwrap();

        let metres_per_degree = 111_320.0;
        let north_error = (p.lat - CAISTER_LAT) * metres_per_degree;
        let east_error = (p.lon - CAISTER_LON) * metres_per_degree * CAISTER_LAT.to_radians().cos();
        assert_coords_approx_eq!((east_error, north_error), (0.0, 0.0), 10.0);
    }

    #[test]
    fn test_london_lands_near_known_grid_reference() {
        let bng = BritishNationalGrid::new();
        let (x, y) = bng.backward(51.5074, -0.1278).unwrap();

        assert_approx_eq!(x, 530_034.0, 2_000.0);
        assert_approx_eq!(y, 180_381.0, 2_000.0);
    }

    #[test]
    fn test_roundtrip_within_one_metre() {
        let bng = BritishNationalGrid::new();
        for &(x, y) in &[
            (457_000.0, 166_000.0),
            (325_000.0, 673_000.0),
            (150_000.0, 50_000.0),
            (600_000.0, 1_000_000.0),
        ] {
            let p = bng.forward(x, y).unwrap();
            let (x2, y2) = bng.backward(p.lat, p.lon).unwrap();
            assert_coords_approx_eq!((x2, y2), (x, y), 1.0);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let bng = BritishNationalGrid::new();
        assert!(bng.forward(f64::NAN, 0.0).is_none());
        assert!(bng.backward(f64::INFINITY, 0.0).is_none());
        assert!(bng.backward(95.0, 0.0).is_none());
    }

    #[test]
    fn test_geodetic_bounds_cover_great_britain() {
        let bng = BritishNationalGrid::new();
        let bounds = bng.geodetic_bounds(&GridExtent::haduk_1km()).unwrap();

        assert!(bounds.south < 49.8 && bounds.north > 60.8, "{:?}", bounds);
        assert!(bounds.west < -8.0 && bounds.east > 1.7, "{:?}", bounds);
        assert!(bounds.contains(GeoPoint::new(51.5074, -0.1278)));
    }
}
