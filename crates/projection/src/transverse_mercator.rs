//! Transverse Mercator projection on an ellipsoid.
//!
//! Series expansions as given in the Ordnance Survey guide to coordinate
//! systems in Great Britain. Accurate to millimetres within a few degrees of
//! the central meridian.

use crate::ellipsoid::{Ellipsoid, AIRY_1830};

/// Latitude loop tolerance on the meridional arc, in metres.
const ARC_TOLERANCE_M: f64 = 1e-5;
const MAX_ITERATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Scale factor on the central meridian
    pub f0: f64,
    /// True origin latitude in radians
    pub lat0: f64,
    /// Central meridian in radians
    pub lon0: f64,
    /// False easting of the true origin (metres)
    pub e0: f64,
    /// False northing of the true origin (metres)
    pub n0: f64,
}

impl TransverseMercator {
    /// The National Grid projection (OSGB36 / EPSG:27700).
    pub fn national_grid() -> Self {
        Self {
            ellipsoid: AIRY_1830,
            f0: 0.999_601_271_7,
            lat0: 49.0_f64.to_radians(),
            lon0: (-2.0_f64).to_radians(),
            e0: 400_000.0,
            n0: -100_000.0,
        }
    }

    fn n(&self) -> f64 {
        let Ellipsoid { a, b } = self.ellipsoid;
        (a - b) / (a + b)
    }

    /// Developed meridional arc from the origin latitude to `lat`.
    fn meridional_arc(&self, lat: f64) -> f64 {
        let n = self.n();
        let (n2, n3) = (n * n, n * n * n);
        let dlat = lat - self.lat0;
        let slat = lat + self.lat0;

        let ma = (1.0 + n + 1.25 * n2 + 1.25 * n3) * dlat;
        let mb = (3.0 * n + 3.0 * n2 + 2.625 * n3) * dlat.sin() * slat.cos();
        let mc = (1.875 * n2 + 1.875 * n3) * (2.0 * dlat).sin() * (2.0 * slat).cos();
        let md = (35.0 / 24.0) * n3 * (3.0 * dlat).sin() * (3.0 * slat).cos();

        self.ellipsoid.b * self.f0 * (ma - mb + mc - md)
    }

    /// Radii of curvature (nu, rho) scaled by F0, and eta².
    fn curvature(&self, lat: f64) -> (f64, f64, f64) {
        let e2 = self.ellipsoid.e2();
        let a_f0 = self.ellipsoid.a * self.f0;
        let sin2 = lat.sin().powi(2);
        let nu = a_f0 / (1.0 - e2 * sin2).sqrt();
        let rho = a_f0 * (1.0 - e2) * (1.0 - e2 * sin2).powf(-1.5);
        (nu, rho, nu / rho - 1.0)
    }

    /// Geodetic (radians, on this ellipsoid) to (easting, northing).
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let tan2 = lat.tan().powi(2);
        let tan4 = tan2 * tan2;
        let (nu, rho, eta2) = self.curvature(lat);
        let m = self.meridional_arc(lat);

        let i = m + self.n0;
        let ii = nu / 2.0 * sin_lat * cos_lat;
        let iii = nu / 24.0 * sin_lat * cos_lat.powi(3) * (5.0 - tan2 + 9.0 * eta2);
        let iiia = nu / 720.0 * sin_lat * cos_lat.powi(5) * (61.0 - 58.0 * tan2 + tan4);
        let iv = nu * cos_lat;
        let v = nu / 6.0 * cos_lat.powi(3) * (nu / rho - tan2);
        let vi = nu / 120.0
            * cos_lat.powi(5)
            * (5.0 - 18.0 * tan2 + tan4 + 14.0 * eta2 - 58.0 * tan2 * eta2);

        let dl = lon - self.lon0;
        let northing = i + ii * dl.powi(2) + iii * dl.powi(4) + iiia * dl.powi(6);
        let easting = self.e0 + iv * dl + v * dl.powi(3) + vi * dl.powi(5);
        (easting, northing)
    }

    /// (easting, northing) to geodetic radians on this ellipsoid.
    ///
    /// Returns `None` when the footpoint latitude fails to converge.
    pub fn unproject(&self, easting: f64, northing: f64) -> Option<(f64, f64)> {
        let a_f0 = self.ellipsoid.a * self.f0;
        let dn = northing - self.n0;

        let mut lat = dn / a_f0 + self.lat0;
        let mut m = self.meridional_arc(lat);
        let mut iterations = 0;
        while (dn - m).abs() >= ARC_TOLERANCE_M {
            if iterations == MAX_ITERATIONS || !lat.is_finite() {
                return None;
            }
            lat += (dn - m) / a_f0;
            m = self.meridional_arc(lat);
            iterations += 1;
        }

        let (nu, rho, eta2) = self.curvature(lat);
        let tan = lat.tan();
        let (tan2, tan4) = (tan * tan, tan.powi(4));
        let sec = 1.0 / lat.cos();

        let vii = tan / (2.0 * rho * nu);
        let viii = tan / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
        let ix = tan / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
        let x = sec / nu;
        let xi = sec / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * tan2);
        let xii = sec / (120.0 * nu.powi(5)) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
        let xiia = sec / (5040.0 * nu.powi(7))
            * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan4 * tan2);

        let de = easting - self.e0;
        let out_lat = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
        let out_lon = self.lon0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);

        if out_lat.is_finite() && out_lon.is_finite() {
            Some((out_lat, out_lon))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    fn dms(d: f64, m: f64, s: f64) -> f64 {
        (d + m / 60.0 + s / 3600.0).to_radians()
    }

    #[test]
    fn test_ordnance_survey_worked_example() {
        let tm = TransverseMercator::national_grid();
        let (e, n) = tm.project(dms(52.0, 39.0, 27.2531), dms(1.0, 43.0, 4.5177));

        assert_coords_approx_eq!((e, n), (651_409.903, 313_177.270), 0.01);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let tm = TransverseMercator::national_grid();
        let (lat, lon) = tm.unproject(651_409.903, 313_177.270).unwrap();

        assert_approx_eq!(lat, dms(52.0, 39.0, 27.2531), 1e-8);
        assert_approx_eq!(lon, dms(1.0, 43.0, 4.5177), 1e-8);
    }
}
