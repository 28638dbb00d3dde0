//! Reference ellipsoids and geodetic <-> Earth-centred cartesian conversion.

use nalgebra::Vector3;

/// A reference ellipsoid given by its semi-axes in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (metres)
    pub a: f64,
    /// Semi-minor axis (metres)
    pub b: f64,
}

/// Airy 1830, the ellipsoid of the OSGB36 datum.
pub const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};

/// WGS84 / GRS80.
pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_245,
};

const MAX_ITERATIONS: usize = 20;
const CONVERGENCE_RAD: f64 = 1e-12;

impl Ellipsoid {
    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }

    /// Geodetic (radians, metres) to cartesian XYZ.
    pub fn to_cartesian(&self, lat: f64, lon: f64, height: f64) -> Vector3<f64> {
        let e2 = self.e2();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let nu = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

        Vector3::new(
            (nu + height) * cos_lat * lon.cos(),
            (nu + height) * cos_lat * lon.sin(),
            ((1.0 - e2) * nu + height) * sin_lat,
        )
    }

    /// Cartesian XYZ to geodetic (lat radians, lon radians, height metres).
    ///
    /// Returns `None` if the latitude iteration does not settle.
    pub fn from_cartesian(&self, xyz: &Vector3<f64>) -> Option<(f64, f64, f64)> {
        let e2 = self.e2();
        let p = (xyz.x * xyz.x + xyz.y * xyz.y).sqrt();
        let lon = xyz.y.atan2(xyz.x);

        let mut lat = xyz.z.atan2(p * (1.0 - e2));
        let mut nu = self.a;
        let mut converged = false;

        for _ in 0..MAX_ITERATIONS {
            let sin_lat = lat.sin();
            nu = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            let next = (xyz.z + e2 * nu * sin_lat).atan2(p);
            let delta = (next - lat).abs();
            lat = next;
            if delta < CONVERGENCE_RAD {
                converged = true;
                break;
            }
        }

        if !converged || !lat.is_finite() || !lon.is_finite() {
            return None;
        }

        let height = p / lat.cos() - nu;
        Some((lat, lon, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_roundtrip() {
        let lat = 52.657_570_3_f64.to_radians();
        let lon = 1.717_921_5_f64.to_radians();
        let xyz = AIRY_1830.to_cartesian(lat, lon, 24.7);
        let (lat2, lon2, h2) = AIRY_1830.from_cartesian(&xyz).unwrap();

        assert!((lat - lat2).abs() < 1e-11);
        assert!((lon - lon2).abs() < 1e-11);
        assert!((h2 - 24.7).abs() < 1e-4, "height drifted: {}", h2);
    }

    #[test]
    fn test_eccentricity() {
        assert!((WGS84.e2() - 0.006_694_38).abs() < 1e-8);
    }
}
