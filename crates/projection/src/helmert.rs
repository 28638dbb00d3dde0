//! Seven-parameter Helmert datum shift between cartesian frames.

use nalgebra::{Matrix3, Vector3};

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Helmert transformation parameters.
///
/// Translations in metres, scale in parts per million, rotations in
/// arc-seconds (position-vector convention, small-angle form).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    pub s_ppm: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

/// WGS84 to OSGB36, as published by Ordnance Survey.
pub const WGS84_TO_OSGB36: Helmert = Helmert {
    tx: -446.448,
    ty: 125.157,
    tz: -542.060,
    s_ppm: 20.4894,
    rx: -0.1502,
    ry: -0.2470,
    rz: -0.8421,
};

impl Helmert {
    /// The reverse shift, obtained by negating every parameter.
    ///
    /// Exact to a few millimetres over Great Britain, which is well below the
    /// accuracy of the published parameters themselves.
    pub fn inverse(&self) -> Self {
        Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            s_ppm: -self.s_ppm,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
        }
    }

    fn matrix(&self) -> Matrix3<f64> {
        let s1 = 1.0 + self.s_ppm * 1e-6;
        let (rx, ry, rz) = (
            self.rx * ARCSEC_TO_RAD,
            self.ry * ARCSEC_TO_RAD,
            self.rz * ARCSEC_TO_RAD,
        );
        Matrix3::new(
            s1, -rz, ry, //
            rz, s1, -rx, //
            -ry, rx, s1,
        )
    }

    pub fn apply(&self, xyz: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(self.tx, self.ty, self.tz) + self.matrix() * xyz
    }
}
