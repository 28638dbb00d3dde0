//! Grid extent of the source dataset and cell-key quantization.
//!
//! The dataset lives on a regular grid in British National Grid metres. Cell
//! centres sit on integer multiples of `cell_size` (e.g. every 1000 m), which
//! is also how the offline pipeline writes the keys of its sparse grids.
//! Every lookup into a [`crate::SparseGrid`] goes through
//! [`GridExtent::cell_key`], so a coordinate anywhere inside a cell resolves
//! to the same key regardless of floating-point formatting.

use crate::{BoundingBox, ClimateError, ClimateResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounding rectangle of the source grid in native projected units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// CRS identifier, e.g. "EPSG:27700"
    #[serde(alias = "crs")]
    pub crs_identifier: String,
    /// Cell resolution in metres
    #[serde(alias = "resolution_meters")]
    pub cell_size: f64,
}

impl GridExtent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64, cell_size: f64) -> ClimateResult<Self> {
        let extent = Self {
            x_min,
            x_max,
            y_min,
            y_max,
            crs_identifier: "EPSG:27700".to_string(),
            cell_size,
        };
        extent.validate()?;
        Ok(extent)
    }

    /// The HadUK-Grid 1 km extent used by the reference dataset.
    pub fn haduk_1km() -> Self {
        Self {
            x_min: -199_500.0,
            x_max: 699_500.0,
            y_min: -199_500.0,
            y_max: 1_249_500.0,
            crs_identifier: "EPSG:27700".to_string(),
            cell_size: 1000.0,
        }
    }

    /// Check `x_max > x_min`, `y_max > y_min` and `cell_size > 0`.
    pub fn validate(&self) -> ClimateResult<()> {
        let finite = [self.x_min, self.x_max, self.y_min, self.y_max, self.cell_size]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(ClimateError::InvalidExtent("non-finite bound".to_string()));
        }
        if self.x_max <= self.x_min {
            return Err(ClimateError::InvalidExtent(format!(
                "x_max {} must exceed x_min {}",
                self.x_max, self.x_min
            )));
        }
        if self.y_max <= self.y_min {
            return Err(ClimateError::InvalidExtent(format!(
                "y_max {} must exceed y_min {}",
                self.y_max, self.y_min
            )));
        }
        if self.cell_size <= 0.0 {
            return Err(ClimateError::InvalidExtent(format!(
                "cell_size {} must be positive",
                self.cell_size
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Height / width ratio, used to size the canvas.
    pub fn aspect_ratio(&self) -> f64 {
        self.height() / self.width()
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x_min, self.y_min, self.x_max, self.y_max)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bbox().contains_point(x, y)
    }

    /// Quantize a native coordinate to the key of the nearest cell centre.
    ///
    /// Halfway values round away from zero. Non-finite input yields `None`.
    pub fn cell_key(&self, x: f64, y: f64) -> Option<CellKey> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let quantize = |v: f64| ((v / self.cell_size).round() * self.cell_size) as i64;
        Some(CellKey {
            x: quantize(x),
            y: quantize(y),
        })
    }

    /// Footprint of a cell: centre ± half a cell in both axes.
    pub fn cell_bounds(&self, key: CellKey) -> BoundingBox {
        let half = self.cell_size / 2.0;
        let (cx, cy) = (key.x as f64, key.y as f64);
        BoundingBox::new(cx - half, cy - half, cx + half, cy + half)
    }
}

/// Integer key of a cell centre in native metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub x: i64,
    pub y: i64,
}

impl CellKey {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_inverted_extent() {
        assert!(GridExtent::new(0.0, 10.0, 0.0, 10.0, 1.0).is_ok());
        assert!(GridExtent::new(10.0, 0.0, 0.0, 10.0, 1.0).is_err());
        assert!(GridExtent::new(0.0, 10.0, 5.0, 5.0, 1.0).is_err());
        assert!(GridExtent::new(0.0, 10.0, 0.0, 10.0, 0.0).is_err());
    }

    #[test]
    fn test_cell_key_nearest_centre() {
        let extent = GridExtent::haduk_1km();
        assert_eq!(extent.cell_key(457_000.0, 166_000.0), Some(CellKey::new(457_000, 166_000)));
        assert_eq!(extent.cell_key(457_499.9, 165_500.1), Some(CellKey::new(457_000, 166_000)));
        assert_eq!(extent.cell_key(457_500.0, 166_000.0), Some(CellKey::new(458_000, 166_000)));
        assert_eq!(extent.cell_key(-199_400.0, -0.4), Some(CellKey::new(-199_000, 0)));
        assert_eq!(extent.cell_key(f64::NAN, 0.0), None);
    }

    #[test]
    fn test_cell_bounds() {
        let extent = GridExtent::haduk_1km();
        let bounds = extent.cell_bounds(CellKey::new(1000, 2000));
        assert_eq!(bounds, BoundingBox::new(500.0, 1500.0, 1500.0, 2500.0));
    }

    #[test]
    fn test_deserialize_producer_keys() {
        let json = r#"{"x_min":-199500.0,"x_max":699500.0,"y_min":-199500.0,
            "y_max":1249500.0,"crs":"EPSG:27700","resolution_meters":1000}"#;
        let extent: GridExtent = serde_json::from_str(json).unwrap();
        assert_eq!(extent, GridExtent::haduk_1km());
        assert!((extent.aspect_ratio() - 1449.0 / 899.0).abs() < 1e-12);
    }
}
