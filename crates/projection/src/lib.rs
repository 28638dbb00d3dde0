//! Coordinate reference system transformations.
//!
//! Implements the British National Grid (OSGB36 transverse Mercator on the
//! Airy 1830 ellipsoid) and its datum shift to WGS84 from scratch, plus the
//! spherical Web Mercator used by slippy-map displays.

pub mod ellipsoid;
pub mod geodetic;
pub mod helmert;
pub mod mercator;
pub mod national_grid;
pub mod transverse_mercator;

pub use ellipsoid::Ellipsoid;
pub use geodetic::{GeoBounds, GeoPoint};
pub use helmert::Helmert;
pub use mercator::WebMercator;
pub use national_grid::BritishNationalGrid;
pub use transverse_mercator::TransverseMercator;
