//! WGS84 points and rectangular lat/lon bounds.

use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Rectangular bounds in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Smallest bounds containing every point, or `None` for an empty input.
    pub fn enclosing(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self::new(p.lat, p.lon, p.lat, p.lon),
                Some(b) => Self::new(
                    b.south.min(p.lat),
                    b.west.min(p.lon),
                    b.north.max(p.lat),
                    b.east.max(p.lon),
                ),
            })
        })
    }

    /// Linear position inside the bounds: `u` runs west to east, `v` runs
    /// north to south, both in [0, 1].
    pub fn lerp(&self, u: f64, v: f64) -> GeoPoint {
        GeoPoint {
            lat: self.north - v * (self.north - self.south),
            lon: self.west + u * (self.east - self.west),
        }
    }

    pub fn center(&self) -> GeoPoint {
        self.lerp(0.5, 0.5)
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }
}
