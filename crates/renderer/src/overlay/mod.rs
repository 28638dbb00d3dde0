//! Geo overlay rendering for the slippy-map display mode.
//!
//! One interface, two interchangeable strategies chosen by configuration:
//!
//! - [`CompositedBitmap`]: a fixed-size bitmap whose corners sit on fixed
//!   lat/lon bounds. Each pixel centre is found by linear interpolation in
//!   lat/lon (matching how a map library stretches an image overlay), then
//!   projected *backward* into the national grid to pick its cell.
//! - [`CellQuads`]: every cell's four corners projected *forward* on their
//!   own, drawn as free quadrilaterals. Only cells inside the visible map
//!   bounds are produced.

mod bitmap;
mod quads;
mod viewport;

pub use bitmap::{CompositedBitmap, OverlayBitmap};
pub use quads::{CellQuad, CellQuads, QuadSet};
pub use viewport::MapViewport;

use std::fmt;
use std::str::FromStr;

use climate_common::{ClimateError, ClimateResult, GridExtent, ImageDimensions};
use projection::GeoBounds;
use serde::{Deserialize, Serialize};

use crate::field::ColorField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlayStrategy {
    #[default]
    Bitmap,
    Quads,
}

impl OverlayStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayStrategy::Bitmap => "bitmap",
            OverlayStrategy::Quads => "quads",
        }
    }
}

impl FromStr for OverlayStrategy {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitmap" | "composited" | "image" => Ok(OverlayStrategy::Bitmap),
            "quads" | "cells" | "polygons" => Ok(OverlayStrategy::Quads),
            other => Err(ClimateError::invalid_parameter(
                "overlay_strategy",
                format!("unknown overlay strategy '{}'", other),
            )),
        }
    }
}

impl fmt::Display for OverlayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a classified frame onto a geodetic map.
pub trait GeoOverlayRenderer: Send + Sync {
    fn strategy(&self) -> OverlayStrategy;

    /// Lat/lon rectangle the overlay is declared over.
    fn bounds(&self) -> GeoBounds;

    /// `viewport` limits the work to the visible region where the strategy
    /// supports it; the bitmap strategy always covers its fixed bounds.
    fn render(&self, field: &ColorField, viewport: Option<&MapViewport>) -> ClimateResult<OverlayOutput>;
}

/// Output of either strategy.
#[derive(Debug, Clone)]
pub enum OverlayOutput {
    Bitmap(OverlayBitmap),
    Quads(QuadSet),
}

impl OverlayOutput {
    /// Encode as PNG with a uniform opacity. Quads are rasterized onto the
    /// viewport, which is therefore required for them.
    pub fn to_png(&self, opacity: f32, viewport: Option<&MapViewport>) -> ClimateResult<Vec<u8>> {
        match self {
            OverlayOutput::Bitmap(bitmap) => bitmap.to_png(opacity),
            OverlayOutput::Quads(quads) => {
                let viewport = viewport.ok_or_else(|| {
                    ClimateError::invalid_parameter("viewport", "quad overlays need a map viewport")
                })?;
                crate::png::encode_frame(&quads.rasterize(viewport, opacity)?)
            }
        }
    }

    pub fn drawn_cells(&self) -> usize {
        match self {
            OverlayOutput::Bitmap(bitmap) => bitmap.painted_pixels(),
            OverlayOutput::Quads(quads) => quads.quads.len(),
        }
    }
}

/// Build the configured strategy for an extent.
pub fn build_renderer(
    strategy: OverlayStrategy,
    extent: &GridExtent,
    bitmap_size: ImageDimensions,
) -> ClimateResult<Box<dyn GeoOverlayRenderer>> {
    Ok(match strategy {
        OverlayStrategy::Bitmap => Box::new(CompositedBitmap::new(
            extent.clone(),
            bitmap_size.width,
            bitmap_size.height,
        )?),
        OverlayStrategy::Quads => Box::new(CellQuads::new(extent.clone())?),
    })
}
