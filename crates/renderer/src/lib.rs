//! Classification, colour mapping and rendering for the climate viewer.
//!
//! - [`classify`]: per-frame tertiles and fixed-scale bins
//! - [`colormap`]: bivariate 3×3 matrix and univariate gradient
//! - [`field`]: classified per-cell palette indices and legend
//! - [`affine`], [`markers`], [`canvas`]: the raster compositor
//! - [`overlay`]: geo overlay strategies for slippy maps
//! - [`png`]: indexed and RGBA PNG encoding

pub mod affine;
pub mod canvas;
pub mod classify;
pub mod colormap;
pub mod field;
pub mod markers;
pub mod overlay;
pub mod png;

pub use affine::{CanvasMapping, ViewTransform};
pub use canvas::RasterCompositor;
pub use classify::{compute_tertiles, FixedScale, TertileClass, Thresholds};
pub use colormap::{BivariateScheme, GradientScheme};
pub use field::{ColorField, Legend};
pub use overlay::{GeoOverlayRenderer, MapViewport, OverlayOutput, OverlayStrategy};
