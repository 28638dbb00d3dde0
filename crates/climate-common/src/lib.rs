//! Common types shared across the climate viewer crates.

pub mod bbox;
pub mod color;
pub mod error;
pub mod extent;
pub mod frame;
pub mod grid;
pub mod layer;
pub mod layout;
pub mod location;
pub mod metadata;
pub mod period;

pub use bbox::BoundingBox;
pub use color::Color;
pub use error::{ClimateError, ClimateResult};
pub use extent::{CellKey, GridExtent};
pub use frame::RasterFrame;
pub use grid::SparseGrid;
pub use layer::Layer;
pub use layout::DatasetLayout;
pub use location::{LocationSet, NamedLocation};
pub use metadata::{DatasetMetadata, ImageDimensions, TemperatureScale};
pub use period::{AverageGridKey, DatasetKey, FrameKey, GridKey, Period, Variable, ViewMode};
