//! Data access for the climate viewer.
//!
//! - [`cache`]: bounded key → decoded-dataset cache (FIFO or LRU eviction)
//! - [`source`]: where payload bytes come from (a directory or an HTTP base URL)
//! - [`decode`]: PNG frames and gzip-compressed JSON sparse grids
//! - [`loader`]: cached, concurrent dataset loading on top of a source
//! - [`locations`]: persistence of user-defined locations

pub mod cache;
pub mod decode;
pub mod loader;
pub mod locations;
pub mod source;

pub use cache::{CacheStats, DataCache, EvictionPolicy};
pub use loader::{CachedDataset, DatasetLoader, LoaderConfig};
pub use locations::CustomLocationStore;
pub use source::{open_source, DataSource, HttpSource, LocalSource};
