//! Cached dataset loading.
//!
//! [`DatasetLoader`] is opened once per session: it fetches and validates the
//! metadata document up front (any failure there is fatal), then serves
//! frames and grids through a bounded [`DataCache`]. A request for a key
//! already in the cache returns without touching the source.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use climate_common::{
    AverageGridKey, ClimateError, ClimateResult, DatasetKey, DatasetLayout, DatasetMetadata, FrameKey, GridKey,
    NamedLocation, RasterFrame, SparseGrid,
};
use futures::future::{join_all, try_join_all};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheStats, DataCache, EvictionPolicy};
use crate::decode::{decode_frame_sized, decode_grid};
use crate::source::DataSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub cache_capacity: usize,
    pub cache_policy: EvictionPolicy,
    pub layout: DatasetLayout,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 20,
            cache_policy: EvictionPolicy::Fifo,
            layout: DatasetLayout::default(),
        }
    }
}

/// A decoded cache entry.
#[derive(Debug, Clone)]
pub enum CachedDataset {
    Frame(Arc<RasterFrame>),
    Grid(Arc<SparseGrid>),
}

pub struct DatasetLoader {
    source: Arc<dyn DataSource>,
    layout: DatasetLayout,
    metadata: Arc<DatasetMetadata>,
    cache: DataCache<DatasetKey, CachedDataset>,
}

impl DatasetLoader {
    /// Fetch and validate the metadata document.
    #[instrument(skip(source, config), fields(root = %source.describe()))]
    pub async fn open(source: Arc<dyn DataSource>, config: LoaderConfig) -> ClimateResult<Self> {
        let bytes = source
            .fetch(&config.layout.metadata_file)
            .await
            .map_err(|e| ClimateError::InitializationFailure(format!("metadata: {}", e)))?;
        let json = std::str::from_utf8(&bytes)
            .map_err(|e| ClimateError::InitializationFailure(format!("metadata: {}", e)))?;
        let metadata = DatasetMetadata::from_json(json)?;

        let (first, last) = metadata.year_range();
        info!(
            first_year = first,
            last_year = last,
            width = metadata.image_dimensions.width,
            height = metadata.image_dimensions.height,
            cache_capacity = config.cache_capacity,
            cache_policy = %config.cache_policy,
            "Opened dataset"
        );

        Ok(Self {
            source,
            layout: config.layout,
            metadata: Arc::new(metadata),
            cache: DataCache::new(config.cache_capacity, config.cache_policy),
        })
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn is_cached(&self, key: &DatasetKey) -> bool {
        self.cache.contains(key).await
    }

    /// Built-in locations. Required at startup, so any failure is fatal.
    pub async fn load_locations(&self) -> ClimateResult<Vec<NamedLocation>> {
        let bytes = self
            .source
            .fetch(&self.layout.locations_file)
            .await
            .map_err(|e| ClimateError::InitializationFailure(format!("locations: {}", e)))?;
        let locations: Vec<NamedLocation> = serde_json::from_slice(&bytes)
            .map_err(|e| ClimateError::InitializationFailure(format!("locations: {}", e)))?;
        info!(count = locations.len(), "Loaded built-in locations");
        Ok(locations)
    }

    pub async fn frame(&self, key: FrameKey) -> ClimateResult<Arc<RasterFrame>> {
        match self.load(DatasetKey::Frame(key)).await? {
            CachedDataset::Frame(frame) => Ok(frame),
            CachedDataset::Grid(_) => Err(mismatch(&DatasetKey::Frame(key))),
        }
    }

    pub async fn grid(&self, key: GridKey) -> ClimateResult<Arc<SparseGrid>> {
        match self.load(DatasetKey::Grid(key)).await? {
            CachedDataset::Grid(grid) => Ok(grid),
            CachedDataset::Frame(_) => Err(mismatch(&DatasetKey::Grid(key))),
        }
    }

    pub async fn average_grid(&self, key: AverageGridKey) -> ClimateResult<Arc<SparseGrid>> {
        match self.load(DatasetKey::AverageGrid(key)).await? {
            CachedDataset::Grid(grid) => Ok(grid),
            CachedDataset::Frame(_) => Err(mismatch(&DatasetKey::AverageGrid(key))),
        }
    }

    /// Load several keys concurrently; the first failure wins.
    pub async fn load_all(&self, keys: &[DatasetKey]) -> ClimateResult<Vec<CachedDataset>> {
        try_join_all(keys.iter().map(|key| self.load(*key))).await
    }

    /// Warm the cache for keys likely to be needed next. Failures are only
    /// logged.
    pub async fn prefetch(&self, keys: &[DatasetKey]) {
        let results = join_all(keys.iter().map(|key| self.load(*key))).await;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                debug!(key = %key, error = %e, "Prefetch failed");
            }
        }
    }

    /// Cache-first load of one dataset.
    pub async fn load(&self, key: DatasetKey) -> ClimateResult<CachedDataset> {
        if let Some(hit) = self.cache.get(&key).await {
            counter!("climate_cache_hits_total").increment(1);
            debug!(key = %key, "Cache hit");
            return Ok(hit);
        }
        counter!("climate_cache_misses_total").increment(1);

        let start = Instant::now();
        let loaded = match key {
            DatasetKey::Frame(k) => self.fetch_frame(k).await.map(CachedDataset::Frame),
            DatasetKey::Grid(k) => self.fetch_grid(k).await.map(CachedDataset::Grid),
            DatasetKey::AverageGrid(k) => self.build_average(k).await.map(CachedDataset::Grid),
        };
        let loaded = match loaded {
            Ok(value) => value,
            Err(e) => {
                counter!("climate_fetch_failures_total").increment(1);
                warn!(key = %key, operation = "load", error = %e, "Dataset load failed");
                return Err(e);
            }
        };
        histogram!("climate_load_duration_seconds").record(start.elapsed().as_secs_f64());

        if let Some(evicted) = self.cache.insert(key, loaded.clone()).await {
            debug!(evicted = %evicted, "Evicted cache entry");
        }
        Ok(loaded)
    }

    async fn fetch(&self, key: &DatasetKey, path: &str) -> ClimateResult<Bytes> {
        counter!("climate_fetches_total").increment(1);
        self.source.fetch(path).await.map_err(|e| match e {
            // report the dataset key rather than the path
            ClimateError::DataUnavailable { reason, .. } => ClimateError::data_unavailable(key.cache_key(), reason),
            other => other,
        })
    }

    async fn fetch_frame(&self, key: FrameKey) -> ClimateResult<Arc<RasterFrame>> {
        let dataset_key = DatasetKey::Frame(key);
        let bytes = self.fetch(&dataset_key, &self.layout.frame_path(&key)).await?;
        let expected = self.metadata.image_dimensions;
        let name = dataset_key.cache_key();
        let frame = tokio::task::spawn_blocking(move || decode_frame_sized(&name, &bytes, expected))
            .await
            .map_err(|e| ClimateError::RenderError(format!("decode task: {}", e)))??;
        Ok(Arc::new(frame))
    }

    async fn fetch_grid(&self, key: GridKey) -> ClimateResult<Arc<SparseGrid>> {
        let dataset_key = DatasetKey::Grid(key);
        let bytes = self.fetch(&dataset_key, &self.layout.grid_path(&key)).await?;
        let extent = self.metadata.extent.clone();
        let name = dataset_key.cache_key();
        let grid = tokio::task::spawn_blocking(move || decode_grid(&name, &bytes, &extent))
            .await
            .map_err(|e| ClimateError::RenderError(format!("decode task: {}", e)))??;
        Ok(Arc::new(grid))
    }

    /// Per-cell mean over every dataset year. The yearly grids are fetched
    /// concurrently and bypass the cache; years that fail to load are left
    /// out of the mean.
    async fn build_average(&self, key: AverageGridKey) -> ClimateResult<Arc<SparseGrid>> {
        let yearly = join_all(
            self.metadata
                .years
                .iter()
                .map(|&year| self.fetch_grid(GridKey::new(key.variable, year, key.month))),
        )
        .await;

        let mut grids = Vec::with_capacity(yearly.len());
        for (year, result) in self.metadata.years.iter().zip(yearly) {
            match result {
                Ok(grid) => grids.push(grid),
                Err(e) => warn!(year, key = %key.cache_key(), error = %e, "Year left out of average"),
            }
        }
        if grids.is_empty() {
            return Err(ClimateError::data_unavailable(key.cache_key(), "no year could be loaded"));
        }

        let mean = SparseGrid::mean_of(grids.iter().map(|g| g.as_ref()));
        debug!(key = %key.cache_key(), years = grids.len(), cells = mean.len(), "Built average grid");
        Ok(Arc::new(mean))
    }
}

fn mismatch(key: &DatasetKey) -> ClimateError {
    ClimateError::malformed(key.cache_key(), "cached entry has the wrong kind")
}
