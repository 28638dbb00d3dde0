//! Loader behaviour against an on-disk fixture dataset.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use climate_common::{
    AverageGridKey, CellKey, ClimateError, ClimateResult, DatasetKey, FrameKey, GridKey, RasterFrame, Variable,
};
use storage::{DataSource, DatasetLoader, LoaderConfig, LocalSource};
use test_utils::{eastward_ramp, small_extent, with_gaps, DatasetBuilder};

/// Records every path requested from the inner source.
struct RecordingSource {
    inner: LocalSource,
    requests: Mutex<Vec<String>>,
}

impl RecordingSource {
    fn new(root: &std::path::Path) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalSource::new(root),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for RecordingSource {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn fetch(&self, path: &str) -> ClimateResult<Bytes> {
        self.requests.lock().unwrap().push(path.to_string());
        self.inner.fetch(path).await
    }
}

fn fixture() -> DatasetBuilder {
    let extent = small_extent();
    let ramp = eastward_ramp(&extent, 10.0, 1.0);
    DatasetBuilder::new(extent.clone())
        .metadata(&[2021, 2022], (20, 30))
        .locations()
        .grid(GridKey::new(Variable::Rainfall, 2021, 7), &ramp)
        .grid(GridKey::new(Variable::Rainfall, 2022, 7), &eastward_ramp(&extent, 20.0, 1.0))
        .plain_grid(GridKey::new(Variable::Sunshine, 2022, 7), &with_gaps(&ramp, 2))
        .frame(
            FrameKey::Monthly { year: 2022, month: 7 },
            &RasterFrame::filled(20, 30, [200, 100, 50, 255]),
        )
        .frame(FrameKey::Average { month: 7 }, &RasterFrame::filled(10, 10, [0, 0, 0, 255]))
        .raw("leaflet_data/rain/2022_08.json.gz", b"\x1f\x8bgarbage")
}

#[tokio::test]
async fn test_cached_key_skips_the_source() {
    let ds = fixture();
    let source = RecordingSource::new(ds.root());
    let loader = DatasetLoader::open(source.clone(), LoaderConfig::default()).await.unwrap();

    let key = GridKey::new(Variable::Rainfall, 2022, 7);
    let first = loader.grid(key).await.unwrap();
    let second = loader.grid(key).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let grid_fetches = source
        .requests()
        .iter()
        .filter(|p| p.ends_with("rain/2022_07.json.gz"))
        .count();
    assert_eq!(grid_fetches, 1);
    assert_eq!(loader.cache_stats().await.hits, 1);
}

#[tokio::test]
async fn test_plain_json_grid_and_frame_load() {
    let ds = fixture();
    let loader = DatasetLoader::open(Arc::new(LocalSource::new(ds.root())), LoaderConfig::default())
        .await
        .unwrap();

    let sun = loader.grid(GridKey::new(Variable::Sunshine, 2022, 7)).await.unwrap();
    assert_eq!(sun.len(), 300);

    let frame = loader.frame(FrameKey::Monthly { year: 2022, month: 7 }).await.unwrap();
    assert_eq!((frame.width, frame.height), (20, 30));
    assert_eq!(frame.pixel(3, 4), Some([200, 100, 50, 255]));
}

#[tokio::test]
async fn test_failures_are_recoverable_and_keyed() {
    let ds = fixture();
    let loader = DatasetLoader::open(Arc::new(LocalSource::new(ds.root())), LoaderConfig::default())
        .await
        .unwrap();

    let missing = loader.grid(GridKey::new(Variable::Rainfall, 2019, 1)).await.unwrap_err();
    assert!(matches!(&missing, ClimateError::DataUnavailable { key, .. } if key == "grid/rain/2019_01"));

    let corrupt = loader.grid(GridKey::new(Variable::Rainfall, 2022, 8)).await.unwrap_err();
    assert!(matches!(corrupt, ClimateError::MalformedPayload { .. }));

    // average frame has the wrong size for this dataset
    let wrong_size = loader.frame(FrameKey::Average { month: 7 }).await.unwrap_err();
    assert!(matches!(wrong_size, ClimateError::MalformedPayload { .. }));

    assert!(missing.is_recoverable() && corrupt.is_recoverable());
    assert!(!loader.is_cached(&DatasetKey::Grid(GridKey::new(Variable::Rainfall, 2022, 8))).await);
}

#[tokio::test]
async fn test_average_grid_is_per_cell_mean_over_years() {
    let ds = fixture();
    let loader = DatasetLoader::open(Arc::new(LocalSource::new(ds.root())), LoaderConfig::default())
        .await
        .unwrap();

    let avg = loader
        .average_grid(AverageGridKey::new(Variable::Rainfall, 7))
        .await
        .unwrap();
    // 2021 ramp starts at 10, 2022 at 20
    assert_eq!(avg.get(CellKey::new(450_000, 160_000)), Some(15.0));
    assert_eq!(avg.get(CellKey::new(469_000, 189_000)), Some(34.0));

    // no year has temperature
    assert!(loader
        .average_grid(AverageGridKey::new(Variable::Temperature, 7))
        .await
        .is_err());
}

#[tokio::test]
async fn test_missing_metadata_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = DatasetLoader::open(Arc::new(LocalSource::new(dir.path())), LoaderConfig::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClimateError::InitializationFailure(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_builtin_locations() {
    let ds = fixture();
    let loader = DatasetLoader::open(Arc::new(LocalSource::new(ds.root())), LoaderConfig::default())
        .await
        .unwrap();
    let locations = loader.load_locations().await.unwrap();
    assert_eq!(locations.len(), 4);
    assert_eq!(locations[0].name, "Woolhampton");
}

#[tokio::test]
async fn test_prefetch_fills_cache_and_swallows_failures() {
    let ds = fixture();
    let loader = DatasetLoader::open(Arc::new(LocalSource::new(ds.root())), LoaderConfig::default())
        .await
        .unwrap();

    let present = DatasetKey::Grid(GridKey::new(Variable::Rainfall, 2021, 7));
    let absent = DatasetKey::Frame(FrameKey::Monthly { year: 2022, month: 8 });
    loader.prefetch(&[present, absent]).await;

    assert!(loader.is_cached(&present).await);
    assert!(!loader.is_cached(&absent).await);
}
