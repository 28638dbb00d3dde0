//! Fixture dataset and sources shared by the viewer integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use climate_common::{ClimateResult, FrameKey, GridKey, RasterFrame, Variable};
use storage::{DataSource, LocalSource};
use tempfile::TempDir;
use test_utils::{eastward_ramp, northward_ramp, small_extent, with_gaps, DatasetBuilder};
use tokio::sync::Notify;
use viewer::{DisplayMode, ViewerConfig};

pub const RED: [u8; 4] = [200, 30, 30, 255];
pub const BLUE: [u8; 4] = [30, 30, 200, 255];
pub const GREEN: [u8; 4] = [30, 200, 30, 255];

/// Two years of data for July and August 2022 plus July 2021. September
/// 2022 is deliberately missing.
pub fn fixture() -> DatasetBuilder {
    let extent = small_extent();
    DatasetBuilder::new(extent.clone())
        .metadata(&[2021, 2022], (20, 30))
        .locations()
        .grid(
            GridKey::new(Variable::Rainfall, 2022, 7),
            &eastward_ramp(&extent, 20.0, 5.0),
        )
        .grid(
            GridKey::new(Variable::Sunshine, 2022, 7),
            &with_gaps(&northward_ramp(&extent, 100.0, 2.0), 4),
        )
        .grid(
            GridKey::new(Variable::Rainfall, 2021, 7),
            &eastward_ramp(&extent, 10.0, 5.0),
        )
        .grid(
            GridKey::new(Variable::Sunshine, 2021, 7),
            &northward_ramp(&extent, 120.0, 2.0),
        )
        .grid(
            GridKey::new(Variable::Temperature, 2022, 7),
            &northward_ramp(&extent, -5.0, 1.0),
        )
        .frame(
            FrameKey::Monthly { year: 2022, month: 7 },
            &RasterFrame::filled(20, 30, RED),
        )
        .frame(
            FrameKey::Monthly { year: 2022, month: 8 },
            &RasterFrame::filled(20, 30, BLUE),
        )
        .frame(
            FrameKey::Monthly { year: 2021, month: 7 },
            &RasterFrame::filled(20, 30, GREEN),
        )
}

/// Small rendering sizes, no background preloading, custom locations in
/// `state_dir`.
pub fn config(state_dir: &TempDir, display: DisplayMode) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    config.display = display;
    config.locations_file = state_dir.path().join("custom_locations.json");
    config.playback.preload = false;
    config.canvas.width = 200;
    config.overlay.bitmap_width = 60;
    config.overlay.bitmap_height = 90;
    config
}

/// Records every path requested from the inner source.
pub struct RecordingSource {
    inner: LocalSource,
    requests: Mutex<Vec<String>>,
}

impl RecordingSource {
    pub fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalSource::new(root),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Requested grid paths, sorted.
    pub fn grid_requests(&self) -> Vec<String> {
        let mut grids: Vec<String> = self
            .requests()
            .into_iter()
            .filter(|p| p.starts_with("leaflet_data/"))
            .collect();
        grids.sort();
        grids
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

/// Holds back one path until released.
pub struct GatedSource {
    inner: LocalSource,
    gated: String,
    pub arrived: Notify,
    pub release: Notify,
}

impl GatedSource {
    pub fn new(root: &Path, gated: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalSource::new(root),
            gated: gated.to_string(),
            arrived: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl DataSource for GatedSource {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn fetch(&self, path: &str) -> ClimateResult<Bytes> {
        if path == self.gated {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        self.inner.fetch(path).await
    }
}
