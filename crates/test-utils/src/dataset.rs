//! On-disk fixture datasets.
//!
//! [`DatasetBuilder`] writes a directory laid out exactly like the offline
//! pipeline's output (see [`DatasetLayout`]) into a temporary directory that
//! is removed when the builder is dropped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use climate_common::{DatasetLayout, FrameKey, GridExtent, GridKey, RasterFrame, SparseGrid};
use flate2::write::GzEncoder;
use flate2::Compression;
use image::{ImageFormat, RgbaImage};
use tempfile::TempDir;

use crate::fixtures::{metadata_json, LOCATIONS_JSON};

pub struct DatasetBuilder {
    dir: TempDir,
    layout: DatasetLayout,
    extent: GridExtent,
}

impl DatasetBuilder {
    pub fn new(extent: GridExtent) -> Self {
        let dir = tempfile::tempdir().expect("create fixture dataset dir");
        Self {
            dir,
            layout: DatasetLayout::default(),
            extent,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn extent(&self) -> &GridExtent {
        &self.extent
    }

    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Metadata listing `years`, with frames of `image_size`.
    pub fn metadata(self, years: &[i32], image_size: (u32, u32)) -> Self {
        let json = metadata_json(&self.extent, years, image_size);
        self.write_bytes(&self.layout.metadata_file, json.as_bytes());
        self
    }

    pub fn locations(self) -> Self {
        self.write_bytes(&self.layout.locations_file, LOCATIONS_JSON.as_bytes());
        self
    }

    /// Gzip-compressed nested JSON grid, as the pipeline writes it.
    pub fn grid(self, key: GridKey, grid: &SparseGrid) -> Self {
        let json = serde_json::to_vec(&grid.to_nested()).expect("serialize fixture grid");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&json).expect("gzip fixture grid");
        let bytes = encoder.finish().expect("finish gzip stream");
        self.write_bytes(&self.layout.grid_path(&key), &bytes);
        self
    }

    /// Uncompressed JSON at the grid path, for the plain-JSON fallback.
    pub fn plain_grid(self, key: GridKey, grid: &SparseGrid) -> Self {
        let json = serde_json::to_vec(&grid.to_nested()).expect("serialize fixture grid");
        self.write_bytes(&self.layout.grid_path(&key), &json);
        self
    }

    pub fn frame(self, key: FrameKey, frame: &RasterFrame) -> Self {
        let image = RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
            .expect("frame buffer matches its dimensions");
        let mut bytes = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encode fixture frame");
        self.write_bytes(&self.layout.frame_path(&key), bytes.get_ref());
        self
    }

    /// Arbitrary bytes at a dataset-relative path, e.g. a corrupt payload.
    pub fn raw(self, relative: &str, bytes: &[u8]) -> Self {
        self.write_bytes(relative, bytes);
        self
    }

    fn write_bytes(&self, relative: &str, bytes: &[u8]) {
        let path = self.path_of(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture directory");
        }
        fs::write(&path, bytes).expect("write fixture file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::small_extent;
    use crate::generators::eastward_ramp;
    use climate_common::Variable;

    #[test]
    fn test_builder_writes_pipeline_layout() {
        let extent = small_extent();
        let grid = eastward_ramp(&extent, 0.0, 1.0);
        let ds = DatasetBuilder::new(extent)
            .metadata(&[2022], (20, 30))
            .locations()
            .grid(GridKey::new(Variable::Rainfall, 2022, 7), &grid)
            .frame(
                FrameKey::Monthly { year: 2022, month: 7 },
                &RasterFrame::filled(20, 30, [10, 20, 30, 255]),
            );

        assert!(ds.path_of("metadata.json").is_file());
        assert!(ds.path_of("locations.json").is_file());
        assert!(ds.path_of("leaflet_data/rain/2022_07.json.gz").is_file());
        assert!(ds.path_of("images/2022/07.png").is_file());

        let gz = fs::read(ds.path_of("leaflet_data/rain/2022_07.json.gz")).unwrap();
        assert_eq!(&gz[..2], &[0x1f, 0x8b]);
    }
}
