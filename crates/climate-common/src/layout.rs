//! Relative paths of every document in a dataset, shared by the loaders
//! and the fixture builder.

use serde::{Deserialize, Serialize};

use crate::{FrameKey, GridKey};

/// Directory and file names of a dataset below its root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetLayout {
    pub metadata_file: String,
    pub locations_file: String,
    /// Monthly frames live at `{frames_dir}/{year}/{MM}.png`
    pub frames_dir: String,
    /// Averaged frames live at `{averages_dir}/{MM}.png`
    pub averages_dir: String,
    /// Sparse grids live at `{grids_dir}/{variable}/{year}_{MM}.json.gz`
    pub grids_dir: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            metadata_file: "metadata.json".to_string(),
            locations_file: "locations.json".to_string(),
            frames_dir: "images".to_string(),
            averages_dir: "images/average".to_string(),
            grids_dir: "leaflet_data".to_string(),
        }
    }
}

impl DatasetLayout {
    pub fn frame_path(&self, key: &FrameKey) -> String {
        match key {
            FrameKey::Monthly { year, month } => {
                format!("{}/{}/{:02}.png", self.frames_dir, year, month)
            }
            FrameKey::Average { month } => format!("{}/{:02}.png", self.averages_dir, month),
        }
    }

    pub fn grid_path(&self, key: &GridKey) -> String {
        format!(
            "{}/{}/{}_{:02}.json.gz",
            self.grids_dir,
            key.variable.dir_name(),
            key.year,
            key.month
        )
    }
}
