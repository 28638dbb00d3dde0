//! Persistence of user-defined locations.
//!
//! The store is a JSON array in a single file. Saves go through a temporary
//! file in the same directory and an atomic rename, so a crash mid-write
//! leaves the previous list intact. An unreadable or corrupt store is never
//! fatal: loading falls back to an empty list.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use climate_common::{ClimateError, ClimateResult, NamedLocation};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CustomLocationStore {
    path: PathBuf,
}

impl CustomLocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored list. Every returned location is marked custom.
    pub async fn load(&self) -> Vec<NamedLocation> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No custom location store yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), operation = "load", error = %e, "Custom location store unreadable, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<NamedLocation>>(&bytes) {
            Ok(mut locations) => {
                for loc in &mut locations {
                    loc.is_custom = true;
                }
                info!(count = locations.len(), "Loaded custom locations");
                locations
            }
            Err(e) => {
                warn!(path = %self.path.display(), operation = "load", error = %e, "Custom location store corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Replace the stored list.
    pub async fn save(&self, locations: &[NamedLocation]) -> ClimateResult<()> {
        let json = serde_json::to_vec_pretty(locations)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| ClimateError::StorageUnavailable(format!("save task: {}", e)))??;
        debug!(path = %self.path.display(), count = locations.len(), "Saved custom locations");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> ClimateResult<()> {
    let storage_err = |e: std::io::Error| {
        ClimateError::StorageUnavailable(format!("{}: {}", path.display(), e))
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.as_file().sync_all().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_survives_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/custom_locations.json");
        let a = NamedLocation::custom("Garden", 457_100.0, 166_200.0, "Custom");
        let b = NamedLocation::custom("Allotment", 458_000.0, 167_000.0, "Custom");

        CustomLocationStore::new(&path).save(&[a.clone(), b.clone()]).await.unwrap();

        let reopened = CustomLocationStore::new(&path).load().await;
        assert_eq!(reopened, vec![a, b]);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_fall_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_locations.json");
        let store = CustomLocationStore::new(&path);
        assert!(store.load().await.is_empty());

        std::fs::write(&path, b"[{\"name\": ").unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_loaded_entries_are_custom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_locations.json");
        std::fs::write(&path, br#"[{"id": "x1", "name": "Shed", "x": 1.0, "y": 2.0}]"#).unwrap();

        let loaded = CustomLocationStore::new(&path).load().await;
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_custom);
        assert!(loaded[0].visible);
    }
}
