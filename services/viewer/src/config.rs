//! Viewer configuration.
//!
//! Sources are layered: built-in defaults, then an optional YAML file, then
//! `CLIMATE_*` environment variables. Command-line flags are applied last
//! by the binary.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use climate_common::{DatasetLayout, ImageDimensions};
use renderer::OverlayStrategy;
use serde::{Deserialize, Serialize};
use storage::{EvictionPolicy, LoaderConfig};

use crate::navigation::DisplayMode;
use crate::ui::PLAYBACK_SPEEDS_MS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Dataset root: a directory or an `http(s)://` base URL
    pub data_root: String,
    pub listen: String,
    pub cache: CacheSettings,
    pub overlay: OverlaySettings,
    pub canvas: CanvasSettings,
    pub playback: PlaybackSettings,
    /// Where custom locations are persisted
    pub locations_file: PathBuf,
    /// Display used when a session starts
    pub display: DisplayMode,
    pub layout: DatasetLayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    pub policy: EvictionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub strategy: OverlayStrategy,
    pub bitmap_width: u32,
    pub bitmap_height: u32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: u32,
    /// TrueType font for marker labels
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub speed_ms: u64,
    /// Fetch the next step's datasets in the background after each load
    pub preload: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_root: "data".to_string(),
            listen: "0.0.0.0:8080".to_string(),
            cache: CacheSettings::default(),
            overlay: OverlaySettings::default(),
            canvas: CanvasSettings::default(),
            playback: PlaybackSettings::default(),
            locations_file: PathBuf::from("custom_locations.json"),
            display: DisplayMode::default(),
            layout: DatasetLayout::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 20,
            policy: EvictionPolicy::Fifo,
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            strategy: OverlayStrategy::Bitmap,
            bitmap_width: 2000,
            bitmap_height: 3000,
            opacity: 0.7,
        }
    }
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 800,
            font: None,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed_ms: 1000,
            preload: true,
        }
    }
}

impl ViewerConfig {
    /// Defaults, overlaid by the YAML file when one is given.
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        tracing::info!(path = ?path, "Loaded viewer config");
        Ok(config)
    }

    /// File, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `CLIMATE_*` variables looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = lookup("CLIMATE_DATA") {
            self.data_root = root;
        }
        if let Some(capacity) = lookup("CLIMATE_CACHE_CAPACITY") {
            self.cache.capacity = capacity
                .trim()
                .parse()
                .with_context(|| format!("CLIMATE_CACHE_CAPACITY is not a number: {}", capacity))?;
        }
        if let Some(strategy) = lookup("CLIMATE_OVERLAY_STRATEGY") {
            self.overlay.strategy = strategy.parse()?;
        }
        if let Some(file) = lookup("CLIMATE_LOCATIONS_FILE") {
            self.locations_file = PathBuf::from(file);
        }
        if let Some(font) = lookup("CLIMATE_FONT") {
            self.canvas.font = Some(PathBuf::from(font));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            bail!("cache capacity must be at least 1");
        }
        if self.canvas.width == 0 {
            bail!("canvas width must be at least 1");
        }
        if self.overlay.bitmap_width == 0 || self.overlay.bitmap_height == 0 {
            bail!(
                "overlay bitmap size must be non-zero, got {}x{}",
                self.overlay.bitmap_width,
                self.overlay.bitmap_height
            );
        }
        if !(0.0..=1.0).contains(&self.overlay.opacity) {
            bail!("overlay opacity {} is outside 0..=1", self.overlay.opacity);
        }
        if !PLAYBACK_SPEEDS_MS.contains(&self.playback.speed_ms) {
            bail!(
                "playback speed {} ms is not one of {:?}",
                self.playback.speed_ms,
                PLAYBACK_SPEEDS_MS
            );
        }
        Ok(())
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            cache_capacity: self.cache.capacity,
            cache_policy: self.cache.policy,
            layout: self.layout.clone(),
        }
    }

    pub fn bitmap_size(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.overlay.bitmap_width,
            height: self.overlay.bitmap_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = ViewerConfig::default();
        assert_eq!(c.cache.capacity, 20);
        assert_eq!(c.cache.policy, EvictionPolicy::Fifo);
        assert_eq!(c.overlay.strategy, OverlayStrategy::Bitmap);
        assert_eq!((c.overlay.bitmap_width, c.overlay.bitmap_height), (2000, 3000));
        assert_eq!(c.canvas.width, 800);
        assert_eq!(c.playback.speed_ms, 1000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "data_root: /srv/climate\ncache:\n  policy: lru\noverlay:\n  strategy: quads"
        )
        .unwrap();

        let c = ViewerConfig::from_file(Some(file.path())).unwrap();
        assert_eq!(c.data_root, "/srv/climate");
        assert_eq!(c.cache.policy, EvictionPolicy::Lru);
        assert_eq!(c.cache.capacity, 20);
        assert_eq!(c.overlay.strategy, OverlayStrategy::Quads);
        assert_eq!(c.overlay.bitmap_width, 2000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CLIMATE_DATA", "https://example.org/climate"),
            ("CLIMATE_CACHE_CAPACITY", "40"),
            ("CLIMATE_OVERLAY_STRATEGY", "cells"),
        ]
        .into_iter()
        .collect();

        let mut c = ViewerConfig::default();
        c.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.data_root, "https://example.org/climate");
        assert_eq!(c.cache.capacity, 40);
        assert_eq!(c.overlay.strategy, OverlayStrategy::Quads);

        let bad = |k: &str| (k == "CLIMATE_CACHE_CAPACITY").then(|| "lots".to_string());
        assert!(ViewerConfig::default().apply_env(bad).is_err());
    }

    #[test]
    fn test_validation() {
        let mut c = ViewerConfig::default();
        c.playback.speed_ms = 300;
        assert!(c.validate().is_err());

        let mut c = ViewerConfig::default();
        c.cache.capacity = 0;
        assert!(c.validate().is_err());
    }
}
