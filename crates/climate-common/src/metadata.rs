//! Dataset metadata document produced alongside the frames and grids.

use crate::{ClimateError, ClimateResult, Color, GridExtent};
use serde::{Deserialize, Serialize};

/// Default fixed temperature scale in °C.
pub const DEFAULT_TEMPERATURE_RANGE: (f64, f64) = (-10.0, 32.0);

/// Root metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub extent: GridExtent,
    pub image_dimensions: ImageDimensions,
    pub years: Vec<i32>,
    #[serde(default = "default_months")]
    pub months: Vec<u32>,
    /// Nine bivariate colours, row-major with rows = rain class, columns = sun class
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub temperature: Option<TemperatureScale>,
    #[serde(default)]
    pub data_source: String,
}

fn default_months() -> Vec<u32> {
    (1..=12).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureScale {
    pub scale_range: ScaleRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl DatasetMetadata {
    /// Parse and validate a metadata document.
    pub fn from_json(json: &str) -> ClimateResult<Self> {
        let metadata: Self = serde_json::from_str(json)
            .map_err(|e| ClimateError::InitializationFailure(format!("metadata: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn validate(&self) -> ClimateResult<()> {
        self.extent
            .validate()
            .map_err(|e| ClimateError::InitializationFailure(e.to_string()))?;

        if self.years.is_empty() {
            return Err(ClimateError::InitializationFailure(
                "metadata lists no years".to_string(),
            ));
        }
        if self.image_dimensions.width == 0 || self.image_dimensions.height == 0 {
            return Err(ClimateError::InitializationFailure(
                "image dimensions must be non-zero".to_string(),
            ));
        }
        if !self.colors.is_empty() {
            self.bivariate_colors()?;
        }
        if let Some(scale) = &self.temperature {
            let ScaleRange { min, max } = scale.scale_range;
            if !min.is_finite() || !max.is_finite() {
                return Err(ClimateError::InitializationFailure(format!(
                    "temperature scale bounds must be finite, got {}..{}",
                    min, max
                )));
            }
            if max <= min {
                return Err(ClimateError::InitializationFailure(format!(
                    "temperature scale max {} must exceed min {}",
                    max, min
                )));
            }
        }
        Ok(())
    }

    /// Inclusive (min, max) year of the dataset.
    pub fn year_range(&self) -> (i32, i32) {
        let min = self.years.iter().copied().min().unwrap_or_default();
        let max = self.years.iter().copied().max().unwrap_or_default();
        (min, max)
    }

    /// Temperature scale bounds, falling back to the documented default.
    pub fn temperature_range(&self) -> (f64, f64) {
        self.temperature
            .map(|t| (t.scale_range.min, t.scale_range.max))
            .unwrap_or(DEFAULT_TEMPERATURE_RANGE)
    }

    /// Parsed bivariate colours, or `None` when the document carries none.
    pub fn bivariate_colors(&self) -> ClimateResult<Option<[Color; 9]>> {
        if self.colors.is_empty() {
            return Ok(None);
        }
        if self.colors.len() != 9 {
            return Err(ClimateError::InitializationFailure(format!(
                "expected 9 bivariate colours, found {}",
                self.colors.len()
            )));
        }
        let mut out = [Color::transparent(); 9];
        for (slot, hex) in out.iter_mut().zip(&self.colors) {
            *slot = Color::from_hex(hex)
                .map_err(|e| ClimateError::InitializationFailure(e.to_string()))?;
        }
        Ok(Some(out))
    }
}
