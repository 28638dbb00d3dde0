//! Time and dataset addressing: months, view modes, variables and the keys
//! used to fetch and cache frames and grids.

use chrono::Month;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ClimateError;

/// Whether the display shows one specific month or the month averaged
/// across all years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    SinglePeriod,
    Averaged,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::SinglePeriod => "single",
            ViewMode::Averaged => "average",
        }
    }
}

impl FromStr for ViewMode {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "single_period" | "monthly" => Ok(ViewMode::SinglePeriod),
            "average" | "averaged" | "avg" => Ok(ViewMode::Averaged),
            other => Err(ClimateError::invalid_parameter(
                "view",
                format!("unknown view mode '{}'", other),
            )),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Climate variables carried by the sparse grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Rainfall,
    Sunshine,
    Temperature,
}

impl Variable {
    /// Directory name used by the pipeline for this variable's grids.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Variable::Rainfall => "rain",
            Variable::Sunshine => "sun",
            Variable::Temperature => "temp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Variable::Rainfall => "Rainfall",
            Variable::Sunshine => "Sunshine",
            Variable::Temperature => "Temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Variable::Rainfall => "mm",
            Variable::Sunshine => "hours",
            Variable::Temperature => "°C",
        }
    }
}

impl FromStr for Variable {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rain" | "rainfall" => Ok(Variable::Rainfall),
            "sun" | "sunshine" => Ok(Variable::Sunshine),
            "temp" | "temperature" | "tasmax" => Ok(Variable::Temperature),
            other => Err(ClimateError::invalid_parameter(
                "variable",
                format!("unknown variable '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A selected month, optionally tied to a year.
///
/// In averaged mode the year is carried along but has no meaning for
/// addressing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
    pub view_mode: ViewMode,
}

impl Period {
    pub fn new(year: i32, month: u32, view_mode: ViewMode) -> Result<Self, ClimateError> {
        validate_month(month)?;
        Ok(Self {
            year,
            month,
            view_mode,
        })
    }

    /// Human label such as "July 2022" or "July (average)".
    pub fn label(&self) -> String {
        match self.view_mode {
            ViewMode::SinglePeriod => format!("{} {}", month_name(self.month), self.year),
            ViewMode::Averaged => format!("{} (average)", month_name(self.month)),
        }
    }

    /// Key of the dense raster frame for this period.
    pub fn frame_key(&self) -> FrameKey {
        match self.view_mode {
            ViewMode::SinglePeriod => FrameKey::Monthly {
                year: self.year,
                month: self.month,
            },
            ViewMode::Averaged => FrameKey::Average { month: self.month },
        }
    }
}

pub fn validate_month(month: u32) -> Result<(), ClimateError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ClimateError::invalid_parameter(
            "month",
            format!("{} is outside 1..=12", month),
        ))
    }
}

/// English month name, "January" for 1.
pub fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("Unknown")
}

/// Address of a dense raster frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKey {
    Monthly { year: i32, month: u32 },
    Average { month: u32 },
}

impl FrameKey {
    pub fn cache_key(&self) -> String {
        match self {
            FrameKey::Monthly { year, month } => format!("frame/{}/{:02}", year, month),
            FrameKey::Average { month } => format!("frame/average/{:02}", month),
        }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Address of one sparse grid: (variable, year, month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridKey {
    pub variable: Variable,
    pub year: i32,
    pub month: u32,
}

impl GridKey {
    pub fn new(variable: Variable, year: i32, month: u32) -> Self {
        Self {
            variable,
            year,
            month,
        }
    }

    pub fn cache_key(&self) -> String {
        format!("grid/{}/{}_{:02}", self.variable.dir_name(), self.year, self.month)
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Address of one variable's per-cell mean for a month across all years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AverageGridKey {
    pub variable: Variable,
    pub month: u32,
}

impl AverageGridKey {
    pub fn new(variable: Variable, month: u32) -> Self {
        Self { variable, month }
    }

    pub fn cache_key(&self) -> String {
        format!("grid/{}/average_{:02}", self.variable.dir_name(), self.month)
    }
}

/// Any cacheable dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKey {
    Frame(FrameKey),
    Grid(GridKey),
    AverageGrid(AverageGridKey),
}

impl DatasetKey {
    pub fn cache_key(&self) -> String {
        match self {
            DatasetKey::Frame(k) => k.cache_key(),
            DatasetKey::Grid(k) => k.cache_key(),
            DatasetKey::AverageGrid(k) => k.cache_key(),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_label_and_frame_key() {
        let p = Period::new(2022, 7, ViewMode::SinglePeriod).unwrap();
        assert_eq!(p.label(), "July 2022");
        assert_eq!(p.frame_key().cache_key(), "frame/2022/07");

        let avg = Period::new(2022, 7, ViewMode::Averaged).unwrap();
        assert_eq!(avg.label(), "July (average)");
        assert_eq!(avg.frame_key(), FrameKey::Average { month: 7 });
    }

    #[test]
    fn test_month_validation() {
        assert!(Period::new(2022, 0, ViewMode::SinglePeriod).is_err());
        assert!(Period::new(2022, 13, ViewMode::SinglePeriod).is_err());
        assert_eq!(month_name(12), "December");
    }

    #[test]
    fn test_grid_key() {
        let key = GridKey::new(Variable::Sunshine, 2022, 7);
        assert_eq!(key.cache_key(), "grid/sun/2022_07");
        assert_eq!(
            DatasetKey::AverageGrid(AverageGridKey::new(Variable::Rainfall, 1)).to_string(),
            "grid/rain/average_01"
        );
        assert_eq!("rain".parse::<Variable>().unwrap(), Variable::Rainfall);
        assert!("snow".parse::<Variable>().is_err());
        assert_eq!("average".parse::<ViewMode>().unwrap(), ViewMode::Averaged);
    }
}
