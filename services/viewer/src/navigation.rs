//! Navigation state and its transition rules.
//!
//! The state is a handful of orthogonal fields. Coupling between them is
//! confined to the methods here: stepping months carries into adjacent
//! years only in single-period mode, playback wraps at the ends of the
//! dataset's year range, and the year is ignored for addressing data while
//! averaged.

use std::fmt;
use std::str::FromStr;

use climate_common::{
    AverageGridKey, ClimateError, ClimateResult, DatasetKey, GridKey, Layer, Period, ViewMode,
};
use renderer::ViewTransform;
use serde::{Deserialize, Serialize};

/// Which display substrate is active: the pre-rendered raster on a plain
/// canvas, or sparse grids coloured over a slippy map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Canvas,
    Map,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Canvas => "canvas",
            DisplayMode::Map => "map",
        }
    }
}

impl FromStr for DisplayMode {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "canvas" | "raster" => Ok(DisplayMode::Canvas),
            "map" | "overlay" => Ok(DisplayMode::Map),
            other => Err(ClimateError::invalid_parameter(
                "display",
                format!("unknown display mode '{}'", other),
            )),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Years the dataset has files for, sorted. The list may have gaps;
/// stepping and clamping only ever land on listed years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
    pub available: Vec<i32>,
}

impl YearRange {
    /// Every year from `min` to `max` inclusive.
    pub fn new(min: i32, max: i32) -> Self {
        let (min, max) = (min.min(max), max.max(min));
        Self {
            min,
            max,
            available: (min..=max).collect(),
        }
    }

    /// The listed years, in any order; `None` when the list is empty.
    pub fn from_years(years: &[i32]) -> Option<Self> {
        let mut available = years.to_vec();
        available.sort_unstable();
        available.dedup();
        Some(Self {
            min: *available.first()?,
            max: *available.last()?,
            available,
        })
    }

    /// Nearest listed year; halfway between two goes to the earlier one.
    pub fn clamp(&self, year: i32) -> i32 {
        match self.available.binary_search(&year) {
            Ok(_) => year,
            Err(i) => {
                let below = i.checked_sub(1).and_then(|j| self.available.get(j));
                let above = self.available.get(i);
                match (below, above) {
                    (Some(&b), Some(&a)) if a - year < year - b => a,
                    (Some(&b), _) => b,
                    (None, Some(&a)) => a,
                    (None, None) => year,
                }
            }
        }
    }

    /// First listed year after `year`.
    pub fn after(&self, year: i32) -> Option<i32> {
        self.available.iter().copied().find(|&y| y > year)
    }

    /// Last listed year before `year`.
    pub fn before(&self, year: i32) -> Option<i32> {
        self.available.iter().rev().copied().find(|&y| y < year)
    }

    /// `delta` listed years away from `year`, stopping at either end.
    pub fn step(&self, year: i32, delta: i32) -> i32 {
        let mut year = self.clamp(year);
        for _ in 0..delta.unsigned_abs() {
            let next = if delta > 0 { self.after(year) } else { self.before(year) };
            match next {
                Some(y) => year = y,
                None => break,
            }
        }
        year
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationState {
    pub year: i32,
    pub month: u32,
    pub view_mode: ViewMode,
    pub playing: bool,
    pub speed_ms: u64,
    /// Canvas zoom and pan
    pub view: ViewTransform,
    /// Geo overlay opacity in `[0, 1]`
    pub opacity: f32,
    pub layer: Layer,
    pub display: DisplayMode,
    pub years: YearRange,
}

impl NavigationState {
    /// Start at January of the latest year.
    pub fn new(years: YearRange) -> Self {
        Self {
            year: years.max,
            month: 1,
            view_mode: ViewMode::SinglePeriod,
            playing: false,
            speed_ms: 1000,
            view: ViewTransform::identity(),
            opacity: 0.7,
            layer: Layer::default(),
            display: DisplayMode::default(),
            years,
        }
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
            view_mode: self.view_mode,
        }
    }

    /// Datasets the active display needs for the current state.
    pub fn dataset_keys(&self) -> Vec<DatasetKey> {
        match self.display {
            DisplayMode::Canvas => vec![DatasetKey::Frame(self.period().frame_key())],
            DisplayMode::Map => self
                .layer
                .variables()
                .iter()
                .map(|&variable| match self.view_mode {
                    ViewMode::SinglePeriod => {
                        DatasetKey::Grid(GridKey::new(variable, self.year, self.month))
                    }
                    ViewMode::Averaged => DatasetKey::AverageGrid(AverageGridKey::new(variable, self.month)),
                })
                .collect(),
        }
    }

    /// Datasets one playback step ahead, for preloading.
    pub fn next_dataset_keys(&self) -> Vec<DatasetKey> {
        let mut next = self.clone();
        next.advance();
        next.dataset_keys()
    }

    /// Slider input: both values are clamped into the valid domain.
    pub fn set_period(&mut self, year: i32, month: u32) {
        self.year = self.years.clamp(year);
        self.month = month.clamp(1, 12);
    }

    pub fn set_year(&mut self, year: i32) {
        self.year = self.years.clamp(year);
    }

    pub fn set_month(&mut self, month: u32) {
        self.month = month.clamp(1, 12);
    }

    /// Keyboard step of `delta` months. In single-period mode the step
    /// carries into adjacent listed years and stops at the ends of the
    /// range; when averaged it wraps within the twelve months.
    pub fn step_month(&mut self, delta: i32) {
        match self.view_mode {
            ViewMode::SinglePeriod => {
                for _ in 0..delta.unsigned_abs() {
                    if !self.step_one_month(delta > 0) {
                        break;
                    }
                }
            }
            ViewMode::Averaged => {
                self.month = ((self.month as i32 - 1 + delta).rem_euclid(12) + 1) as u32;
            }
        }
    }

    /// One month forward or back, carrying into the adjacent listed year.
    /// Returns false at either end of the dataset.
    fn step_one_month(&mut self, forward: bool) -> bool {
        match (forward, self.month) {
            (true, 12) => match self.years.after(self.year) {
                Some(year) => {
                    self.year = year;
                    self.month = 1;
                }
                None => return false,
            },
            (false, 1) => match self.years.before(self.year) {
                Some(year) => {
                    self.year = year;
                    self.month = 12;
                }
                None => return false,
            },
            (true, _) => self.month += 1,
            (false, _) => self.month -= 1,
        }
        true
    }

    /// ±years; a no-op while averaged.
    pub fn step_year(&mut self, delta: i32) {
        if self.view_mode == ViewMode::SinglePeriod {
            self.year = self.years.step(self.year, delta);
        }
    }

    /// One playback step: month 12 wraps to 1; in single-period mode the
    /// year moves to the next listed year and wraps to the first past the
    /// last.
    pub fn advance(&mut self) {
        if self.month < 12 {
            self.month += 1;
            return;
        }
        self.month = 1;
        if self.view_mode == ViewMode::SinglePeriod {
            self.year = self.years.after(self.year).unwrap_or(self.years.min);
        }
    }

    /// Leaving averaged mode puts the year back inside the range, since it
    /// may have been carried along stale.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        if mode == ViewMode::SinglePeriod {
            self.year = self.years.clamp(self.year);
        }
    }

    pub fn toggle_view_mode(&mut self) {
        self.set_view_mode(match self.view_mode {
            ViewMode::SinglePeriod => ViewMode::Averaged,
            ViewMode::Averaged => ViewMode::SinglePeriod,
        });
    }

    pub fn set_speed(&mut self, speed_ms: u64) -> ClimateResult<()> {
        if speed_ms == 0 {
            return Err(ClimateError::invalid_parameter("speed", "playback interval must be positive"));
        }
        self.speed_ms = speed_ms;
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{FrameKey, Variable};

    fn state() -> NavigationState {
        NavigationState::new(YearRange::new(2014, 2023))
    }

    #[test]
    fn test_playback_wraps_to_first_year() {
        let mut s = state();
        s.set_period(2023, 12);
        s.advance();
        assert_eq!((s.year, s.month), (2014, 1));
    }

    #[test]
    fn test_playback_averaged_keeps_year() {
        let mut s = state();
        s.set_period(2023, 12);
        s.set_view_mode(ViewMode::Averaged);
        s.advance();
        assert_eq!((s.year, s.month), (2023, 1));
    }

    #[test]
    fn test_keyboard_step_carries_and_stops_at_range() {
        let mut s = state();
        s.set_period(2016, 12);
        s.step_month(1);
        assert_eq!((s.year, s.month), (2017, 1));
        s.step_month(-1);
        assert_eq!((s.year, s.month), (2016, 12));

        s.set_period(2014, 1);
        s.step_month(-1);
        assert_eq!((s.year, s.month), (2014, 1));
        s.set_period(2023, 12);
        s.step_month(1);
        assert_eq!((s.year, s.month), (2023, 12));
    }

    #[test]
    fn test_gapped_years_are_skipped() {
        let years = YearRange::from_years(&[2016, 2014, 2023]).unwrap();
        assert_eq!((years.min, years.max), (2014, 2023));
        assert_eq!(years.clamp(2019), 2016);
        assert_eq!(years.clamp(2020), 2023);
        assert_eq!(years.clamp(1990), 2014);

        let mut s = NavigationState::new(years);
        s.set_period(2016, 12);
        s.advance();
        assert_eq!((s.year, s.month), (2023, 1));

        s.set_period(2023, 12);
        s.advance();
        assert_eq!((s.year, s.month), (2014, 1));

        s.step_month(-1);
        assert_eq!((s.year, s.month), (2014, 1));
        s.set_period(2023, 1);
        s.step_month(-1);
        assert_eq!((s.year, s.month), (2016, 12));

        s.step_year(-1);
        assert_eq!(s.year, 2014);
        s.step_year(5);
        assert_eq!(s.year, 2023);
        assert!(YearRange::from_years(&[]).is_none());
    }

    #[test]
    fn test_averaged_step_wraps_month_only() {
        let mut s = state();
        s.set_period(2020, 1);
        s.set_view_mode(ViewMode::Averaged);
        s.step_month(-1);
        assert_eq!((s.year, s.month), (2020, 12));
        s.step_year(1);
        assert_eq!(s.year, 2020);
    }

    #[test]
    fn test_slider_clamps() {
        let mut s = state();
        s.set_period(1999, 13);
        assert_eq!((s.year, s.month), (2014, 12));
        s.set_year(2100);
        s.set_month(0);
        assert_eq!((s.year, s.month), (2023, 1));
    }

    #[test]
    fn test_dataset_keys_follow_display_and_mode() {
        let mut s = state();
        s.set_period(2022, 7);
        assert_eq!(
            s.dataset_keys(),
            vec![DatasetKey::Frame(FrameKey::Monthly { year: 2022, month: 7 })]
        );

        s.display = DisplayMode::Map;
        assert_eq!(
            s.dataset_keys(),
            vec![
                DatasetKey::Grid(GridKey::new(Variable::Rainfall, 2022, 7)),
                DatasetKey::Grid(GridKey::new(Variable::Sunshine, 2022, 7)),
            ]
        );

        s.set_view_mode(ViewMode::Averaged);
        s.layer = Layer::Temperature;
        assert_eq!(
            s.dataset_keys(),
            vec![DatasetKey::AverageGrid(AverageGridKey::new(Variable::Temperature, 7))]
        );
        assert_eq!(
            s.next_dataset_keys(),
            vec![DatasetKey::AverageGrid(AverageGridKey::new(Variable::Temperature, 8))]
        );
    }

    #[test]
    fn test_opacity_and_speed_validation() {
        let mut s = state();
        s.set_opacity(1.7);
        assert_eq!(s.opacity, 1.0);
        s.set_opacity(f32::NAN);
        assert_eq!(s.opacity, 1.0);
        assert!(s.set_speed(0).is_err());
        assert!(s.set_speed(250).is_ok());
    }
}
