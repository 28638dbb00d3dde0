//! Value classification: per-frame tertiles and fixed-range binning.

use serde::Serialize;

/// Tertile boundaries of one frame, or the "no data" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Thresholds {
    Tertiles { low: f64, high: f64 },
    NoData,
}

/// Class of a value relative to a frame's tertiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TertileClass {
    Low,
    Med,
    High,
}

impl TertileClass {
    pub const ALL: [TertileClass; 3] = [TertileClass::Low, TertileClass::Med, TertileClass::High];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Linear-interpolated percentile `num/den` over already sorted values.
///
/// The rank is computed as `(n - 1) * num / den` so that exact ranks stay
/// exact in floating point.
fn percentile_sorted(sorted: &[f64], num: u32, den: u32) -> f64 {
    let rank = (sorted.len() - 1) as f64 * num as f64 / den as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// 1/3 and 2/3 quantiles of the finite values. Non-finite values are
/// excluded before ranking; an empty input gives [`Thresholds::NoData`].
pub fn compute_tertiles<I>(values: I) -> Thresholds
where
    I: IntoIterator,
    I::Item: Into<f64>,
{
    let mut sorted: Vec<f64> = values
        .into_iter()
        .map(Into::into)
        .filter(|v: &f64| v.is_finite())
        .collect();
    if sorted.is_empty() {
        return Thresholds::NoData;
    }
    sorted.sort_by(f64::total_cmp);

    Thresholds::Tertiles {
        low: percentile_sorted(&sorted, 1, 3),
        high: percentile_sorted(&sorted, 2, 3),
    }
}

impl Thresholds {
    /// Boundary ties fall to the lower class. `None` means "no data".
    pub fn classify(&self, value: f64) -> Option<TertileClass> {
        match *self {
            Thresholds::NoData => None,
            _ if !value.is_finite() => None,
            Thresholds::Tertiles { low, .. } if value <= low => Some(TertileClass::Low),
            Thresholds::Tertiles { high, .. } if value <= high => Some(TertileClass::Med),
            Thresholds::Tertiles { .. } => Some(TertileClass::High),
        }
    }
}

/// Fixed absolute scale split into equal bins, used for temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedScale {
    pub min: f64,
    pub max: f64,
    pub bins: usize,
}

impl FixedScale {
    pub fn new(min: f64, max: f64, bins: usize) -> Self {
        assert!(max > min, "scale max must exceed min");
        assert!(bins > 0, "scale needs at least one bin");
        Self { min, max, bins }
    }

    /// Clamp into range, then bin. Out-of-range values land in the first or
    /// last bin; non-finite values have no bin.
    pub fn bin(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let t = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        Some(((t * self.bins as f64) as usize).min(self.bins - 1))
    }

    /// Lower edge of each bin, for legends.
    pub fn bin_edges(&self) -> Vec<f64> {
        let step = (self.max - self.min) / self.bins as f64;
        (0..self.bins).map(|i| self.min + step * i as f64).collect()
    }
}
