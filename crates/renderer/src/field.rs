//! Per-cell palette indices for one frame, plus its legend.
//!
//! Both overlay strategies draw from a [`ColorField`]: classification and
//! colour mapping happen once per frame, and the renderers only look up a
//! palette index per cell. Index 0 is reserved for "no data" and is always
//! transparent.

use std::collections::HashMap;

use climate_common::{CellKey, Color, SparseGrid, Variable};
use serde::Serialize;

use crate::classify::{compute_tertiles, FixedScale, TertileClass, Thresholds};
use crate::colormap::{BivariateScheme, GradientScheme};

pub const TRANSPARENT_INDEX: u8 = 0;

/// Colour table addressed by the indices of a [`ColorField`].
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    fn from_scheme(colors: &[Color]) -> Self {
        let mut all = Vec::with_capacity(colors.len() + 1);
        all.push(Color::transparent());
        all.extend_from_slice(colors);
        Self { colors: all }
    }

    pub fn color(&self, index: u8) -> Color {
        self.colors
            .get(index as usize)
            .copied()
            .unwrap_or_else(Color::transparent)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// RGBA entries with `opacity` applied to every alpha; index 0 stays
    /// fully transparent.
    pub fn to_rgba(&self, opacity: f32) -> Vec<(u8, u8, u8, u8)> {
        self.colors
            .iter()
            .map(|c| {
                let c = c.with_opacity(opacity);
                (c.r, c.g, c.b, c.a)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendSwatch {
    pub label: String,
    pub color: String,
}

/// What the UI needs to draw a legend for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    pub swatches: Vec<LegendSwatch>,
    pub thresholds: Vec<VariableThresholds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariableThresholds {
    pub variable: Variable,
    pub thresholds: Thresholds,
}

fn class_label(class: TertileClass) -> &'static str {
    match class {
        TertileClass::Low => "low",
        TertileClass::Med => "medium",
        TertileClass::High => "high",
    }
}

#[derive(Debug, Clone)]
pub struct ColorField {
    cells: HashMap<CellKey, u8>,
    palette: Palette,
    legend: Legend,
}

impl ColorField {
    /// Classify rain and sun against their own per-frame tertiles and map
    /// each class pair through the 3×3 matrix. Cells missing from either
    /// grid are left without colour.
    pub fn bivariate(rain: &SparseGrid, sun: &SparseGrid, scheme: &BivariateScheme) -> Self {
        let rain_t = compute_tertiles(rain.values());
        let sun_t = compute_tertiles(sun.values());

        let cells = rain
            .paired(sun)
            .filter_map(|(key, r, s)| {
                let rc = rain_t.classify(r as f64)?;
                let sc = sun_t.classify(s as f64)?;
                Some((key, BivariateScheme::slot(rc, sc) as u8 + 1))
            })
            .collect();

        let mut swatches = Vec::with_capacity(9);
        for rain_class in TertileClass::ALL {
            for sun_class in TertileClass::ALL {
                swatches.push(LegendSwatch {
                    label: format!(
                        "{} rain / {} sun",
                        class_label(rain_class),
                        class_label(sun_class)
                    ),
                    color: scheme.color(rain_class, sun_class).to_hex(),
                });
            }
        }

        Self {
            cells,
            palette: Palette::from_scheme(scheme.colors()),
            legend: Legend {
                title: "Rainfall × Sunshine".to_string(),
                swatches,
                thresholds: vec![
                    VariableThresholds {
                        variable: Variable::Rainfall,
                        thresholds: rain_t,
                    },
                    VariableThresholds {
                        variable: Variable::Sunshine,
                        thresholds: sun_t,
                    },
                ],
            },
        }
    }

    /// Bin every cell on a fixed absolute scale.
    pub fn univariate(
        variable: Variable,
        grid: &SparseGrid,
        scale: &FixedScale,
        gradient: &GradientScheme,
    ) -> Self {
        assert_eq!(scale.bins, gradient.len(), "scale bins must match gradient length");
        let cells = grid
            .iter()
            .filter_map(|(key, v)| Some((key, scale.bin(v as f64)? as u8 + 1)))
            .collect();

        let step = (scale.max - scale.min) / scale.bins as f64;
        let swatches = scale
            .bin_edges()
            .into_iter()
            .enumerate()
            .map(|(i, lo)| LegendSwatch {
                label: format!("{:.1} – {:.1} {}", lo, lo + step, variable.unit()),
                color: gradient.color(i, scale.bins).to_hex(),
            })
            .collect();

        Self {
            cells,
            palette: Palette::from_scheme(gradient.colors()),
            legend: Legend {
                title: format!("{} ({})", variable.label(), variable.unit()),
                swatches,
                thresholds: Vec::new(),
            },
        }
    }

    pub fn index_at(&self, key: CellKey) -> Option<u8> {
        self.cells.get(&key).copied()
    }

    pub fn color_at(&self, key: CellKey) -> Option<Color> {
        self.index_at(key).map(|i| self.palette.color(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellKey, u8)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }
}
