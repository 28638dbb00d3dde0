//! Colour schemes: the 3×3 bivariate matrix and the univariate gradient.

use climate_common::{Color, DatasetMetadata};
use serde::Serialize;

use crate::classify::TertileClass;

/// Rows are rain class (low → high), columns are sun class (low → high).
pub const DEFAULT_BIVARIATE: [Color; 9] = [
    Color::rgb(0xf3, 0xf3, 0xf3),
    Color::rgb(0xf3, 0xe6, 0xb3),
    Color::rgb(0xf3, 0xb3, 0x00),
    Color::rgb(0xb4, 0xd3, 0xe1),
    Color::rgb(0xb3, 0xb3, 0xb3),
    Color::rgb(0xb3, 0x66, 0x00),
    Color::rgb(0x50, 0x9d, 0xc2),
    Color::rgb(0x37, 0x63, 0x87),
    Color::rgb(0x00, 0x00, 0x00),
];

/// Diverging cold → hot ramp for temperature.
pub const DEFAULT_TEMPERATURE: [Color; 10] = [
    Color::rgb(0x05, 0x30, 0x61),
    Color::rgb(0x21, 0x66, 0xac),
    Color::rgb(0x43, 0x93, 0xc3),
    Color::rgb(0x92, 0xc5, 0xde),
    Color::rgb(0xd1, 0xe5, 0xf0),
    Color::rgb(0xfd, 0xdb, 0xc7),
    Color::rgb(0xf4, 0xa5, 0x82),
    Color::rgb(0xd6, 0x60, 0x4d),
    Color::rgb(0xb2, 0x18, 0x2b),
    Color::rgb(0x67, 0x00, 0x1f),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BivariateScheme {
    colors: [Color; 9],
}

impl Default for BivariateScheme {
    fn default() -> Self {
        Self {
            colors: DEFAULT_BIVARIATE,
        }
    }
}

impl BivariateScheme {
    pub fn new(colors: [Color; 9]) -> Self {
        Self { colors }
    }

    /// The dataset's own colours when it declares them, otherwise the default.
    pub fn from_metadata(metadata: &DatasetMetadata) -> Self {
        match metadata.bivariate_colors() {
            Ok(Some(colors)) => Self::new(colors),
            _ => Self::default(),
        }
    }

    /// Cell of the matrix, `rain * 3 + sun`.
    pub fn slot(rain: TertileClass, sun: TertileClass) -> usize {
        rain.index() * 3 + sun.index()
    }

    pub fn color(&self, rain: TertileClass, sun: TertileClass) -> Color {
        self.colors[Self::slot(rain, sun)]
    }

    pub fn colors(&self) -> &[Color; 9] {
        &self.colors
    }
}

/// Ordered list of N colours indexed directly by bin; no interpolation
/// between entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientScheme {
    colors: Vec<Color>,
}

impl Default for GradientScheme {
    fn default() -> Self {
        Self {
            colors: DEFAULT_TEMPERATURE.to_vec(),
        }
    }
}

impl GradientScheme {
    pub fn new(colors: Vec<Color>) -> Self {
        assert!(!colors.is_empty(), "gradient needs at least one colour");
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Panics on an out-of-range bin: bins come from a `FixedScale` sized
    /// to this gradient.
    pub fn color(&self, bin: usize, n_bins: usize) -> Color {
        assert_eq!(n_bins, self.colors.len(), "bin count does not match gradient");
        assert!(bin < n_bins, "bin {} out of range 0..{}", bin, n_bins);
        self.colors[bin]
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TertileClass::*;

    #[test]
    fn test_bivariate_table_is_fixed() {
        let scheme = BivariateScheme::default();
        assert_eq!(scheme.color(Low, Low).to_hex(), "#f3f3f3");
        assert_eq!(scheme.color(High, High).to_hex(), "#000000");
        assert_eq!(scheme.color(Low, High).to_hex(), "#f3b300");
        assert_eq!(scheme.color(High, Low).to_hex(), "#509dc2");
        // same answer regardless of prior calls
        assert_eq!(scheme.color(Low, Low), scheme.color(Low, Low));
    }

    #[test]
    fn test_gradient_direct_index() {
        let g = GradientScheme::default();
        assert_eq!(g.color(0, 10).to_hex(), "#053061");
        assert_eq!(g.color(9, 10).to_hex(), "#67001f");
    }

    #[test]
    #[should_panic]
    fn test_gradient_rejects_bad_bin() {
        GradientScheme::default().color(10, 10);
    }
}
