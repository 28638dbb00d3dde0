//! Which variables a display layer draws.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ClimateError, Variable};

/// Display layer: the rain/sun bivariate composite, or temperature alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    #[default]
    RainSun,
    Temperature,
}

impl Layer {
    /// Variables whose grids must be loaded for this layer, in draw order.
    pub fn variables(&self) -> &'static [Variable] {
        match self {
            Layer::RainSun => &[Variable::Rainfall, Variable::Sunshine],
            Layer::Temperature => &[Variable::Temperature],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::RainSun => "rain_sun",
            Layer::Temperature => "temperature",
        }
    }
}

impl FromStr for Layer {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rain_sun" | "rainsun" | "bivariate" => Ok(Layer::RainSun),
            "temp" | "temperature" => Ok(Layer::Temperature),
            other => Err(ClimateError::invalid_parameter(
                "layer",
                format!("unknown layer '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layer_is_bivariate() {
        assert_eq!(Layer::default().variables(), &[Variable::Rainfall, Variable::Sunshine]);
        assert_eq!("temp".parse::<Layer>().unwrap(), Layer::Temperature);
    }
}
