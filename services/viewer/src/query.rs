//! Shareable query-string encoding of the navigation state.
//!
//! Only `year`, `month`, `view` and `layer` are encoded. Unknown or
//! unparsable parameters are ignored on restore and out-of-range values are
//! clamped, so any link produces a valid state.

use climate_common::{ClimateError, ClimateResult, Layer, ViewMode};
use serde::{Deserialize, Serialize};

use crate::navigation::NavigationState;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

impl StateQuery {
    pub fn from_state(state: &NavigationState) -> Self {
        Self {
            year: Some(state.year),
            month: Some(state.month),
            view: Some(state.view_mode.as_str().to_string()),
            layer: Some(state.layer.as_str().to_string()),
        }
    }

    /// Parse a query string, with or without the leading `?`.
    ///
    /// Parameters that fail to parse are dropped individually rather than
    /// rejecting the whole link.
    pub fn parse(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

        let mut out = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "year" => out.year = value.trim().parse().ok(),
                "month" => out.month = value.trim().parse().ok(),
                "view" => out.view = Some(value),
                "layer" => out.layer = Some(value),
                _ => {}
            }
        }
        out
    }

    pub fn encode(&self) -> ClimateResult<String> {
        serde_urlencoded::to_string(self)
            .map_err(|e| ClimateError::invalid_parameter("query", e.to_string()))
    }

    /// Apply onto a state. View mode goes first so the year is clamped
    /// against the final mode.
    pub fn restore(&self, state: &mut NavigationState) {
        if let Some(mode) = self.view.as_deref().and_then(|v| v.parse::<ViewMode>().ok()) {
            state.set_view_mode(mode);
        }
        if let Some(layer) = self.layer.as_deref().and_then(|v| v.parse::<Layer>().ok()) {
            state.layer = layer;
        }
        if let Some(year) = self.year {
            state.set_year(year);
        }
        if let Some(month) = self.month {
            state.set_month(month);
        }
    }
}

pub fn encode_state(state: &NavigationState) -> ClimateResult<String> {
    StateQuery::from_state(state).encode()
}
