//! What the controls show after every state change.

use climate_common::{period::month_name, Layer, ViewMode};
use renderer::Legend;
use serde::Serialize;

use crate::navigation::{DisplayMode, NavigationState, YearRange};

/// Selectable playback intervals in milliseconds, slowest first.
pub const PLAYBACK_SPEEDS_MS: [u64; 4] = [2000, 1000, 500, 250];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiSnapshot {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub years: YearRange,
    pub view_mode: ViewMode,
    pub layer: Layer,
    pub display: DisplayMode,
    pub controls: ControlStates,
    pub playback: PlaybackControls,
    pub opacity: f32,
    pub zoom: f64,
    pub legend: Option<Legend>,
    /// Last recoverable error shown to the user, cleared by the next good load
    pub status: Option<String>,
    pub query: String,
    /// Bumped on every change that needs the display redrawn
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlStates {
    /// Year slider and year step buttons
    pub year_enabled: bool,
    pub average_active: bool,
    /// Opacity only applies to the geo overlay
    pub opacity_enabled: bool,
    pub zoom_reset_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackControls {
    pub playing: bool,
    pub button_label: &'static str,
    pub speed_ms: u64,
    pub speeds_ms: Vec<u64>,
}

impl UiSnapshot {
    pub fn build(
        state: &NavigationState,
        legend: Option<Legend>,
        status: Option<String>,
        query: String,
        revision: u64,
    ) -> Self {
        let averaged = state.view_mode == ViewMode::Averaged;
        Self {
            label: state.period().label(),
            year: state.year,
            month: state.month,
            month_name: month_name(state.month),
            years: state.years.clone(),
            view_mode: state.view_mode,
            layer: state.layer,
            display: state.display,
            controls: ControlStates {
                year_enabled: !averaged,
                average_active: averaged,
                opacity_enabled: state.display == DisplayMode::Map,
                zoom_reset_enabled: !state.view.is_identity(),
            },
            playback: PlaybackControls {
                playing: state.playing,
                button_label: if state.playing { "Pause" } else { "Play" },
                speed_ms: state.speed_ms,
                speeds_ms: PLAYBACK_SPEEDS_MS.to_vec(),
            },
            opacity: state.opacity,
            zoom: state.view.scale,
            legend,
            status,
            query,
            revision,
        }
    }
}
