//! Intent-keyed command dispatch.
//!
//! Input devices (keyboard, buttons, timer, HTTP) only build [`Command`]s.
//! The [`Dispatcher`] looks the command's [`Intent`] up in its table, runs
//! the transition on the navigation state, and reports which follow-up
//! work the change requires.

use std::collections::HashMap;

use climate_common::{ClimateError, ClimateResult, Layer, ViewMode};
use serde::{Deserialize, Serialize};

use crate::navigation::{DisplayMode, NavigationState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    AdvanceMonth,
    RetreatMonth,
    AdvanceYear,
    RetreatYear,
    SetYear { year: i32 },
    SetMonth { month: u32 },
    SetPeriod { year: i32, month: u32 },
    ToggleViewMode,
    SetViewMode { mode: ViewMode },
    TogglePlay,
    /// Timer-driven playback step; ignored unless playing
    Tick,
    SetSpeed { speed_ms: u64 },
    SetOpacity { opacity: f32 },
    SetLayer { layer: Layer },
    SetDisplay { display: DisplayMode },
    ZoomAt { factor: f64, x: f64, y: f64 },
    Pinch { previous: f64, current: f64, x: f64, y: f64 },
    PanBy { dx: f64, dy: f64 },
    ResetView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    AdvanceMonth,
    RetreatMonth,
    AdvanceYear,
    RetreatYear,
    SetYear,
    SetMonth,
    SetPeriod,
    ToggleViewMode,
    SetViewMode,
    TogglePlay,
    Tick,
    SetSpeed,
    SetOpacity,
    SetLayer,
    SetDisplay,
    ZoomAt,
    Pinch,
    PanBy,
    ResetView,
}

impl Command {
    pub fn intent(&self) -> Intent {
        match self {
            Command::AdvanceMonth => Intent::AdvanceMonth,
            Command::RetreatMonth => Intent::RetreatMonth,
            Command::AdvanceYear => Intent::AdvanceYear,
            Command::RetreatYear => Intent::RetreatYear,
            Command::SetYear { .. } => Intent::SetYear,
            Command::SetMonth { .. } => Intent::SetMonth,
            Command::SetPeriod { .. } => Intent::SetPeriod,
            Command::ToggleViewMode => Intent::ToggleViewMode,
            Command::SetViewMode { .. } => Intent::SetViewMode,
            Command::TogglePlay => Intent::TogglePlay,
            Command::Tick => Intent::Tick,
            Command::SetSpeed { .. } => Intent::SetSpeed,
            Command::SetOpacity { .. } => Intent::SetOpacity,
            Command::SetLayer { .. } => Intent::SetLayer,
            Command::SetDisplay { .. } => Intent::SetDisplay,
            Command::ZoomAt { .. } => Intent::ZoomAt,
            Command::Pinch { .. } => Intent::Pinch,
            Command::PanBy { .. } => Intent::PanBy,
            Command::ResetView => Intent::ResetView,
        }
    }

    /// Keyboard bindings.
    pub fn from_key(key: &str) -> Option<Command> {
        Some(match key {
            "ArrowRight" => Command::AdvanceMonth,
            "ArrowLeft" => Command::RetreatMonth,
            "ArrowUp" => Command::AdvanceYear,
            "ArrowDown" => Command::RetreatYear,
            " " | "Space" => Command::TogglePlay,
            "a" | "A" => Command::ToggleViewMode,
            "+" | "=" => Command::ZoomAt {
                factor: 1.25,
                x: 0.0,
                y: 0.0,
            },
            "-" => Command::ZoomAt {
                factor: 0.8,
                x: 0.0,
                y: 0.0,
            },
            "0" | "Escape" => Command::ResetView,
            _ => return None,
        })
    }
}

/// What the playback timer must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackChange {
    #[default]
    None,
    Start,
    Stop,
    /// Speed changed while playing
    Restart,
}

/// Follow-up work a transition requires, performed in field order:
/// load, redraw, UI sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Effects {
    /// The datasets the display needs have changed
    pub reload: bool,
    /// Anything visible changed
    pub redraw: bool,
    pub playback: PlaybackChange,
}

impl Effects {
    pub fn changed(&self) -> bool {
        self.redraw || self.playback != PlaybackChange::None
    }
}

type Transition = fn(&mut NavigationState, &Command) -> ClimateResult<()>;

pub struct Dispatcher {
    table: HashMap<Intent, Transition>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut d = Self { table: HashMap::new() };
        d.register(Intent::AdvanceMonth, |s, _| {
            s.step_month(1);
            Ok(())
        });
        d.register(Intent::RetreatMonth, |s, _| {
            s.step_month(-1);
            Ok(())
        });
        d.register(Intent::AdvanceYear, |s, _| {
            s.step_year(1);
            Ok(())
        });
        d.register(Intent::RetreatYear, |s, _| {
            s.step_year(-1);
            Ok(())
        });
        d.register(Intent::SetYear, |s, c| match c {
            Command::SetYear { year } => {
                s.set_year(*year);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::SetMonth, |s, c| match c {
            Command::SetMonth { month } => {
                s.set_month(*month);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::SetPeriod, |s, c| match c {
            Command::SetPeriod { year, month } => {
                s.set_period(*year, *month);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::ToggleViewMode, |s, _| {
            s.toggle_view_mode();
            Ok(())
        });
        d.register(Intent::SetViewMode, |s, c| match c {
            Command::SetViewMode { mode } => {
                s.set_view_mode(*mode);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::TogglePlay, |s, _| {
            s.playing = !s.playing;
            Ok(())
        });
        d.register(Intent::Tick, |s, _| {
            if s.playing {
                s.advance();
            }
            Ok(())
        });
        d.register(Intent::SetSpeed, |s, c| match c {
            Command::SetSpeed { speed_ms } => s.set_speed(*speed_ms),
            _ => Err(mismatch(c)),
        });
        d.register(Intent::SetOpacity, |s, c| match c {
            Command::SetOpacity { opacity } => {
                s.set_opacity(*opacity);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::SetLayer, |s, c| match c {
            Command::SetLayer { layer } => {
                s.layer = *layer;
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::SetDisplay, |s, c| match c {
            Command::SetDisplay { display } => {
                s.display = *display;
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::ZoomAt, |s, c| match c {
            Command::ZoomAt { factor, x, y } => {
                s.view.zoom_at(*factor, *x, *y);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::Pinch, |s, c| match c {
            Command::Pinch {
                previous,
                current,
                x,
                y,
            } => {
                s.view.pinch(*previous, *current, *x, *y);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::PanBy, |s, c| match c {
            Command::PanBy { dx, dy } => {
                s.view.pan_by(*dx, *dy);
                Ok(())
            }
            _ => Err(mismatch(c)),
        });
        d.register(Intent::ResetView, |s, _| {
            s.view.reset();
            Ok(())
        });
        d
    }
}

fn mismatch(command: &Command) -> ClimateError {
    ClimateError::invalid_parameter("intent", format!("{:?} routed to the wrong handler", command))
}

impl Dispatcher {
    pub fn register(&mut self, intent: Intent, transition: Transition) {
        self.table.insert(intent, transition);
    }

    /// Apply a command. On error the state is left untouched.
    pub fn apply(&self, state: &mut NavigationState, command: &Command) -> ClimateResult<Effects> {
        let transition = self.table.get(&command.intent()).ok_or_else(|| {
            ClimateError::invalid_parameter("intent", format!("no handler for {:?}", command.intent()))
        })?;

        let mut next = state.clone();
        transition(&mut next, command)?;

        let playback = match (state.playing, next.playing) {
            (false, true) => PlaybackChange::Start,
            (true, false) => PlaybackChange::Stop,
            (true, true) if state.speed_ms != next.speed_ms => PlaybackChange::Restart,
            _ => PlaybackChange::None,
        };
        let effects = Effects {
            reload: state.dataset_keys() != next.dataset_keys(),
            redraw: *state != next,
            playback,
        };
        *state = next;
        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::YearRange;

    fn state() -> NavigationState {
        let mut s = NavigationState::new(YearRange::new(2014, 2023));
        s.set_period(2022, 7);
        s
    }

    #[test]
    fn test_month_step_reloads() {
        let d = Dispatcher::default();
        let mut s = state();
        let fx = d.apply(&mut s, &Command::AdvanceMonth).unwrap();
        assert_eq!(s.month, 8);
        assert!(fx.reload && fx.redraw);
    }

    #[test]
    fn test_view_changes_redraw_without_reload() {
        let d = Dispatcher::default();
        let mut s = state();
        let fx = d
            .apply(&mut s, &Command::ZoomAt { factor: 2.0, x: 10.0, y: 10.0 })
            .unwrap();
        assert!(!fx.reload && fx.redraw);

        let fx = d.apply(&mut s, &Command::SetOpacity { opacity: 0.3 }).unwrap();
        assert!(!fx.reload && fx.redraw);
    }

    #[test]
    fn test_no_op_has_no_effects() {
        let d = Dispatcher::default();
        let mut s = state();
        let fx = d.apply(&mut s, &Command::Tick).unwrap();
        assert_eq!(fx, Effects::default());
        assert!(!fx.changed());
    }

    #[test]
    fn test_play_toggle_and_speed_restart() {
        let d = Dispatcher::default();
        let mut s = state();
        assert_eq!(d.apply(&mut s, &Command::TogglePlay).unwrap().playback, PlaybackChange::Start);
        assert_eq!(
            d.apply(&mut s, &Command::SetSpeed { speed_ms: 250 }).unwrap().playback,
            PlaybackChange::Restart
        );
        let fx = d.apply(&mut s, &Command::Tick).unwrap();
        assert_eq!(s.month, 8);
        assert!(fx.reload);
        assert_eq!(d.apply(&mut s, &Command::TogglePlay).unwrap().playback, PlaybackChange::Stop);
    }

    #[test]
    fn test_failed_transition_leaves_state() {
        let d = Dispatcher::default();
        let mut s = state();
        let before = s.clone();
        assert!(d.apply(&mut s, &Command::SetSpeed { speed_ms: 0 }).is_err());
        assert_eq!(s, before);
    }

    #[test]
    fn test_json_shape() {
        let cmd: Command = serde_json::from_str(r#"{"intent": "SET_PERIOD", "year": 2022, "month": 7}"#).unwrap();
        assert_eq!(cmd, Command::SetPeriod { year: 2022, month: 7 });
        assert_eq!(cmd.intent(), Intent::SetPeriod);
        assert_eq!(Command::from_key("ArrowRight"), Some(Command::AdvanceMonth));
        assert_eq!(Command::from_key("q"), None);
    }
}
