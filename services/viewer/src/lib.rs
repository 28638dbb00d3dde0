//! Interactive climate viewer service.
//!
//! A [`ViewerSession`] owns the navigation state and the loaded data. All
//! input, whether from the keyboard bindings, the HTTP surface or the
//! playback timer, arrives as a [`Command`] and goes through one dispatch
//! table.

pub mod commands;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod navigation;
pub mod playback;
pub mod query;
pub mod server;
pub mod session;
pub mod state;
pub mod ui;

pub use commands::{Command, Dispatcher, Effects, Intent, PlaybackChange};
pub use config::ViewerConfig;
pub use navigation::{DisplayMode, NavigationState, YearRange};
pub use query::StateQuery;
pub use session::{DispatchOutcome, OverlayImage, Presented, ViewerSession};
pub use state::AppState;
pub use ui::UiSnapshot;
