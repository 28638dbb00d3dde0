//! One viewing session: navigation state, loaded data, locations and the
//! renderers that draw them.
//!
//! Every command goes through [`ViewerSession::dispatch`], which applies the
//! transition, loads what the new state needs, bumps the redraw revision and
//! rebuilds the UI snapshot, in that order. Loads run outside the state lock
//! so input stays responsive; a load that finishes after the state has moved
//! on is cached but never shown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use climate_common::{
    ClimateError, ClimateResult, DatasetKey, DatasetMetadata, GridExtent, Layer, LocationSet, NamedLocation,
    RasterFrame, SparseGrid, Variable,
};
use projection::GeoBounds;
use renderer::overlay::build_renderer;
use renderer::{
    BivariateScheme, ColorField, FixedScale, GeoOverlayRenderer, GradientScheme, MapViewport, OverlayStrategy,
    RasterCompositor,
};
use serde::Serialize;
use storage::{open_source, CachedDataset, CustomLocationStore, DataSource, DatasetLoader};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::commands::{Command, Dispatcher, Effects, PlaybackChange};
use crate::config::ViewerConfig;
use crate::metrics;
use crate::navigation::{DisplayMode, NavigationState, YearRange};
use crate::playback::PlaybackTimer;
use crate::query::{encode_state, StateQuery};
use crate::ui::UiSnapshot;

/// Data currently on display.
#[derive(Debug, Clone)]
pub enum Presented {
    /// Pre-rendered raster for the canvas display
    Frame(Arc<RasterFrame>),
    /// Classified grid cells for the map display
    Field(Arc<ColorField>),
}

#[derive(Debug, Clone)]
struct Presentation {
    keys: Vec<DatasetKey>,
    content: Presented,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub effects: Effects,
    pub ui: UiSnapshot,
}

/// Encoded overlay plus where it belongs on the map.
#[derive(Debug, Clone)]
pub struct OverlayImage {
    pub png: Vec<u8>,
    pub bounds: GeoBounds,
    pub strategy: OverlayStrategy,
    pub drawn_cells: usize,
}

pub struct ViewerSession {
    loader: Arc<DatasetLoader>,
    dispatcher: Dispatcher,
    nav: Mutex<NavigationState>,
    presented: RwLock<Option<Presentation>>,
    status: RwLock<Option<String>>,
    ui: RwLock<UiSnapshot>,
    revision: AtomicU64,
    locations: RwLock<LocationSet>,
    store: CustomLocationStore,
    compositor: RasterCompositor,
    overlay: Box<dyn GeoOverlayRenderer>,
    bivariate: BivariateScheme,
    temperature: (FixedScale, GradientScheme),
    playback: Mutex<Option<PlaybackTimer>>,
    ticks: UnboundedSender<()>,
    preload: bool,
}

impl ViewerSession {
    /// Open the configured data root and start a session.
    pub async fn start(config: &ViewerConfig, query: Option<&str>) -> ClimateResult<Arc<Self>> {
        let source = open_source(&config.data_root)
            .map_err(|e| ClimateError::InitializationFailure(format!("data root: {}", e)))?;
        Self::with_source(source, config, query).await
    }

    /// Start a session over an explicit source.
    ///
    /// Metadata and built-in locations are required; the custom-location
    /// store and the label font are optional. `query` is restored before the
    /// first load.
    #[instrument(skip_all, fields(root = %source.describe()))]
    pub async fn with_source(
        source: Arc<dyn DataSource>,
        config: &ViewerConfig,
        query: Option<&str>,
    ) -> ClimateResult<Arc<Self>> {
        let loader = DatasetLoader::open(source, config.loader_config()).await?;
        let builtin = loader.load_locations().await?;

        let store = CustomLocationStore::new(&config.locations_file);
        let custom = store.load().await;

        let metadata = loader.metadata();
        let extent = metadata.extent.clone();
        let years = YearRange::from_years(&metadata.years)
            .ok_or_else(|| ClimateError::InitializationFailure("metadata lists no years".into()))?;

        let mut nav = NavigationState::new(years);
        nav.set_speed(config.playback.speed_ms)?;
        nav.set_opacity(config.overlay.opacity);
        nav.display = config.display;
        if let Some(query) = query {
            StateQuery::parse(query).restore(&mut nav);
        }

        let compositor = build_compositor(&extent, config.canvas.width, config.canvas.font.as_deref()).await;
        let overlay = build_renderer(config.overlay.strategy, &extent, config.bitmap_size())?;
        let bivariate = BivariateScheme::from_metadata(metadata);
        let temperature = temperature_scale(metadata);

        let (ticks, tick_rx) = unbounded_channel();
        let ui = UiSnapshot::build(&nav, None, None, encode_state(&nav)?, 0);

        let (first, last) = metadata.year_range();
        info!(
            first_year = first,
            last_year = last,
            display = %nav.display,
            strategy = %overlay.strategy(),
            locations = builtin.len() + custom.len(),
            "Viewer session started"
        );

        let session = Arc::new(Self {
            loader: Arc::new(loader),
            dispatcher: Dispatcher::default(),
            nav: Mutex::new(nav.clone()),
            presented: RwLock::new(None),
            status: RwLock::new(None),
            ui: RwLock::new(ui),
            revision: AtomicU64::new(0),
            locations: RwLock::new(LocationSet::new(builtin, custom)),
            store,
            compositor,
            overlay,
            bivariate,
            temperature,
            playback: Mutex::new(None),
            ticks,
            preload: config.playback.preload,
        });

        tokio::spawn(run_ticks(Arc::downgrade(&session), tick_rx));

        session.refresh(&nav).await;
        session.revision.fetch_add(1, Ordering::Relaxed);
        session.sync_ui().await;
        Ok(session)
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        self.loader.metadata()
    }

    pub fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    pub fn extent(&self) -> &GridExtent {
        &self.loader.metadata().extent
    }

    pub async fn state(&self) -> NavigationState {
        self.nav.lock().await.clone()
    }

    pub async fn ui(&self) -> UiSnapshot {
        self.ui.read().await.clone()
    }

    pub async fn presented(&self) -> Option<Presented> {
        self.presented.read().await.as_ref().map(|p| p.content.clone())
    }

    /// Keys of the data on display, which may lag the state after a failed
    /// load.
    pub async fn presented_keys(&self) -> Option<Vec<DatasetKey>> {
        self.presented.read().await.as_ref().map(|p| p.keys.clone())
    }

    /// Apply a command, then load, redraw and sync the UI as required.
    ///
    /// Only a rejected transition is an error here; load failures are
    /// reported through the snapshot's status and keep the previous frame.
    #[instrument(skip(self), fields(intent = ?command.intent()))]
    pub async fn dispatch(&self, command: Command) -> ClimateResult<DispatchOutcome> {
        let (effects, state) = {
            let mut nav = self.nav.lock().await;
            match self.dispatcher.apply(&mut nav, &command) {
                Ok(effects) => (effects, nav.clone()),
                Err(e) => {
                    metrics::record_command_error(command.intent());
                    return Err(e);
                }
            }
        };
        metrics::record_command(command.intent());

        self.update_playback(effects.playback, state.speed_ms).await;
        if effects.reload {
            self.refresh(&state).await;
        }
        if effects.redraw {
            self.revision.fetch_add(1, Ordering::Relaxed);
        }
        let ui = self.sync_ui().await;
        Ok(DispatchOutcome { effects, ui })
    }

    async fn update_playback(&self, change: PlaybackChange, speed_ms: u64) {
        let mut timer = self.playback.lock().await;
        match change {
            PlaybackChange::None => {}
            PlaybackChange::Stop => {
                if let Some(t) = timer.take() {
                    t.stop();
                }
            }
            PlaybackChange::Start | PlaybackChange::Restart => {
                if let Some(t) = timer.take() {
                    t.stop();
                }
                *timer = Some(PlaybackTimer::start(
                    Duration::from_millis(speed_ms),
                    self.ticks.clone(),
                ));
            }
        }
    }

    /// Load and present the datasets `state` needs.
    async fn refresh(&self, state: &NavigationState) {
        let keys = state.dataset_keys();
        let result = match self.loader.load_all(&keys).await {
            Ok(data) => self.compose(state, data),
            Err(e) => Err(e),
        };

        // held while presenting so the state cannot move between check and write
        let nav = self.nav.lock().await;
        if nav.dataset_keys() != keys {
            metrics::record_stale_response();
            debug!(keys = ?keys, "Discarding stale response");
            return;
        }

        match result {
            Ok(content) => {
                *self.presented.write().await = Some(Presentation {
                    keys: keys.clone(),
                    content,
                });
                *self.status.write().await = None;
                drop(nav);

                if self.preload {
                    let loader = Arc::clone(&self.loader);
                    let next = state.next_dataset_keys();
                    tokio::spawn(async move { loader.prefetch(&next).await });
                }
            }
            Err(e) => {
                metrics::record_load_failure();
                warn!(keys = ?keys, operation = "refresh", error = %e, "Keeping previous frame");
                *self.status.write().await = Some(format!("Could not load {}: {}", state.period().label(), e));
            }
        }
    }

    fn compose(&self, state: &NavigationState, data: Vec<CachedDataset>) -> ClimateResult<Presented> {
        match state.display {
            DisplayMode::Canvas => match data.into_iter().next() {
                Some(CachedDataset::Frame(frame)) => Ok(Presented::Frame(frame)),
                _ => Err(ClimateError::RenderError("canvas display expects one frame".to_string())),
            },
            DisplayMode::Map => {
                let grids = data
                    .into_iter()
                    .map(|d| match d {
                        CachedDataset::Grid(grid) => Ok(grid),
                        CachedDataset::Frame(_) => {
                            Err(ClimateError::RenderError("map display expects grids".to_string()))
                        }
                    })
                    .collect::<ClimateResult<Vec<Arc<SparseGrid>>>>()?;

                let field = match (state.layer, grids.as_slice()) {
                    (Layer::RainSun, [rain, sun]) => ColorField::bivariate(rain, sun, &self.bivariate),
                    (Layer::Temperature, [temp]) => {
                        let (scale, gradient) = &self.temperature;
                        ColorField::univariate(Variable::Temperature, temp, scale, gradient)
                    }
                    (layer, grids) => {
                        return Err(ClimateError::RenderError(format!(
                            "layer {} got {} grids",
                            layer,
                            grids.len()
                        )))
                    }
                };
                debug!(cells = field.len(), layer = %state.layer, "Classified grid cells");
                Ok(Presented::Field(Arc::new(field)))
            }
        }
    }

    async fn sync_ui(&self) -> UiSnapshot {
        let state = self.nav.lock().await.clone();
        let legend = match self.presented.read().await.as_ref().map(|p| &p.content) {
            Some(Presented::Field(field)) => Some(field.legend().clone()),
            _ => None,
        };
        let status = self.status.read().await.clone();
        let query = encode_state(&state).unwrap_or_else(|e| {
            warn!(error = %e, "Could not encode state");
            String::new()
        });

        let ui = UiSnapshot::build(
            &state,
            legend,
            status,
            query,
            self.revision.load(Ordering::Relaxed),
        );
        *self.ui.write().await = ui.clone();
        ui
    }

    /// Draw the canvas display: the presented frame under the zoom/pan
    /// transform plus the visible location markers.
    pub async fn render_canvas(&self) -> ClimateResult<RasterFrame> {
        let view = self.nav.lock().await.view;
        let frame = match self.presented.read().await.as_ref().map(|p| &p.content) {
            Some(Presented::Frame(frame)) => Some(Arc::clone(frame)),
            _ => None,
        };
        let locations: Vec<NamedLocation> = self.locations.read().await.visible().cloned().collect();

        let start = Instant::now();
        let out = self.compositor.render(frame.as_deref(), &view, &locations)?;
        metrics::record_render("canvas", start.elapsed());
        Ok(out)
    }

    pub async fn render_canvas_png(&self) -> ClimateResult<Vec<u8>> {
        renderer::png::encode_frame(&self.render_canvas().await?)
    }

    /// Render the presented grid cells for the map display.
    ///
    /// The per-cell quad strategy needs `viewport`; the bitmap strategy
    /// ignores it.
    pub async fn render_overlay(self: &Arc<Self>, viewport: Option<MapViewport>) -> ClimateResult<OverlayImage> {
        let opacity = self.nav.lock().await.opacity;
        let field = match self.presented.read().await.as_ref().map(|p| &p.content) {
            Some(Presented::Field(field)) => Arc::clone(field),
            _ => {
                return Err(ClimateError::data_unavailable(
                    "overlay",
                    "no grid data on display; switch to the map display",
                ))
            }
        };

        let session = Arc::clone(self);
        tokio::task::spawn_blocking(move || -> ClimateResult<OverlayImage> {
            let start = Instant::now();
            let output = session.overlay.render(&field, viewport.as_ref())?;
            let png = output.to_png(opacity, viewport.as_ref())?;
            metrics::record_render("overlay", start.elapsed());
            Ok(OverlayImage {
                png,
                bounds: session.overlay.bounds(),
                strategy: session.overlay.strategy(),
                drawn_cells: output.drawn_cells(),
            })
        })
        .await
        .map_err(|e| ClimateError::RenderError(format!("overlay task: {}", e)))?
    }

    pub fn overlay_strategy(&self) -> OverlayStrategy {
        self.overlay.strategy()
    }

    pub fn overlay_bounds(&self) -> GeoBounds {
        self.overlay.bounds()
    }

    /// Locations matching `query` on name or category, all when empty.
    pub async fn locations(&self, query: &str) -> Vec<NamedLocation> {
        self.locations.read().await.search(query).into_iter().cloned().collect()
    }

    pub async fn add_location(
        &self,
        name: &str,
        x: f64,
        y: f64,
        category: &str,
    ) -> ClimateResult<NamedLocation> {
        let added = {
            let mut set = self.locations.write().await;
            set.add_custom(NamedLocation::custom(name, x, y, category))?.clone()
        };
        info!(id = %added.id, name = %added.name, x, y, "Added custom location");
        self.persist_custom().await;
        Ok(added)
    }

    /// Add a custom location where the canvas was clicked.
    pub async fn add_location_at_click(
        &self,
        name: &str,
        screen_x: f64,
        screen_y: f64,
        category: &str,
    ) -> ClimateResult<NamedLocation> {
        let view = self.nav.lock().await.view;
        let (x, y) = self.compositor.click_to_native(&view, screen_x, screen_y);
        if !self.extent().contains(x, y) {
            return Err(ClimateError::invalid_parameter(
                "x,y",
                format!("click at ({}, {}) is outside the grid", screen_x, screen_y),
            ));
        }
        self.add_location(name, x, y, category).await
    }

    pub async fn remove_location(&self, id: &str) -> ClimateResult<NamedLocation> {
        let removed = self.locations.write().await.remove_custom(id)?;
        info!(id = %removed.id, name = %removed.name, "Removed custom location");
        self.persist_custom().await;
        Ok(removed)
    }

    /// Set or, with `None`, toggle a location's visibility.
    pub async fn set_location_visible(&self, id: &str, visible: Option<bool>) -> ClimateResult<bool> {
        let (now, is_custom) = {
            let mut set = self.locations.write().await;
            let now = match visible {
                Some(v) => set.set_visible(id, v),
                None => set.toggle_visible(id),
            }
            .ok_or_else(|| ClimateError::data_unavailable(format!("location/{}", id), "no such location"))?;
            (now, set.get(id).is_some_and(|loc| loc.is_custom))
        };
        if is_custom {
            self.persist_custom().await;
        }
        self.revision.fetch_add(1, Ordering::Relaxed);
        self.sync_ui().await;
        Ok(now)
    }

    /// Save custom locations. A failed save keeps them in memory and is
    /// reported through the status line.
    async fn persist_custom(&self) {
        let custom = self.locations.read().await.custom().to_vec();
        let status = match self.store.save(&custom).await {
            Ok(()) => None,
            Err(e) => {
                warn!(path = ?self.store.path(), error = %e, "Custom locations not saved");
                Some(format!("Custom locations could not be saved: {}", e))
            }
        };
        if status.is_some() {
            *self.status.write().await = status;
        }
        self.revision.fetch_add(1, Ordering::Relaxed);
        self.sync_ui().await;
    }

    /// Stop playback; used on shutdown.
    pub async fn stop_playback(&self) {
        if let Some(timer) = self.playback.lock().await.take() {
            timer.stop();
        }
    }
}

/// Turn timer signals into tick commands for as long as the session lives.
async fn run_ticks(session: Weak<ViewerSession>, mut ticks: UnboundedReceiver<()>) {
    while ticks.recv().await.is_some() {
        let Some(session) = session.upgrade() else {
            break;
        };
        if let Err(e) = session.dispatch(Command::Tick).await {
            warn!(error = %e, "Playback tick failed");
        }
    }
}

async fn build_compositor(extent: &GridExtent, width: u32, font: Option<&std::path::Path>) -> RasterCompositor {
    let compositor = RasterCompositor::new(extent, width);
    let Some(path) = font else {
        return compositor;
    };
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = ?path, error = %e, "Label font unreadable; drawing labels without text");
            return compositor;
        }
    };
    compositor.with_font_bytes(bytes).unwrap_or_else(|e| {
        warn!(path = ?path, error = %e, "Label font rejected; drawing labels without text");
        RasterCompositor::new(extent, width)
    })
}

fn temperature_scale(metadata: &DatasetMetadata) -> (FixedScale, GradientScheme) {
    let gradient = GradientScheme::default();
    let (min, max) = metadata.temperature_range();
    (FixedScale::new(min, max, gradient.len()), gradient)
}
