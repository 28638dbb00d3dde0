//! Climate viewer binary.
//!
//! `serve` runs the HTTP surface, `render` writes one period to a PNG and
//! `play` writes a run of playback steps to numbered PNGs.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use climate_common::Layer;
use projection::GeoBounds;
use renderer::{MapViewport, OverlayStrategy};
use storage::EvictionPolicy;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use viewer::{AppState, Command, DisplayMode, StateQuery, ViewerConfig, ViewerSession};

#[derive(Parser, Debug)]
#[command(name = "climate-viewer")]
#[command(about = "Monthly UK climate raster and grid viewer")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "CLIMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Dataset root directory or http(s) base URL
    #[arg(long)]
    data: Option<String>,

    #[arg(long)]
    cache_capacity: Option<usize>,

    /// fifo or lru
    #[arg(long)]
    cache_policy: Option<EvictionPolicy>,

    /// bitmap or quads
    #[arg(long)]
    overlay_strategy: Option<OverlayStrategy>,

    #[arg(long)]
    locations_file: Option<PathBuf>,

    /// TrueType font for marker labels
    #[arg(long)]
    font: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address
        #[arg(short, long)]
        listen: Option<String>,

        /// Initial state as a shareable query string
        #[arg(long)]
        query: Option<String>,
    },
    /// Render one period to a PNG
    Render {
        #[command(flatten)]
        target: Target,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render successive playback steps to numbered PNGs
    Play {
        #[command(flatten)]
        target: Target,

        #[arg(long, default_value_t = 12)]
        steps: u32,

        #[arg(short, long)]
        out_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
struct Target {
    #[arg(long)]
    year: Option<i32>,

    #[arg(long)]
    month: Option<u32>,

    /// single or average
    #[arg(long)]
    view: Option<String>,

    #[arg(long)]
    layer: Option<Layer>,

    /// canvas or map
    #[arg(long, default_value = "canvas")]
    display: DisplayMode,

    /// Slippy-map zoom for the quad overlay
    #[arg(long, default_value_t = 6.0)]
    zoom: f64,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 1000)]
    height: u32,
}

impl Target {
    fn query(&self) -> Result<String> {
        let query = StateQuery {
            year: self.year,
            month: self.month,
            view: self.view.clone(),
            layer: self.layer.map(|l| l.as_str().to_string()),
        };
        Ok(query.encode()?)
    }

    fn viewport(&self, strategy: OverlayStrategy, bounds: GeoBounds) -> Option<MapViewport> {
        match strategy {
            OverlayStrategy::Bitmap => None,
            OverlayStrategy::Quads => Some(MapViewport::centered(
                bounds.center(),
                self.zoom,
                self.width,
                self.height,
            )),
        }
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main(cli))
}

fn init_tracing(log_level: &str) -> Result<()> {
    // RUST_LOG wins over --log-level when set
    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(());
    }

    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = ViewerConfig::load(cli.config.as_deref())?;
    if let Some(data) = &cli.data {
        config.data_root = data.clone();
    }
    if let Some(capacity) = cli.cache_capacity {
        config.cache.capacity = capacity;
    }
    if let Some(policy) = cli.cache_policy {
        config.cache.policy = policy;
    }
    if let Some(strategy) = cli.overlay_strategy {
        config.overlay.strategy = strategy;
    }
    if let Some(file) = &cli.locations_file {
        config.locations_file = file.clone();
    }
    if let Some(font) = &cli.font {
        config.canvas.font = Some(font.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;

    match cli.command {
        None => serve(config, None, None).await,
        Some(Commands::Serve { listen, query }) => serve(config, listen, query).await,
        Some(Commands::Render { target, output }) => {
            config.display = target.display;
            config.playback.preload = false;
            let session = open(&config, &target).await?;
            write_current(&session, &target, &output).await?;
            info!(path = ?output, "Wrote image");
            Ok(())
        }
        Some(Commands::Play {
            target,
            steps,
            out_dir,
        }) => {
            config.display = target.display;
            let session = open(&config, &target).await?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("Failed to create {:?}", out_dir))?;

            // steps are driven here rather than by the timer
            session.dispatch(Command::TogglePlay).await?;
            session.stop_playback().await;

            for step in 0..steps {
                let label = session.ui().await.label;
                let path = out_dir.join(format!("{:03}_{}.png", step, label.replace(' ', "_")));
                write_current(&session, &target, &path).await?;
                info!(step, period = %label, path = ?path, "Wrote playback step");
                session.dispatch(Command::Tick).await?;
            }
            session.dispatch(Command::TogglePlay).await?;
            Ok(())
        }
    }
}

async fn serve(config: ViewerConfig, listen: Option<String>, query: Option<String>) -> Result<()> {
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    viewer::metrics::describe();
    info!("Prometheus metrics exporter initialized");

    let addr: SocketAddr = listen
        .as_deref()
        .unwrap_or(&config.listen)
        .parse()
        .context("Invalid listen address")?;

    let state = AppState::new(config, query.as_deref())
        .await
        .context("Failed to start viewer session")?;
    viewer::server::run_server(Arc::new(state), addr, Some(prometheus)).await
}

async fn open(config: &ViewerConfig, target: &Target) -> Result<Arc<ViewerSession>> {
    let session = ViewerSession::start(config, Some(&target.query()?))
        .await
        .context("Failed to start viewer session")?;
    if let Some(status) = session.ui().await.status {
        bail!(status);
    }
    Ok(session)
}

async fn write_current(session: &Arc<ViewerSession>, target: &Target, path: &Path) -> Result<()> {
    if let Some(status) = session.ui().await.status {
        bail!(status);
    }
    let png = match target.display {
        DisplayMode::Canvas => session.render_canvas_png().await?,
        DisplayMode::Map => {
            let viewport = target.viewport(session.overlay_strategy(), session.overlay_bounds());
            session.render_overlay(viewport).await?.png
        }
    };
    tokio::fs::write(path, png)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}
