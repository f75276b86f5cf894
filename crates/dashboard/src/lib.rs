//! Proximity Dashboard
//!
//! Console front end: settings, logging, metrics export and presentation of
//! capture results.

pub mod presenter;
pub mod settings;
pub mod system;

pub use presenter::{save_annotated, status_line, Presenter};
pub use settings::Settings;
pub use system::{SystemMonitor, SystemStats};

use std::net::SocketAddr;

use alerting::{default_tone_sink, AlertGate};
use anyhow::{Context, Result};
use inference_engine::load_detector;
use metrics_exporter_prometheus::PrometheusBuilder;
use pipeline::Session;
use proximity::FrameProcessor;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging on stderr; unknown levels fall back to INFO
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn parse_level(level: &str) -> Level {
    level.parse::<Level>().unwrap_or(Level::INFO)
}

/// Serve Prometheus metrics on `addr`. Needs a running tokio runtime.
pub fn install_metrics(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics address {}", addr))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}

/// Build a session from settings: detector, alert gate and frame processor
pub fn build_session(settings: &Settings) -> Result<Session> {
    let detector = load_detector(&settings.detector).context("Failed to load detector")?;
    info!("Detector ready: {}", detector.name());

    let gate = AlertGate::new(settings.alert.clone(), default_tone_sink());
    let processor = FrameProcessor::new(settings.proximity.clone(), detector, gate);
    Ok(Session::new(processor, settings.camera.clone()))
}
