//! Proximity Dashboard - Main Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dashboard::{build_session, init_logging, install_metrics, save_annotated, Presenter, Settings};
use pipeline::{Command, Outcome};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// YOLOv8 ONNX model, overriding the settings
    #[arg(long, global = true)]
    model: Option<String>,

    /// Keep the latest annotated frame at this path
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Print each frame's detections as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Local camera
    Webcam {
        #[arg(long, default_value_t = 0)]
        index: u32,
    },
    /// Network MJPEG stream, `ip:port` or a full URL
    Stream { address: String },
    /// Single image
    Image {
        path: PathBuf,
        /// Write the annotated image here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Video file
    Video { path: PathBuf },
}

impl Source {
    fn command(&self) -> Command {
        match self {
            Source::Webcam { index } => Command::StartWebcam { index: *index },
            Source::Stream { address } => Command::ConnectStream {
                address: address.clone(),
            },
            Source::Image { path, .. } => Command::OpenImage { path: path.clone() },
            Source::Video { path } => Command::OpenVideo { path: path.clone() },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(model) = cli.model.clone() {
        settings.detector.model_path = Some(model);
    }
    init_logging(&settings.log_level)?;

    info!("=== Proximity Dashboard v{} ===", env!("CARGO_PKG_VERSION"));
    if let Some(addr) = &settings.metrics_addr {
        install_metrics(addr)?;
    }

    let mut session = build_session(&settings)?;
    let mut presenter = Presenter::new(cli.snapshot.clone(), cli.json);

    match session.dispatch(cli.source.command())? {
        Outcome::Processed(result) => {
            presenter.present(&result)?;
            if let Source::Image { output: Some(output), .. } = &cli.source {
                save_annotated(&result, output)?;
                info!("Annotated image written to {}", output.display());
            }
        }
        Outcome::Started(mut stream) => {
            loop {
                tokio::select! {
                    next = stream.next() => match next {
                        Some(result) => presenter.present(&result)?,
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted, stopping capture");
                        session.dispatch(Command::Stop)?;
                    }
                }
            }

            if let Some(capture) = session.take_capture() {
                let summary = capture.wait().await?;
                info!("{} frames shown; capture ended: {:?}", presenter.frames(), summary.reason);
            }
        }
        Outcome::Stopped => warn!("Nothing to run"),
    }

    Ok(())
}
