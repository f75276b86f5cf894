//! Console presentation of frame results

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pipeline::FrameResult;
use proximity::ObjectCounts;
use tracing::info;

use crate::system::{SystemMonitor, SystemStats};

/// `Objects→person:2 | car:1`, or `Objects:None`
pub fn objects_text(counts: &ObjectCounts) -> String {
    if counts.is_empty() {
        "Objects:None".to_string()
    } else {
        format!("Objects→{}", counts.summary())
    }
}

/// One status line per result
pub fn status_line(fps: f64, stats: SystemStats, counts: &ObjectCounts) -> String {
    format!(
        "FPS:{:.2}  CPU:{:.1}%  RAM:{:.1}%  {}",
        fps,
        stats.cpu_percent,
        stats.ram_percent,
        objects_text(counts)
    )
}

/// Write the annotated frame as an image (format from the extension)
pub fn save_annotated(result: &FrameResult, path: &Path) -> Result<()> {
    let image = result.annotated().to_image()?;
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))
}

/// Logs results, optionally prints detections as JSON lines on `out` and
/// mirrors the latest frame to disk
pub struct Presenter<W = io::Stdout> {
    out: W,
    snapshot: Option<PathBuf>,
    json: bool,
    monitor: SystemMonitor,
    frames: u64,
}

impl Presenter {
    pub fn new(snapshot: Option<PathBuf>, json: bool) -> Self {
        Self::with_output(io::stdout(), snapshot, json)
    }
}

impl<W: Write> Presenter<W> {
    pub fn with_output(out: W, snapshot: Option<PathBuf>, json: bool) -> Self {
        Self {
            out,
            snapshot,
            json,
            monitor: SystemMonitor::new(),
            frames: 0,
        }
    }

    pub fn present(&mut self, result: &FrameResult) -> Result<()> {
        self.frames += 1;
        let stats = self.monitor.sample();
        info!("{}", status_line(result.fps(), stats, result.counts()));

        if self.json {
            serde_json::to_writer(&mut self.out, result.detections())?;
            self.out.write_all(b"\n")?;
            self.out.flush()?;
        }
        if let Some(path) = &self.snapshot {
            save_annotated(result, path)?;
        }
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
