//! User commands and the session that executes them

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use camera_capture::{load_image, CameraConfig, SourceSpec};
use proximity::FrameProcessor;
use tracing::info;

use crate::capture::{CaptureHandle, CaptureLoop, FrameResult, FrameStream};
use crate::PipelineError;

/// A user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Capture from a local camera
    StartWebcam { index: u32 },
    /// Capture from a network stream (`ip:port` or URL)
    ConnectStream { address: String },
    /// Process one still image
    OpenImage { path: PathBuf },
    /// Capture from a video file
    OpenVideo { path: PathBuf },
    /// Stop the running capture
    Stop,
}

impl Command {
    /// Source a capture command reads from
    pub fn source(&self) -> Option<SourceSpec> {
        match self {
            Command::StartWebcam { index } => Some(SourceSpec::Camera(*index)),
            Command::ConnectStream { address } => Some(SourceSpec::Stream(address.clone())),
            Command::OpenImage { path } => Some(SourceSpec::Image(path.clone())),
            Command::OpenVideo { path } => Some(SourceSpec::VideoFile(path.clone())),
            Command::Stop => None,
        }
    }
}

/// What a dispatched command produced
pub enum Outcome {
    /// A capture is running; results arrive on the stream
    Started(FrameStream),
    /// A still image was processed synchronously
    Processed(FrameResult),
    /// The running capture, if any, was asked to stop
    Stopped,
}

/// One user session: a frame processor shared by successive captures, and at
/// most one running capture.
pub struct Session {
    processor: Arc<Mutex<FrameProcessor>>,
    camera: CameraConfig,
    active: Option<CaptureHandle>,
}

impl Session {
    pub fn new(processor: FrameProcessor, camera: CameraConfig) -> Self {
        Self {
            processor: Arc::new(Mutex::new(processor)),
            camera,
            active: None,
        }
    }

    /// Execute a command.
    ///
    /// Starting any source stops the previous capture first; its worker is
    /// detached once the new one is in place. An image is
    /// processed on the calling thread and reported with an FPS of 0.
    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, PipelineError> {
        info!("Dispatching {:?}", command);
        match command {
            Command::Stop => {
                self.stop_active();
                Ok(Outcome::Stopped)
            }
            Command::OpenImage { path } => {
                self.stop_active();
                let frame = load_image(&path)?;
                let processed = self
                    .processor
                    .lock()
                    .map_err(|_| PipelineError::ProcessorPoisoned)?
                    .process(&frame)?;
                Ok(Outcome::Processed(FrameResult::new(frame, processed, 0.0)))
            }
            capture => {
                self.stop_active();
                let Some(spec) = capture.source() else {
                    return Ok(Outcome::Stopped);
                };
                let source = spec.open(&self.camera)?;
                let (handle, stream) = CaptureLoop::new(Arc::clone(&self.processor)).spawn(source);
                self.active = Some(handle);
                Ok(Outcome::Started(stream))
            }
        }
    }

    /// Whether a capture worker is still running
    pub fn is_capturing(&self) -> bool {
        self.active.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Detach the latest capture's handle, e.g. to wait for it
    pub fn take_capture(&mut self) -> Option<CaptureHandle> {
        self.active.take()
    }

    /// Signal the latest capture; its handle stays until replaced or taken
    fn stop_active(&mut self) {
        if let Some(handle) = &self.active {
            if !handle.is_finished() {
                info!("Stopping running capture");
            }
            handle.stop();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_active();
    }
}
