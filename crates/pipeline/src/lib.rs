//! Capture Pipeline
//!
//! Drives a frame source through the frame processor on a worker thread and
//! hands results to a single consumer. A `Session` maps user commands onto
//! captures.

pub mod capture;
pub mod command;
pub mod fps;

pub use capture::{CaptureHandle, CaptureLoop, CaptureSummary, FrameResult, FrameStream, LoopState, StopHandle, StopReason};
pub use command::{Command, Outcome, Session};
pub use fps::FpsMeter;

use camera_capture::CameraError;
use proximity::ProximityError;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    Source(#[from] CameraError),

    #[error("Frame processing failed: {0}")]
    Inference(#[from] ProximityError),

    #[error("Capture loop already ran")]
    AlreadyRun,

    #[error("Frame processor unavailable: a previous capture panicked")]
    ProcessorPoisoned,

    #[error("Capture worker panicked")]
    WorkerPanicked,
}
