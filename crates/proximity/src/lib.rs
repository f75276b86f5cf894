//! Proximity Analysis
//!
//! Road scene proximity warnings from a single camera:
//! - Filtering detections to road-relevant classes
//! - Monocular distance estimation from box height
//! - Cooldown-gated proximity alerts
//! - Box and label overlays on the frame

pub mod analysis;
pub mod config;
pub mod distance;
pub mod object;
pub mod overlay;
pub mod processor;

pub use analysis::{ObjectCounts, ProcessedFrame};
pub use config::ProximityConfig;
pub use distance::DistanceEstimator;
pub use object::{Detection, Highlight, ObjectClass, PixelBox};
pub use overlay::Overlay;
pub use processor::FrameProcessor;

use camera_capture::CameraError;
use inference_engine::InferenceError;
use thiserror::Error;

/// Proximity error types
#[derive(Error, Debug)]
pub enum ProximityError {
    #[error("Detection failed: {0}")]
    Detector(#[from] InferenceError),

    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] CameraError),
}
