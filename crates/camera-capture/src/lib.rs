//! Camera Capture Library for Proximity Vision
//!
//! Opens a video source and yields decoded RGB frames.
//! Supports:
//! - Local cameras by index (V4L2, `v4l2` feature)
//! - Network MJPEG streams over HTTP (phone camera apps, IP cameras)
//! - Local video files (FFmpeg, `ffmpeg` feature)
//! - Single still images

pub mod frame;
pub mod image_file;
pub mod mjpeg;
pub mod source;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use frame::VideoFrame;
pub use image_file::{load_image, ImageSource};
pub use mjpeg::MjpegSource;
pub use source::{FrameSource, SourceSpec};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("End of stream")]
    EndOfStream,

    #[error("Source not supported in this build: {0}")]
    Unsupported(String),
}

/// Capture configuration shared by all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preferred capture width (cameras only)
    pub width: u32,
    /// Preferred capture height (cameras only)
    pub height: u32,
    /// Preferred frame rate (cameras only)
    pub fps: u32,
    /// Path appended to a bare `ip:port` stream address
    pub stream_path: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            stream_path: "/video".to_string(),
        }
    }
}
