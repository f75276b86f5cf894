//! Source abstraction over cameras, network streams, video files and still images

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::frame::VideoFrame;
use crate::image_file::ImageSource;
use crate::mjpeg::MjpegSource;
use crate::{CameraConfig, CameraError};

/// A source of RGB frames.
///
/// Any error from `read_frame` ends the stream; callers do not retry.
pub trait FrameSource: Send {
    /// Read the next frame, blocking until one is available
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Local camera by index (`/dev/video{n}`)
    Camera(u32),
    /// Network stream, either `ip:port` or a full URL
    Stream(String),
    /// Local video file
    VideoFile(PathBuf),
    /// Single still image
    Image(PathBuf),
}

impl SourceSpec {
    /// Open the source
    pub fn open(&self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
        let source: Box<dyn FrameSource> = match self {
            SourceSpec::Camera(index) => open_camera(*index, config)?,
            SourceSpec::Stream(address) => {
                let url = stream_url(address, &config.stream_path);
                Box::new(MjpegSource::connect(&url)?)
            }
            SourceSpec::VideoFile(path) => open_video_file(path)?,
            SourceSpec::Image(path) => Box::new(ImageSource::open(path)?),
        };
        info!("Opened source: {}", source.describe());
        Ok(source)
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera(index) => write!(f, "camera #{}", index),
            SourceSpec::Stream(address) => write!(f, "stream {}", address),
            SourceSpec::VideoFile(path) => write!(f, "video {}", path.display()),
            SourceSpec::Image(path) => write!(f, "image {}", path.display()),
        }
    }
}

/// Build the stream URL for an address.
///
/// A bare `ip:port` becomes `http://ip:port{path}`; anything with a scheme is used as-is.
pub fn stream_url(address: &str, path: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        return address.to_string();
    }
    let path = if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("http://{}{}", address.trim_end_matches('/'), path)
}

#[cfg(feature = "v4l2")]
fn open_camera(index: u32, config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    Ok(Box::new(crate::v4l2::V4l2Source::open(index, config)?))
}

#[cfg(not(feature = "v4l2"))]
fn open_camera(index: u32, _config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    Err(CameraError::Unsupported(format!(
        "camera #{} requires the v4l2 feature",
        index
    )))
}

#[cfg(feature = "ffmpeg")]
fn open_video_file(path: &std::path::Path) -> Result<Box<dyn FrameSource>, CameraError> {
    Ok(Box::new(crate::ffmpeg::FfmpegSource::open(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_file(path: &std::path::Path) -> Result<Box<dyn FrameSource>, CameraError> {
    Err(CameraError::Unsupported(format!(
        "video file {} requires the ffmpeg feature",
        path.display()
    )))
}

/// Stamps frames with a sequence number and the time since the source was opened
#[derive(Debug, Clone)]
pub(crate) struct FrameStamp {
    opened_at: Instant,
    sequence: u32,
}

impl FrameStamp {
    pub(crate) fn new() -> Self {
        Self {
            opened_at: Instant::now(),
            sequence: 0,
        }
    }

    /// Returns (timestamp_ns, sequence) for the next frame
    pub(crate) fn next(&mut self) -> (u64, u32) {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        (self.opened_at.elapsed().as_nanos() as u64, sequence)
    }

    pub(crate) fn frames(&self) -> u32 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_from_address() {
        assert_eq!(stream_url("192.168.1.5:8080", "/video"), "http://192.168.1.5:8080/video");
        assert_eq!(stream_url(" 10.0.0.2:4747/ ", "video"), "http://10.0.0.2:4747/video");
    }

    #[test]
    fn test_stream_url_keeps_full_url() {
        assert_eq!(
            stream_url("https://cam.local/mjpeg", "/video"),
            "https://cam.local/mjpeg"
        );
    }

    #[test]
    fn test_frame_stamp_sequence() {
        let mut stamp = FrameStamp::new();
        let (t0, s0) = stamp.next();
        let (t1, s1) = stamp.next();
        assert_eq!((s0, s1), (0, 1));
        assert!(t1 >= t0);
        assert_eq!(stamp.frames(), 2);
    }

    #[test]
    fn test_missing_image_fails_to_open() {
        let spec = SourceSpec::Image(PathBuf::from("/nonexistent/frame.png"));
        assert!(matches!(
            spec.open(&CameraConfig::default()),
            Err(CameraError::Open(_))
        ));
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn test_video_without_ffmpeg_is_unsupported() {
        let spec = SourceSpec::VideoFile(PathBuf::from("clip.mp4"));
        assert!(matches!(
            spec.open(&CameraConfig::default()),
            Err(CameraError::Unsupported(_))
        ));
    }
}
