//! Still image source

use std::path::{Path, PathBuf};

use crate::frame::VideoFrame;
use crate::source::FrameSource;
use crate::CameraError;

/// Decode an image file into an RGB frame
pub fn load_image(path: &Path) -> Result<VideoFrame, CameraError> {
    let image = image::open(path)
        .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?;
    Ok(VideoFrame::from_image(image.into_rgb8(), 0, 0))
}

/// Yields a single frame, then end-of-stream
pub struct ImageSource {
    path: PathBuf,
    frame: Option<VideoFrame>,
}

impl ImageSource {
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        Ok(Self {
            frame: Some(load_image(path)?),
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for ImageSource {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.frame.take().ok_or(CameraError::EndOfStream)
    }

    fn describe(&self) -> String {
        format!("image {}", self.path.display())
    }
}
