//! V4L2 camera source.
//!
//! Cameras are addressed by index (`/dev/video{n}`). RGB3 is requested; devices
//! that only offer YUYV or MJPG are converted to RGB on read.

use ouroboros::self_referencing;
use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::FourCC;

use crate::frame::VideoFrame;
use crate::source::{FrameSource, FrameStamp};
use crate::{CameraConfig, CameraError};

const BUFFER_COUNT: u32 = 4;

/// Pixel layout delivered by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Rgb24,
    Yuyv,
    Mjpeg,
}

impl Layout {
    fn from_fourcc(fourcc: FourCC) -> Result<Self, CameraError> {
        match &fourcc.repr {
            b"RGB3" => Ok(Layout::Rgb24),
            b"YUYV" => Ok(Layout::Yuyv),
            b"MJPG" => Ok(Layout::Mjpeg),
            other => Err(CameraError::Format(format!(
                "unsupported pixel format {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: MmapStream<'this>,
}

/// V4L2 camera source
pub struct V4l2Source {
    path: String,
    state: DeviceState,
    layout: Layout,
    width: u32,
    height: u32,
    stamp: FrameStamp,
}

impl V4l2Source {
    /// Open `/dev/video{index}` and start streaming
    pub fn open(index: u32, config: &CameraConfig) -> Result<Self, CameraError> {
        let path = format!("/dev/video{}", index);
        let device = v4l::Device::with_path(&path)
            .map_err(|e| CameraError::Open(format!("{}: {}", path, e)))?;

        let mut format = device
            .format()
            .map_err(|e| CameraError::Open(format!("{}: read format: {}", path, e)))?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(e) => {
                warn!("Failed to set format on {}: {}", path, e);
                device
                    .format()
                    .map_err(|e| CameraError::Open(format!("{}: read format: {}", path, e)))?
            }
        };

        if config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.fps);
            if let Err(e) = device.set_params(&params) {
                warn!("Failed to set fps on {}: {}", path, e);
            }
        }

        let layout = Layout::from_fourcc(format.fourcc)?;

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
                    .map_err(|e| CameraError::Stream(format!("create buffer stream: {}", e)))
            },
        }
        .try_build()?;

        info!(
            "Camera {} streaming {}x{} ({:?})",
            path, format.width, format.height, layout
        );

        Ok(Self {
            path,
            state,
            layout,
            width: format.width,
            height: format.height,
            stamp: FrameStamp::new(),
        })
    }
}

impl FrameSource for V4l2Source {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let raw = self.state.with_stream_mut(|stream| {
            stream
                .next()
                .map(|(buf, meta)| {
                    let used = (meta.bytesused as usize).min(buf.len());
                    let used = if used == 0 { buf.len() } else { used };
                    buf[..used].to_vec()
                })
                .map_err(|e| CameraError::Stream(e.to_string()))
        })?;

        let (timestamp_ns, sequence) = self.stamp.next();
        match self.layout {
            Layout::Rgb24 => Ok(VideoFrame::new(raw, self.width, self.height, timestamp_ns, sequence)),
            Layout::Yuyv => Ok(VideoFrame::new(
                yuyv_to_rgb(&raw),
                self.width,
                self.height,
                timestamp_ns,
                sequence,
            )),
            Layout::Mjpeg => {
                let image = image::load_from_memory(&raw)
                    .map_err(|e| CameraError::Decode(e.to_string()))?
                    .into_rgb8();
                Ok(VideoFrame::from_image(image, timestamp_ns, sequence))
            }
        }
    }

    fn describe(&self) -> String {
        format!("camera {} ({}x{})", self.path, self.width, self.height)
    }
}

/// Convert packed YUYV 4:2:2 to RGB24 (BT.601)
fn yuyv_to_rgb(yuyv: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(yuyv.len() / 2 * 3);
    for px in yuyv.chunks_exact(4) {
        let (y0, u, y1, v) = (px[0] as f32, px[1] as f32 - 128.0, px[2] as f32, px[3] as f32 - 128.0);
        for y in [y0, y1] {
            rgb.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_gray() {
        // neutral chroma gives gray pixels equal to luma
        let rgb = yuyv_to_rgb(&[100, 128, 200, 128]);
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_layout_from_fourcc() {
        assert_eq!(Layout::from_fourcc(FourCC::new(b"YUYV")).unwrap(), Layout::Yuyv);
        assert!(Layout::from_fourcc(FourCC::new(b"NV12")).is_err());
    }
}
