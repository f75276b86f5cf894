//! Local video file source using FFmpeg

use std::path::Path;

use ffmpeg_next as ffmpeg;
use tracing::info;

use crate::frame::VideoFrame;
use crate::source::{FrameSource, FrameStamp};
use crate::CameraError;

/// Decodes the best video stream of a local file to RGB24 frames
pub struct FfmpegSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stamp: FrameStamp,
    flushed: bool,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        let display = path.display().to_string();
        ffmpeg::init().map_err(|e| CameraError::Open(format!("initialize ffmpeg: {}", e)))?;

        let input = ffmpeg::format::input(&path)
            .map_err(|e| CameraError::Open(format!("{}: {}", display, e)))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| CameraError::Open(format!("{}: no video track", display)))?;
        let stream_index = stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| CameraError::Open(format!("{}: decoder parameters: {}", display, e)))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| CameraError::Open(format!("{}: open decoder: {}", display, e)))?;

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| CameraError::Open(format!("{}: create scaler: {}", display, e)))?;

        info!(
            "Opened video {} ({}x{})",
            display,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            path: display,
            input,
            stream_index,
            decoder,
            scaler,
            stamp: FrameStamp::new(),
            flushed: false,
        })
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<VideoFrame, CameraError> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| CameraError::Decode(format!("scale to RGB: {}", e)))?;

        let width = rgb.width();
        let height = rgb.height();
        let row_bytes = width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let line = data
                .get(start..start + row_bytes)
                .ok_or_else(|| CameraError::Decode("frame row out of bounds".into()))?;
            pixels.extend_from_slice(line);
        }

        let (timestamp_ns, sequence) = self.stamp.next();
        Ok(VideoFrame::new(pixels, width, height, timestamp_ns, sequence))
    }
}

impl FrameSource for FfmpegSource {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            // drain frames already buffered in the decoder first
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded);
            }
            if self.flushed {
                return Err(CameraError::EndOfStream);
            }

            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .map_err(|e| CameraError::Decode(e.to_string()))?;
                sent = true;
                break;
            }

            if !sent {
                self.decoder
                    .send_eof()
                    .map_err(|e| CameraError::Decode(e.to_string()))?;
                self.flushed = true;
            }
        }
    }

    fn describe(&self) -> String {
        format!("video {} ({} frames)", self.path, self.stamp.frames())
    }
}
