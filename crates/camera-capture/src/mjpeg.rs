//! Network MJPEG source.
//!
//! Phone camera apps and most IP cameras serve `multipart/x-mixed-replace`
//! MJPEG over HTTP. Servers that answer with a single JPEG are polled once
//! per read instead; the body fetched while connecting is the first frame.

use std::io::Read;

use tracing::{debug, info};
use url::Url;

use crate::frame::VideoFrame;
use crate::source::{FrameSource, FrameStamp};
use crate::CameraError;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;
const READ_CHUNK: usize = 8192;

/// HTTP MJPEG / JPEG snapshot source
pub struct MjpegSource {
    url: String,
    stream: HttpStream,
    stamp: FrameStamp,
}

enum HttpStream {
    Multipart(JpegScanner<Box<dyn Read + Send + Sync>>),
    Snapshot { pending: Option<Vec<u8>> },
}

impl MjpegSource {
    /// Connect to the stream. Fails if the URL is invalid or the server is unreachable.
    pub fn connect(url: &str) -> Result<Self, CameraError> {
        let parsed = Url::parse(url).map_err(|e| CameraError::Open(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CameraError::Open(format!(
                "unsupported stream scheme '{}'; expected http(s)",
                parsed.scheme()
            )));
        }

        let response = ureq::get(url)
            .call()
            .map_err(|e| CameraError::Open(format!("{}: {}", url, e)))?;
        let content_type = response.header("Content-Type").unwrap_or("").to_lowercase();

        let stream = if content_type.contains("multipart") {
            info!("Connected to MJPEG stream {}", url);
            HttpStream::Multipart(JpegScanner::new(response.into_reader()))
        } else {
            info!("Connected to JPEG snapshot endpoint {} ({})", url, content_type);
            HttpStream::Snapshot {
                pending: Some(read_body(response)?),
            }
        };

        Ok(Self {
            url: url.to_string(),
            stream,
            stamp: FrameStamp::new(),
        })
    }
}

impl FrameSource for MjpegSource {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let jpeg = match &mut self.stream {
            HttpStream::Multipart(scanner) => scanner.next_jpeg()?,
            HttpStream::Snapshot { pending } => match pending.take() {
                Some(jpeg) => jpeg,
                None => fetch_snapshot(&self.url)?,
            },
        };
        let image = image::load_from_memory(&jpeg)
            .map_err(|e| CameraError::Decode(e.to_string()))?
            .into_rgb8();
        let (timestamp_ns, sequence) = self.stamp.next();
        Ok(VideoFrame::from_image(image, timestamp_ns, sequence))
    }

    fn describe(&self) -> String {
        format!("stream {} ({} frames)", self.url, self.stamp.frames())
    }
}

fn fetch_snapshot(url: &str) -> Result<Vec<u8>, CameraError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| CameraError::Stream(e.to_string()))?;
    read_body(response)
}

fn read_body(response: ureq::Response) -> Result<Vec<u8>, CameraError> {
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_JPEG_BYTES as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| CameraError::Stream(e.to_string()))?;
    if bytes.is_empty() {
        return Err(CameraError::Stream("empty jpeg snapshot".into()));
    }
    Ok(bytes)
}

/// Splits a byte stream into JPEG images by SOI/EOI markers
pub(crate) struct JpegScanner<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: Read> JpegScanner<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    pub(crate) fn next_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let jpeg = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(jpeg);
            }

            let read = self
                .reader
                .read(&mut chunk)
                .map_err(|e| CameraError::Stream(e.to_string()))?;
            if read == 0 {
                return Err(CameraError::EndOfStream);
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                debug!("MJPEG buffer overflow, discarding {} bytes", self.buffer.len());
                // keep the tail so a marker split across reads survives
                let drain_len = self.buffer.len() - 1;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

/// Byte range [start, end) of the first complete JPEG in `buffer`
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + 2 + end + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_find_jpeg_bounds() {
        let buf = [0x00, 0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9, 0x03];
        assert_eq!(find_jpeg_bounds(&buf), Some((1, 7)));
        assert_eq!(find_jpeg_bounds(&[0xFF, 0xD8, 0x01]), None);
        assert_eq!(find_jpeg_bounds(&[0x01, 0x02]), None);
    }

    #[test]
    fn test_scanner_splits_multipart_body() {
        let mut body = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        body.extend_from_slice(&[0xFF, 0xD8, 0xAA, 0xFF, 0xD9]);
        body.extend_from_slice(b"\r\n--frame\r\n\r\n");
        body.extend_from_slice(&[0xFF, 0xD8, 0xBB, 0xCC, 0xFF, 0xD9]);

        let mut scanner = JpegScanner::new(Cursor::new(body));
        assert_eq!(scanner.next_jpeg().unwrap(), vec![0xFF, 0xD8, 0xAA, 0xFF, 0xD9]);
        assert_eq!(scanner.next_jpeg().unwrap(), vec![0xFF, 0xD8, 0xBB, 0xCC, 0xFF, 0xD9]);
        assert!(matches!(scanner.next_jpeg(), Err(CameraError::EndOfStream)));
    }

    #[test]
    fn test_snapshot_body_from_connect_is_first_frame() {
        let mut jpeg = Cursor::new(Vec::new());
        image::RgbImage::from_pixel(16, 8, image::Rgb([200, 30, 30]))
            .write_to(&mut jpeg, image::ImageFormat::Jpeg)
            .unwrap();

        // nothing listens on the discard port, so only the pending body can decode
        let mut source = MjpegSource {
            url: "http://127.0.0.1:9/video".into(),
            stream: HttpStream::Snapshot {
                pending: Some(jpeg.into_inner()),
            },
            stamp: FrameStamp::new(),
        };

        let frame = source.read_frame().unwrap();
        assert_eq!((frame.width, frame.height), (16, 8));
        assert_eq!(frame.sequence, 0);
        assert!(matches!(source.read_frame(), Err(CameraError::Stream(_))));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(matches!(
            MjpegSource::connect("rtsp://camera.local/stream"),
            Err(CameraError::Open(_))
        ));
    }
}
