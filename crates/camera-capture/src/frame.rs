//! Video frame types

use image::RgbImage;

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the source was opened)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a frame filled with a single color
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(data, width, height, 0, 0)
    }

    /// Wrap a decoded image
    pub fn from_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Copy the pixels into an `image` buffer for drawing or resizing
    pub fn to_image(&self) -> Result<RgbImage, CameraError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CameraError::Format(format!(
                "expected {} RGB bytes for {}x{}, got {}",
                self.width as usize * self.height as usize * 3,
                self.width,
                self.height,
                self.data.len()
            ))
        })
    }

    /// Replace the pixel data with the contents of `image`, keeping timing metadata
    pub fn with_pixels(&self, image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// True when the buffer holds exactly width * height RGB pixels
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame() {
        let frame = VideoFrame::filled(4, 2, [10, 20, 30]);
        assert!(frame.is_well_formed());
        assert_eq!(frame.get_pixel(3, 1), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 0), None);
    }

    #[test]
    fn test_image_conversion_keeps_metadata() {
        let frame = VideoFrame::new(vec![0; 2 * 2 * 3], 2, 2, 42, 7);
        let mut img = frame.to_image().unwrap();
        img.put_pixel(1, 1, image::Rgb([255, 0, 0]));

        let painted = frame.with_pixels(img);
        assert_eq!(painted.timestamp_ns, 42);
        assert_eq!(painted.sequence, 7);
        assert_eq!(painted.get_pixel(1, 1), Some([255, 0, 0]));
        assert_eq!(frame.get_pixel(1, 1), Some([0, 0, 0]));
    }

    #[test]
    fn test_malformed_buffer_rejected() {
        let frame = VideoFrame::new(vec![0; 5], 2, 2, 0, 0);
        assert!(!frame.is_well_formed());
        assert!(matches!(frame.to_image(), Err(CameraError::Format(_))));
    }
}
