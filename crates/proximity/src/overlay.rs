//! Box and label overlays

use ab_glyph::FontArc;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::config::ProximityConfig;
use crate::object::{Detection, PixelBox};

/// Gap between a box's top edge and its label baseline (pixels)
const LABEL_OFFSET: i32 = 10;

/// DejaVu Sans, used unless `font_path` names another font
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Draws detection boxes and, when a font is available, their labels
pub struct Overlay {
    font: Option<FontArc>,
    thickness: u32,
    label_scale: f32,
}

impl Overlay {
    pub fn new(font: Option<FontArc>, thickness: u32, label_scale: f32) -> Self {
        Self {
            font,
            thickness: thickness.clamp(1, i32::MAX as u32),
            label_scale,
        }
    }

    /// The font compiled into the crate
    pub fn bundled_font() -> Option<FontArc> {
        match FontArc::try_from_slice(BUNDLED_FONT) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("Bundled label font unusable: {}; drawing boxes only", e);
                None
            }
        }
    }

    /// Build from config. `font_path` overrides the bundled font; if it
    /// cannot be loaded the bundled font is used instead.
    pub fn from_config(config: &ProximityConfig) -> Self {
        let custom = config.font_path.as_deref().and_then(|path| {
            match std::fs::read(path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| FontArc::try_from_vec(bytes).map_err(|e| e.to_string()))
            {
                Ok(font) => {
                    info!("Loaded label font {}", path);
                    Some(font)
                }
                Err(e) => {
                    warn!("Cannot load label font {}: {}; using bundled font", path, e);
                    None
                }
            }
        });
        let font = custom.or_else(Self::bundled_font);
        Self::new(font, config.box_thickness, config.label_scale)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw one detection onto `image`
    pub fn draw(&self, image: &mut RgbImage, detection: &Detection) {
        let color = Rgb(detection.highlight.rgb());
        let b = self.clip(detection.bbox, image.dimensions());

        // Concentric outlines growing inward; stop once the box is used up
        for t in 0..self.thickness as i32 {
            let w = b.width() - 2 * t;
            let h = b.height() - 2 * t;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(b.x1 + t, b.y1 + t).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, rect, color);
        }

        if let Some(font) = &self.font {
            let y = b
                .y1
                .saturating_sub(LABEL_OFFSET + self.label_scale as i32)
                .max(0);
            draw_text_mut(
                image,
                color,
                b.x1.max(0),
                y,
                self.label_scale,
                font,
                &detection.label(),
            );
        }
    }

    /// Pull edges far outside the image to just past its border, so the
    /// outline rings that would land there stay invisible
    fn clip(&self, b: PixelBox, (width, height): (u32, u32)) -> PixelBox {
        let margin = self.thickness as i32;
        let max_x = (width as i32).saturating_add(margin);
        let max_y = (height as i32).saturating_add(margin);
        PixelBox {
            x1: b.x1.clamp(-margin, max_x),
            y1: b.y1.clamp(-margin, max_y),
            x2: b.x2.clamp(-margin, max_x),
            y2: b.y2.clamp(-margin, max_y),
        }
    }
}
