//! Road object classes and per-frame detections

use serde::{Deserialize, Serialize};
use std::fmt;

/// Object class. Only these eight classes are displayed or alerted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    #[serde(rename = "person")]
    Person,
    #[serde(rename = "car")]
    Car,
    #[serde(rename = "truck")]
    Truck,
    #[serde(rename = "bus")]
    Bus,
    #[serde(rename = "motorcycle")]
    Motorcycle,
    #[serde(rename = "bicycle")]
    Bicycle,
    #[serde(rename = "traffic light")]
    TrafficLight,
    #[serde(rename = "stop sign")]
    StopSign,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 8] = [
        ObjectClass::Person,
        ObjectClass::Car,
        ObjectClass::Truck,
        ObjectClass::Bus,
        ObjectClass::Motorcycle,
        ObjectClass::Bicycle,
        ObjectClass::TrafficLight,
        ObjectClass::StopSign,
    ];

    /// Detector label for this class
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Person => "person",
            ObjectClass::Car => "car",
            ObjectClass::Truck => "truck",
            ObjectClass::Bus => "bus",
            ObjectClass::Motorcycle => "motorcycle",
            ObjectClass::Bicycle => "bicycle",
            ObjectClass::TrafficLight => "traffic light",
            ObjectClass::StopSign => "stop sign",
        }
    }

    /// Parse a detector label; `None` for classes outside the allow-list
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overlay color choice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Highlight {
    #[default]
    Default,
    /// The alert gate fired for this detection
    Alert,
}

impl Highlight {
    /// RGB color
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Highlight::Default => [0, 0, 255],
            Highlight::Alert => [255, 0, 0],
        }
    }
}

/// Box in integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    /// Truncate float coordinates toward zero
    pub fn from_f32(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1 as i32,
            y1: y1 as i32,
            x2: x2 as i32,
            y2: y2 as i32,
        }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// Detected road object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Object class
    pub class: ObjectClass,

    /// Bounding box
    pub bbox: PixelBox,

    /// Detection confidence
    pub confidence: f32,

    /// Estimated distance (meters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,

    /// Overlay color
    pub highlight: Highlight,
}

impl Detection {
    /// Overlay text: class and distance when known, else class and confidence
    pub fn label(&self) -> String {
        match self.distance_m {
            Some(d) => format!("{} {}m", self.class, format_distance(d)),
            None => format!("{} {:.2}", self.class, self.confidence),
        }
    }
}

/// Render like a float repr: whole numbers keep one decimal ("3.0")
fn format_distance(d: f64) -> String {
    if d.fract() == 0.0 {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for class in ObjectClass::ALL {
            assert_eq!(ObjectClass::from_label(class.as_str()), Some(class));
        }
        assert_eq!(ObjectClass::from_label("dog"), None);
        assert_eq!(ObjectClass::from_label("Person"), None);
    }

    #[test]
    fn test_detection_label_text() {
        let mut det = Detection {
            class: ObjectClass::TrafficLight,
            bbox: PixelBox::from_f32(0.0, 0.0, 10.0, 10.0),
            confidence: 0.876,
            distance_m: None,
            highlight: Highlight::Default,
        };
        assert_eq!(det.label(), "traffic light 0.88");

        det.distance_m = Some(3.0);
        assert_eq!(det.label(), "traffic light 3.0m");

        det.distance_m = Some(12.35);
        assert_eq!(det.label(), "traffic light 12.35m");
    }

    #[test]
    fn test_pixel_box_truncates() {
        let b = PixelBox::from_f32(10.9, 20.7, 30.2, 360.99);
        assert_eq!(b, PixelBox { x1: 10, y1: 20, x2: 30, y2: 360 });
        assert_eq!(b.height(), 340);
    }

    #[test]
    fn test_unbounded_box_saturates() {
        let b = PixelBox::from_f32(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::INFINITY, f32::INFINITY);
        assert_eq!(b.width(), i32::MAX);
        assert_eq!(b.height(), i32::MAX);

        let flipped = PixelBox::from_f32(f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        assert_eq!(flipped.height(), i32::MIN);
    }
}
