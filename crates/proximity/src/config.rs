//! Proximity configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proximity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    /// Detector confidence threshold
    pub confidence_threshold: f32,

    /// Objects closer than this trigger the alert gate (meters)
    pub alert_distance_m: f64,

    /// Focal length constant shared by every source (pixels)
    pub focal_length: f64,

    /// Assumed real-world height per class label (meters)
    pub reference_heights: BTreeMap<String, f64>,

    /// Box outline thickness (pixels)
    pub box_thickness: u32,

    /// Label text height (pixels)
    pub label_scale: f32,

    /// TrueType font for labels, overriding the bundled DejaVu Sans
    pub font_path: Option<String>,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        let reference_heights = [
            ("person", 1.7),
            ("bicycle", 1.2),
            ("car", 1.5),
            ("motorcycle", 1.1),
            ("bus", 3.0),
            ("truck", 3.5),
            ("traffic light", 3.0),
            ("stop sign", 2.5),
        ]
        .into_iter()
        .map(|(label, h)| (label.to_string(), h))
        .collect();

        Self {
            confidence_threshold: 0.4,
            alert_distance_m: 5.0,
            focal_length: 600.0,
            reference_heights,
            box_thickness: 3,
            label_scale: 18.0,
            font_path: None,
        }
    }
}
