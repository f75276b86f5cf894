//! Monocular distance estimation (pinhole model)

use std::collections::BTreeMap;

use crate::config::ProximityConfig;

/// Estimates distance from the pixel height of a box of known real height
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    focal_length: f64,
    reference_heights: BTreeMap<String, f64>,
}

impl DistanceEstimator {
    pub fn new(focal_length: f64, reference_heights: BTreeMap<String, f64>) -> Self {
        Self {
            focal_length,
            reference_heights,
        }
    }

    pub fn from_config(config: &ProximityConfig) -> Self {
        Self::new(config.focal_length, config.reference_heights.clone())
    }

    /// Reference height for `label` (meters)
    pub fn reference_height(&self, label: &str) -> Option<f64> {
        self.reference_heights.get(label).copied()
    }

    /// Distance in meters, rounded to centimeters.
    ///
    /// `None` when the label has no reference height or the box has no height.
    pub fn estimate(&self, pixel_height: i32, label: &str) -> Option<f64> {
        if pixel_height <= 0 {
            return None;
        }
        let real_height = self.reference_height(label)?;
        Some(round_cm(real_height * self.focal_length / pixel_height as f64))
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::from_config(&ProximityConfig::default())
    }
}

fn round_cm(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}
