//! Detector contract shared by all backends

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coco;
use crate::mock::MockDetector;
use crate::yolo::YoloDetector;
use crate::InferenceError;

/// Axis-aligned box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = BoundingBox::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        )
        .area();
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One box returned by a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Index into the model's class table
    pub class_index: usize,
    /// Class name from the model's class table
    pub class_name: String,
    pub bbox: BoundingBox,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,
}

impl RawDetection {
    /// Build a detection for a COCO class name
    pub fn coco(class_name: &str, bbox: [f32; 4], confidence: f32) -> Self {
        Self {
            class_index: coco::class_index(class_name).unwrap_or(usize::MAX),
            class_name: class_name.to_string(),
            bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
            confidence,
        }
    }
}

/// A pretrained object detector
pub trait ObjectDetector: Send {
    /// Detect objects in `frame`, keeping only boxes scoring at least `confidence`
    fn detect(&mut self, frame: &VideoFrame, confidence: f32) -> Result<Vec<RawDetection>, InferenceError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to a YOLOv8 ONNX export; `None` runs the mock detector
    pub model_path: Option<String>,
    /// Square model input size
    pub input_size: u32,
    /// IoU above which overlapping boxes of one class are suppressed
    pub iou_threshold: f32,
    /// Maximum boxes returned per frame
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: Some("yolov8n.onnx".to_string()),
            input_size: 640,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Build the detector described by `config`
pub fn load_detector(config: &DetectorConfig) -> Result<Box<dyn ObjectDetector>, InferenceError> {
    match &config.model_path {
        Some(path) => {
            let detector = YoloDetector::load(path, config)?;
            info!("Loaded {} detector from {}", detector.name(), path);
            Ok(Box::new(detector))
        }
        None => {
            warn!("No detection model configured. Using mock detector.");
            Ok(Box::new(MockDetector::empty()))
        }
    }
}
