//! Object Detection Engine
//!
//! Runs a pretrained detector over RGB frames. The YOLOv8 backend uses
//! tract-onnx; a scripted mock stands in when no model is configured.

mod coco;
mod detector;
mod mock;
mod yolo;

pub use coco::{class_index, class_name, COCO_CLASSES};
pub use detector::{load_detector, BoundingBox, DetectorConfig, ObjectDetector, RawDetection};
pub use mock::MockDetector;
pub use yolo::YoloDetector;

use thiserror::Error;

/// Errors during detection
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}
