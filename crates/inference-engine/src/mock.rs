//! Scripted detector for tests and model-less runs

use std::collections::VecDeque;

use camera_capture::VideoFrame;
use tracing::debug;

use crate::detector::{ObjectDetector, RawDetection};
use crate::InferenceError;

/// Returns prepared detections instead of running a model.
///
/// Scripted frames are consumed in order; once exhausted every call returns
/// the fallback set. Boxes below the requested confidence are dropped, as a
/// real backend would.
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
    script: VecDeque<Vec<RawDetection>>,
    fallback: Vec<RawDetection>,
    fail_on_call: Option<usize>,
    calls: usize,
}

impl MockDetector {
    /// Detects nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Same detections on every frame
    pub fn fixed(detections: Vec<RawDetection>) -> Self {
        Self {
            fallback: detections,
            ..Self::default()
        }
    }

    /// One detection set per frame, then nothing
    pub fn scripted(frames: Vec<Vec<RawDetection>>) -> Self {
        Self {
            script: frames.into(),
            ..Self::default()
        }
    }

    /// Fail with an inference error on the given call (0-based)
    pub fn fail_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl ObjectDetector for MockDetector {
    fn detect(&mut self, frame: &VideoFrame, confidence: f32) -> Result<Vec<RawDetection>, InferenceError> {
        let call = self.calls;
        self.calls += 1;

        if self.fail_on_call == Some(call) {
            return Err(InferenceError::InferenceFailed(format!(
                "scripted failure on frame {}",
                frame.sequence
            )));
        }

        let detections = self.script.pop_front().unwrap_or_else(|| self.fallback.clone());
        let kept: Vec<RawDetection> = detections
            .into_iter()
            .filter(|d| d.confidence >= confidence)
            .collect();
        debug!("Mock detector returned {} boxes", kept.len());
        Ok(kept)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> VideoFrame {
        VideoFrame::filled(4, 4, [0, 0, 0])
    }

    #[test]
    fn test_scripted_then_empty() {
        let mut detector = MockDetector::scripted(vec![vec![RawDetection::coco(
            "car",
            [0.0, 0.0, 2.0, 2.0],
            0.9,
        )]]);
        assert_eq!(detector.detect(&frame(), 0.4).unwrap().len(), 1);
        assert!(detector.detect(&frame(), 0.4).unwrap().is_empty());
    }

    #[test]
    fn test_confidence_filter() {
        let mut detector = MockDetector::fixed(vec![
            RawDetection::coco("car", [0.0, 0.0, 2.0, 2.0], 0.9),
            RawDetection::coco("dog", [0.0, 0.0, 2.0, 2.0], 0.3),
        ]);
        let kept = detector.detect(&frame(), 0.4).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_name, "car");
    }

    #[test]
    fn test_fail_on_call() {
        let mut detector = MockDetector::empty().fail_on(1);
        assert!(detector.detect(&frame(), 0.4).is_ok());
        assert!(matches!(
            detector.detect(&frame(), 0.4),
            Err(InferenceError::InferenceFailed(_))
        ));
        assert!(detector.detect(&frame(), 0.4).is_ok());
    }
}
