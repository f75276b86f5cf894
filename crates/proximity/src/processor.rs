//! Frame processor: detect, filter, estimate, alert, annotate

use std::time::Instant;

use alerting::AlertGate;
use camera_capture::VideoFrame;
use inference_engine::ObjectDetector;
use tracing::{debug, trace};

use crate::analysis::{ObjectCounts, ProcessedFrame};
use crate::config::ProximityConfig;
use crate::distance::DistanceEstimator;
use crate::object::{Detection, Highlight, ObjectClass, PixelBox};
use crate::overlay::Overlay;
use crate::ProximityError;

/// Turns raw frames into annotated frames with per-class counts.
///
/// Holds the detector and the alert gate, so one processor serves one session
/// and alert cooldowns persist across frames and sources.
pub struct FrameProcessor {
    config: ProximityConfig,
    detector: Box<dyn ObjectDetector>,
    estimator: DistanceEstimator,
    gate: AlertGate,
    overlay: Overlay,
}

impl FrameProcessor {
    pub fn new(config: ProximityConfig, detector: Box<dyn ObjectDetector>, gate: AlertGate) -> Self {
        debug!("Frame processor using {} detector", detector.name());
        Self {
            estimator: DistanceEstimator::from_config(&config),
            overlay: Overlay::from_config(&config),
            config,
            detector,
            gate,
        }
    }

    /// Process a frame at the current time
    pub fn process(&mut self, frame: &VideoFrame) -> Result<ProcessedFrame, ProximityError> {
        self.process_at(frame, Instant::now())
    }

    /// Process a frame, using `now` for alert cooldowns
    pub fn process_at(&mut self, frame: &VideoFrame, now: Instant) -> Result<ProcessedFrame, ProximityError> {
        let raw = self.detector.detect(frame, self.config.confidence_threshold)?;

        let mut detections = Vec::with_capacity(raw.len());
        for det in raw {
            let Some(class) = ObjectClass::from_label(&det.class_name) else {
                trace!("Skipping {}", det.class_name);
                continue;
            };

            let bbox = PixelBox::from_f32(det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2);
            let distance_m = self.estimator.estimate(bbox.height(), class.as_str());

            // Gate is consulted only for close objects
            let highlight = match distance_m {
                Some(d) if d < self.config.alert_distance_m && self.gate.check(class.as_str(), now) => {
                    Highlight::Alert
                }
                _ => Highlight::Default,
            };

            metrics::counter!("proximity_detections_total", "label" => class.as_str()).increment(1);
            detections.push(Detection {
                class,
                bbox,
                confidence: det.confidence,
                distance_m,
                highlight,
            });
        }

        let annotated = if detections.is_empty() {
            frame.clone()
        } else {
            let mut image = frame.to_image()?;
            for det in &detections {
                self.overlay.draw(&mut image, det);
            }
            frame.with_pixels(image)
        };

        let counts = ObjectCounts::from_detections(&detections);
        trace!("Frame {}: {}", frame.sequence, counts.summary());

        Ok(ProcessedFrame {
            annotated,
            detections,
            counts,
        })
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }
}
