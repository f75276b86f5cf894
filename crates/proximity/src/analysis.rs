//! Per-frame analysis results

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::object::{Detection, Highlight, ObjectClass};

/// Count of kept detections per class, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCounts {
    entries: Vec<(ObjectClass, usize)>,
}

impl ObjectCounts {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut counts = Self::default();
        for det in detections {
            counts.increment(det.class);
        }
        counts
    }

    pub fn increment(&mut self, class: ObjectClass) {
        match self.entries.iter_mut().find(|(c, _)| *c == class) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((class, 1)),
        }
    }

    pub fn get(&self, class: ObjectClass) -> usize {
        self.entries
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Sum over all classes
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectClass, usize)> + '_ {
        self.entries.iter().copied()
    }

    /// `person:2 | car:1`, or `None` when nothing was kept
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            return "None".to_string();
        }
        self.entries
            .iter()
            .map(|(c, n)| format!("{}:{}", c, n))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Input frame with overlays drawn
    pub annotated: VideoFrame,

    /// Kept detections in detector order
    pub detections: Vec<Detection>,

    /// Kept detections per class
    pub counts: ObjectCounts,
}

impl ProcessedFrame {
    /// Detections for which an alert fired on this frame
    pub fn alerts(&self) -> impl Iterator<Item = &Detection> {
        self.detections
            .iter()
            .filter(|d| d.highlight == Highlight::Alert)
    }
}
