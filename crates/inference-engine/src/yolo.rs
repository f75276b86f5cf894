//! YOLOv8 ONNX backend running on tract

use camera_capture::VideoFrame;
use image::imageops::FilterType;
use tracing::debug;
use tract_onnx::prelude::*;

use crate::coco;
use crate::detector::{BoundingBox, DetectorConfig, ObjectDetector, RawDetection};
use crate::InferenceError;

/// YOLOv8 detector.
///
/// Expects the standard Ultralytics export: input `[1, 3, S, S]` in [0, 1],
/// output `[1, 4 + classes, candidates]` with (cx, cy, w, h) boxes in input
/// pixels followed by per-class scores.
pub struct YoloDetector {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    iou_threshold: f32,
    max_detections: usize,
}

impl YoloDetector {
    /// Load and optimize the model at `path`
    pub fn load(path: &str, config: &DetectorConfig) -> Result<Self, InferenceError> {
        let size = config.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| {
                m.with_input_fact(0, f32::fact([1, 3, size, size]).into())
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path, e)))?;

        Ok(Self {
            model,
            input_size: config.input_size,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        })
    }

    fn build_input(&self, frame: &VideoFrame) -> Result<Tensor, InferenceError> {
        let image = frame
            .to_image()
            .map_err(|e| InferenceError::InvalidFrame(e.to_string()))?;
        let size = self.input_size;
        let resized = image::imageops::resize(&image, size, size, FilterType::Triangle);

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, c, y, x)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        );
        Ok(input.into_tensor())
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&mut self, frame: &VideoFrame, confidence: f32) -> Result<Vec<RawDetection>, InferenceError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(InferenceError::InvalidFrame("empty frame".into()));
        }

        let start = std::time::Instant::now();
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".into()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let scale = (
            frame.width as f32 / self.input_size as f32,
            frame.height as f32 / self.input_size as f32,
        );
        let candidates = decode(view.shape(), |idx| view[&idx[..]], confidence, scale)?;
        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        debug!(
            "YOLO inference: {} boxes in {}ms",
            kept.len(),
            start.elapsed().as_millis()
        );
        Ok(kept)
    }

    fn name(&self) -> &'static str {
        "yolov8"
    }
}

/// Decode raw YOLOv8 output into boxes scaled to frame coordinates.
///
/// `at([0, attr, candidate])` (or `[0, candidate, attr]` for transposed
/// exports) reads one value; the layout is picked from `shape`.
fn decode(
    shape: &[usize],
    at: impl Fn([usize; 3]) -> f32,
    confidence: f32,
    scale: (f32, f32),
) -> Result<Vec<RawDetection>, InferenceError> {
    if shape.len() != 3 || shape[0] != 1 || shape[1].min(shape[2]) <= 4 {
        return Err(InferenceError::InvalidInputShape {
            expected: "[1, 4 + classes, candidates]".into(),
            actual: format!("{:?}", shape),
        });
    }

    let attrs_first = shape[1] < shape[2];
    let (attrs, candidates) = if attrs_first {
        (shape[1], shape[2])
    } else {
        (shape[2], shape[1])
    };
    let get = |attr: usize, i: usize| {
        if attrs_first {
            at([0, attr, i])
        } else {
            at([0, i, attr])
        }
    };

    let mut detections = Vec::new();
    for i in 0..candidates {
        let (class_index, score) = (4..attrs)
            .map(|a| (a - 4, get(a, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score.is_nan() || score < confidence {
            continue;
        }

        let (cx, cy, w, h) = (get(0, i), get(1, i), get(2, i), get(3, i));
        detections.push(RawDetection {
            class_index,
            class_name: coco::class_name(class_index).unwrap_or("object").to_string(),
            bbox: BoundingBox::new(
                (cx - w / 2.0) * scale.0,
                (cy - h / 2.0) * scale.1,
                (cx + w / 2.0) * scale.0,
                (cy + h / 2.0) * scale.1,
            ),
            confidence: score,
        });
    }
    Ok(detections)
}

/// Per-class greedy NMS, highest confidence first
fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32, limit: usize) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for det in detections {
        if kept.len() >= limit {
            break;
        }
        let overlaps = kept
            .iter()
            .any(|k| k.class_index == det.class_index && k.bbox.iou(&det.bbox) > iou_threshold);
        if !overlaps {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[1, 4 + classes, n]` buffer from (cx, cy, w, h, class, score) rows
    fn output(classes: usize, rows: &[(f32, f32, f32, f32, usize, f32)]) -> (Vec<usize>, Vec<f32>) {
        let attrs = 4 + classes;
        let n = rows.len();
        let mut data = vec![0.0; attrs * n];
        for (i, &(cx, cy, w, h, class, score)) in rows.iter().enumerate() {
            data[i] = cx;
            data[n + i] = cy;
            data[2 * n + i] = w;
            data[3 * n + i] = h;
            data[(4 + class) * n + i] = score;
        }
        (vec![1, attrs, n], data)
    }

    fn read<'a>(shape: &[usize], data: &'a [f32]) -> impl Fn([usize; 3]) -> f32 + 'a {
        let (d1, d2) = (shape[1], shape[2]);
        move |[b, i, j]| data[(b * d1 + i) * d2 + j]
    }

    #[test]
    fn test_decode_scales_boxes() {
        // 8 classes x 20 candidates keeps attrs < candidates
        let mut rows = vec![(320.0, 320.0, 64.0, 128.0, 0, 0.9)];
        rows.extend(std::iter::repeat((0.0, 0.0, 0.0, 0.0, 1, 0.01)).take(19));
        let (shape, data) = output(8, &rows);

        let dets = decode(&shape, read(&shape, &data), 0.4, (2.0, 1.0)).unwrap();
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_eq!(d.class_name, "person");
        assert_eq!(d.bbox, BoundingBox::new(576.0, 256.0, 704.0, 384.0));
        assert!((d.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_decode_transposed_layout() {
        // [1, candidates, attrs]: 12 candidates, 3 classes
        let shape = vec![1, 12, 7];
        let mut data = vec![0.0; 12 * 7];
        // candidate 0: car (class 2) at (50, 50, 10, 20)
        data[0..7].copy_from_slice(&[50.0, 50.0, 10.0, 20.0, 0.0, 0.1, 0.8]);
        let dets = decode(&shape, read(&shape, &data), 0.5, (1.0, 1.0)).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name, "car");
        assert_eq!(dets[0].bbox.height(), 20.0);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let data = vec![0.0; 4];
        assert!(decode(&[1, 4], |_| data[0], 0.4, (1.0, 1.0)).is_err());
    }

    #[test]
    fn test_nms_keeps_best_per_class() {
        let dets = vec![
            RawDetection::coco("car", [0.0, 0.0, 10.0, 10.0], 0.6),
            RawDetection::coco("car", [1.0, 1.0, 11.0, 11.0], 0.9),
            RawDetection::coco("person", [1.0, 1.0, 11.0, 11.0], 0.5),
            RawDetection::coco("car", [50.0, 50.0, 60.0, 60.0], 0.7),
        ];
        let kept = non_max_suppression(dets, 0.45, 300);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].confidence, 0.9);
        assert!(kept.iter().any(|d| d.class_name == "person"));
    }

    #[test]
    fn test_nms_limit() {
        let dets = (0..5)
            .map(|i| RawDetection::coco("car", [i as f32 * 20.0, 0.0, i as f32 * 20.0 + 10.0, 10.0], 0.5))
            .collect();
        assert_eq!(non_max_suppression(dets, 0.45, 2).len(), 2);
    }
}
