//! Capture loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use camera_capture::{CameraError, FrameSource, VideoFrame};
use proximity::{Detection, FrameProcessor, ObjectCounts, ProcessedFrame};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::fps::FpsMeter;
use crate::PipelineError;

/// Capture loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// Terminal
    Stopped,
}

/// Why a capture ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source failed or ran out of frames
    EndOfStream,
    /// A stop was requested
    StopRequested,
    /// The consumer went away
    ConsumerClosed,
}

/// Outcome of a finished capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSummary {
    pub frames: u64,
    pub reason: StopReason,
}

/// One processed frame, handed to the consumer read-only
#[derive(Debug, Clone)]
pub struct FrameResult {
    raw: VideoFrame,
    annotated: VideoFrame,
    fps: f64,
    counts: ObjectCounts,
    detections: Vec<Detection>,
}

impl FrameResult {
    pub(crate) fn new(raw: VideoFrame, processed: ProcessedFrame, fps: f64) -> Self {
        Self {
            raw,
            annotated: processed.annotated,
            fps,
            counts: processed.counts,
            detections: processed.detections,
        }
    }

    pub fn raw(&self) -> &VideoFrame {
        &self.raw
    }

    pub fn annotated(&self) -> &VideoFrame {
        &self.annotated
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn counts(&self) -> &ObjectCounts {
        &self.counts
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }
}

/// Requests a running capture to stop after its current frame
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Reads frames, processes them and publishes the results until the source
/// ends, a stop is requested or the consumer goes away.
pub struct CaptureLoop {
    processor: Arc<Mutex<FrameProcessor>>,
    stop: StopHandle,
    state: LoopState,
}

impl CaptureLoop {
    pub fn new(processor: Arc<Mutex<FrameProcessor>>) -> Self {
        Self {
            processor,
            stop: StopHandle::default(),
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run to completion on the calling thread.
    ///
    /// `publish` returns `false` once the consumer is gone. A loop runs once;
    /// later calls fail with `AlreadyRun`.
    pub fn run<F>(&mut self, source: &mut dyn FrameSource, publish: F) -> Result<CaptureSummary, PipelineError>
    where
        F: FnMut(FrameResult) -> bool,
    {
        if self.state != LoopState::Idle {
            return Err(PipelineError::AlreadyRun);
        }
        self.state = LoopState::Running;
        info!("Capture started: {}", source.describe());

        let result = self.drive(source, publish);
        self.state = LoopState::Stopped;

        match &result {
            Ok(summary) => info!(
                "Capture stopped after {} frames: {:?}",
                summary.frames, summary.reason
            ),
            Err(e) => error!("Capture failed: {}", e),
        }
        result
    }

    fn drive<F>(&mut self, source: &mut dyn FrameSource, mut publish: F) -> Result<CaptureSummary, PipelineError>
    where
        F: FnMut(FrameResult) -> bool,
    {
        let mut fps = FpsMeter::new(Instant::now());
        let mut frames = 0u64;
        let summary = |frames, reason| CaptureSummary { frames, reason };

        loop {
            if self.stop.is_stop_requested() {
                return Ok(summary(frames, StopReason::StopRequested));
            }

            let raw = match source.read_frame() {
                Ok(frame) => frame,
                Err(CameraError::EndOfStream) => {
                    debug!("Source exhausted");
                    return Ok(summary(frames, StopReason::EndOfStream));
                }
                Err(e) => {
                    warn!("Frame read failed, ending capture: {}", e);
                    return Ok(summary(frames, StopReason::EndOfStream));
                }
            };

            let processed = {
                let mut processor = self
                    .processor
                    .lock()
                    .map_err(|_| PipelineError::ProcessorPoisoned)?;
                processor.process(&raw)?
            };

            frames += 1;
            let rate = fps.record(Instant::now());
            metrics::counter!("proximity_frames_total").increment(1);
            metrics::gauge!("proximity_fps").set(rate);

            if !publish(FrameResult::new(raw, processed, rate)) {
                return Ok(summary(frames, StopReason::ConsumerClosed));
            }
        }
    }

    /// Run on a dedicated worker thread.
    ///
    /// Results arrive through a channel holding at most one result, so a slow
    /// consumer stalls the worker.
    pub fn spawn(mut self, mut source: Box<dyn FrameSource>) -> (CaptureHandle, FrameStream) {
        let (tx, rx) = mpsc::channel::<FrameResult>(1);
        let stop = self.stop_handle();

        let worker = std::thread::spawn(move || {
            self.run(source.as_mut(), |result| {
                if tx.blocking_send(result).is_err() {
                    debug!("Frame consumer dropped");
                    return false;
                }
                true
            })
        });

        (
            CaptureHandle {
                stop,
                worker: Some(worker),
            },
            FrameStream { receiver: rx },
        )
    }
}

/// Control side of a spawned capture
pub struct CaptureHandle {
    stop: StopHandle,
    worker: Option<JoinHandle<Result<CaptureSummary, PipelineError>>>,
}

impl CaptureHandle {
    /// Ask the worker to stop; returns immediately
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Block until the worker exits
    pub fn join(mut self) -> Result<CaptureSummary, PipelineError> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| PipelineError::WorkerPanicked)?,
            None => Err(PipelineError::AlreadyRun),
        }
    }

    /// Wait for the worker without blocking the runtime
    pub async fn wait(self) -> Result<CaptureSummary, PipelineError> {
        tokio::task::spawn_blocking(move || self.join())
            .await
            .map_err(|_| PipelineError::WorkerPanicked)?
    }
}

/// Consumer side of a spawned capture
pub struct FrameStream {
    receiver: mpsc::Receiver<FrameResult>,
}

impl FrameStream {
    /// Next result; `None` once the capture has ended
    pub async fn next(&mut self) -> Option<FrameResult> {
        self.receiver.recv().await
    }

    /// Blocking variant for use outside the runtime
    pub fn blocking_next(&mut self) -> Option<FrameResult> {
        self.receiver.blocking_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::AlertGate;
    use inference_engine::{MockDetector, RawDetection};
    use proximity::{ObjectClass, ProximityConfig};
    use std::collections::VecDeque;

    /// Serves prepared frames, then end-of-stream
    struct VecSource {
        frames: VecDeque<VideoFrame>,
    }

    impl VecSource {
        fn new(count: u32) -> Self {
            let frames = (0..count)
                .map(|i| {
                    let mut f = VideoFrame::filled(64, 48, [i as u8, 0, 0]);
                    f.sequence = i;
                    f
                })
                .collect();
            Self { frames }
        }
    }

    impl FrameSource for VecSource {
        fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
            self.frames.pop_front().ok_or(CameraError::EndOfStream)
        }

        fn describe(&self) -> String {
            "test frames".into()
        }
    }

    /// Produces frames forever
    struct EndlessSource;

    impl FrameSource for EndlessSource {
        fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
            Ok(VideoFrame::filled(32, 32, [0, 0, 0]))
        }

        fn describe(&self) -> String {
            "endless".into()
        }
    }

    fn shared(detector: MockDetector) -> Arc<Mutex<FrameProcessor>> {
        Arc::new(Mutex::new(FrameProcessor::new(
            ProximityConfig::default(),
            Box::new(detector),
            AlertGate::default(),
        )))
    }

    #[test]
    fn test_end_of_stream_on_first_read() {
        let mut capture = CaptureLoop::new(shared(MockDetector::empty()));
        assert_eq!(capture.state(), LoopState::Idle);

        let mut published = 0;
        let summary = capture
            .run(&mut VecSource::new(0), |_| {
                published += 1;
                true
            })
            .unwrap();

        assert_eq!(summary, CaptureSummary { frames: 0, reason: StopReason::EndOfStream });
        assert_eq!(published, 0);
        assert_eq!(capture.state(), LoopState::Stopped);
    }

    #[test]
    fn test_publishes_every_frame_in_order() {
        let car = RawDetection::coco("car", [0.0, 0.0, 20.0, 30.0], 0.9);
        let mut capture = CaptureLoop::new(shared(MockDetector::fixed(vec![car])));

        let mut results = Vec::new();
        let summary = capture
            .run(&mut VecSource::new(12), |r| {
                results.push(r);
                true
            })
            .unwrap();

        assert_eq!(summary.frames, 12);
        assert_eq!(results.len(), 12);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.raw().sequence, i as u32);
            assert_eq!(r.counts().get(ObjectClass::Car), 1);
        }
        assert_eq!(results[8].fps(), 0.0);
        assert!(results[9].fps() > 0.0);
        assert_eq!(results[10].fps(), results[9].fps());
    }

    #[test]
    fn test_second_run_rejected() {
        let mut capture = CaptureLoop::new(shared(MockDetector::empty()));
        capture.run(&mut VecSource::new(1), |_| true).unwrap();
        assert!(matches!(
            capture.run(&mut VecSource::new(1), |_| true),
            Err(PipelineError::AlreadyRun)
        ));
    }

    #[test]
    fn test_consumer_closed() {
        let mut capture = CaptureLoop::new(shared(MockDetector::empty()));
        let summary = capture.run(&mut EndlessSource, |_| false).unwrap();
        assert_eq!(summary, CaptureSummary { frames: 1, reason: StopReason::ConsumerClosed });
    }

    #[test]
    fn test_stop_requested_between_frames() {
        let mut capture = CaptureLoop::new(shared(MockDetector::empty()));
        let stop = capture.stop_handle();
        let mut seen = 0;
        let summary = capture
            .run(&mut EndlessSource, |_| {
                seen += 1;
                if seen == 3 {
                    stop.request_stop();
                }
                true
            })
            .unwrap();
        assert_eq!(summary, CaptureSummary { frames: 3, reason: StopReason::StopRequested });
    }

    #[test]
    fn test_detector_failure_stops_loop() {
        let mut capture = CaptureLoop::new(shared(MockDetector::empty().fail_on(2)));
        let mut published = 0;
        let result = capture.run(&mut VecSource::new(5), |_| {
            published += 1;
            true
        });

        assert!(matches!(result, Err(PipelineError::Inference(_))));
        assert_eq!(published, 2);
        assert_eq!(capture.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn test_spawned_capture_streams_results() {
        let capture = CaptureLoop::new(shared(MockDetector::empty()));
        let (handle, mut stream) = capture.spawn(Box::new(VecSource::new(4)));

        let mut received = 0;
        while let Some(result) = stream.next().await {
            assert_eq!(result.raw().sequence, received);
            received += 1;
        }

        assert_eq!(received, 4);
        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.reason, StopReason::EndOfStream);
    }

    #[tokio::test]
    async fn test_spawned_capture_stops_on_request() {
        let capture = CaptureLoop::new(shared(MockDetector::empty()));
        let (handle, mut stream) = capture.spawn(Box::new(EndlessSource));

        assert!(stream.next().await.is_some());
        handle.stop();
        // drain so a worker blocked on a full channel can observe the flag
        while stream.next().await.is_some() {}

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.reason, StopReason::StopRequested);
    }

    #[tokio::test]
    async fn test_dropping_stream_ends_capture() {
        let capture = CaptureLoop::new(shared(MockDetector::empty()));
        let (handle, stream) = capture.spawn(Box::new(EndlessSource));
        drop(stream);

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.reason, StopReason::ConsumerClosed);
    }
}
