//! Windowed frame rate

use std::time::Instant;

/// Frames per FPS window
pub const FPS_WINDOW: u32 = 10;

/// Frame rate recomputed once per window of frames.
///
/// Between recomputations the last value is reported; before the first full
/// window it is 0.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: u32,
    frames: u32,
    window_start: Instant,
    fps: f64,
}

impl FpsMeter {
    pub fn new(start: Instant) -> Self {
        Self::with_window(start, FPS_WINDOW)
    }

    pub fn with_window(start: Instant, window: u32) -> Self {
        Self {
            window: window.max(1),
            frames: 0,
            window_start: start,
            fps: 0.0,
        }
    }

    /// Count one frame finished at `now` and return the current rate
    pub fn record(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        if self.frames >= self.window {
            let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
            if elapsed > 0.0 {
                self.fps = self.frames as f64 / elapsed;
            }
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}
