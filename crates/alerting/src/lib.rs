//! Alerting System
//!
//! Provides the per-class cooldown gate for proximity alerts and the tone
//! outputs it drives.

mod gate;
mod tone;

pub use gate::{AlertConfig, AlertGate};
pub use tone::{default_tone_sink, BellTone, RecordingTone, SilentTone, Tone, ToneSink};

#[cfg(feature = "audio")]
pub use tone::RodioTone;

use thiserror::Error;

/// Alert output errors. Never surfaced past the gate.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Audio output unavailable: {0}")]
    AudioUnavailable(String),
    #[error("Tone playback failed: {0}")]
    Playback(String),
}
