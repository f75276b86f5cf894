//! Tone outputs

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::AlertError;

/// A beep request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration: Duration,
}

/// Something that can sound a tone. Calls must not block for long.
pub trait ToneSink: Send {
    fn play(&self, tone: Tone) -> Result<(), AlertError>;
}

/// Terminal bell on stderr. Frequency and duration are up to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct BellTone;

impl BellTone {
    fn ring(out: &mut impl Write) -> Result<(), AlertError> {
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|e| AlertError::Playback(e.to_string()))
    }
}

impl ToneSink for BellTone {
    fn play(&self, _tone: Tone) -> Result<(), AlertError> {
        Self::ring(&mut std::io::stderr())
    }
}

/// Discards tones
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentTone;

impl ToneSink for SilentTone {
    fn play(&self, _tone: Tone) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Records tones instead of playing them; clones share the record
#[derive(Debug, Clone, Default)]
pub struct RecordingTone {
    played: Arc<Mutex<Vec<Tone>>>,
}

impl RecordingTone {
    pub fn tones(&self) -> Vec<Tone> {
        self.played.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl ToneSink for RecordingTone {
    fn play(&self, tone: Tone) -> Result<(), AlertError> {
        self.played
            .lock()
            .map_err(|e| AlertError::Playback(e.to_string()))?
            .push(tone);
        Ok(())
    }
}

/// Sine tones through the default audio device.
///
/// The output stream lives on its own thread; `play` only queues the request.
/// Without an output device every request rings the terminal bell instead.
#[cfg(feature = "audio")]
pub struct RodioTone {
    requests: std::sync::mpsc::Sender<Tone>,
}

#[cfg(feature = "audio")]
impl RodioTone {
    pub fn spawn() -> Self {
        use rodio::source::{SineWave, Source};

        let (tx, rx) = std::sync::mpsc::channel::<Tone>();
        std::thread::spawn(move || {
            let (_stream, handle) = match rodio::OutputStream::try_default() {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!("No audio output, falling back to terminal bell: {}", e);
                    for tone in rx {
                        if let Err(e) = BellTone.play(tone) {
                            tracing::debug!("Bell failed: {}", e);
                        }
                    }
                    return;
                }
            };
            for tone in rx {
                match rodio::Sink::try_new(&handle) {
                    Ok(sink) => {
                        sink.append(
                            SineWave::new(tone.frequency_hz as f32)
                                .take_duration(tone.duration)
                                .amplify(0.25),
                        );
                        sink.sleep_until_end();
                    }
                    Err(e) => tracing::debug!("Audio sink unavailable: {}", e),
                }
            }
        });
        Self { requests: tx }
    }
}

#[cfg(feature = "audio")]
impl ToneSink for RodioTone {
    fn play(&self, tone: Tone) -> Result<(), AlertError> {
        self.requests
            .send(tone)
            .map_err(|e| AlertError::AudioUnavailable(e.to_string()))
    }
}

/// Best tone output available in this build
pub fn default_tone_sink() -> Box<dyn ToneSink> {
    #[cfg(feature = "audio")]
    {
        Box::new(RodioTone::spawn())
    }
    #[cfg(not(feature = "audio"))]
    {
        Box::new(BellTone)
    }
}
