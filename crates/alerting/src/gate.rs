//! Alert Gate Implementation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::tone::{Tone, ToneSink};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two alerts for the same class (milliseconds)
    pub cooldown_ms: u64,
    /// Alert tone frequency (Hz)
    pub tone_frequency_hz: u32,
    /// Alert tone duration (milliseconds)
    pub tone_duration_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 2000,
            tone_frequency_hz: 1000,
            tone_duration_ms: 200,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn tone(&self) -> Tone {
        Tone {
            frequency_hz: self.tone_frequency_hz,
            duration: Duration::from_millis(self.tone_duration_ms),
        }
    }
}

/// Cooldown filter for proximity alerts.
///
/// Keeps one last-fired instant per label. One gate lives for a whole session,
/// so the map holds at most one entry per class that ever alerted.
pub struct AlertGate {
    config: AlertConfig,
    last_fired: HashMap<String, Instant>,
    tone: Box<dyn ToneSink>,
}

impl AlertGate {
    /// Create a new alert gate
    pub fn new(config: AlertConfig, tone: Box<dyn ToneSink>) -> Self {
        info!("Creating alert gate with config: {:?}", config);
        Self {
            config,
            last_fired: HashMap::new(),
            tone,
        }
    }

    /// Decide whether `label` alerts at `now`, and sound the tone if it does.
    ///
    /// Fires when the label has never fired or its last alert is at least one
    /// cooldown old. Tone output failures are logged and otherwise ignored.
    pub fn check(&mut self, label: &str, now: Instant) -> bool {
        if let Some(&last) = self.last_fired.get(label) {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.cooldown() {
                debug!("Alert suppressed: {} in cooldown ({}ms elapsed)", label, elapsed.as_millis());
                return false;
            }
        }

        self.last_fired.insert(label.to_string(), now);
        metrics::counter!("proximity_alerts_total", "label" => label.to_string()).increment(1);
        info!("Proximity alert: {}", label);

        if let Err(e) = self.tone.play(self.config.tone()) {
            debug!("Alert tone not played: {}", e);
        }
        true
    }

    /// Last time `label` fired
    pub fn last_fired(&self, label: &str) -> Option<Instant> {
        self.last_fired.get(label).copied()
    }

    /// Number of labels with a recorded alert
    pub fn tracked(&self) -> usize {
        self.last_fired.len()
    }

    /// Forget all alert history
    pub fn clear(&mut self) {
        self.last_fired.clear();
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

impl Default for AlertGate {
    fn default() -> Self {
        Self::new(AlertConfig::default(), Box::new(crate::tone::SilentTone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::RecordingTone;
    use crate::AlertError;

    fn recording_gate() -> (AlertGate, RecordingTone) {
        let recorder = RecordingTone::default();
        (AlertGate::new(AlertConfig::default(), Box::new(recorder.clone())), recorder)
    }

    #[test]
    fn test_first_alert_fires() {
        let (mut gate, tones) = recording_gate();
        assert!(gate.check("person", Instant::now()));
        assert_eq!(
            tones.tones(),
            vec![Tone {
                frequency_hz: 1000,
                duration: Duration::from_millis(200)
            }]
        );
    }

    #[test]
    fn test_cooldown_suppresses_repeat() {
        let (mut gate, tones) = recording_gate();
        let t0 = Instant::now();

        assert!(gate.check("person", t0));
        assert!(!gate.check("person", t0 + Duration::from_millis(1999)));
        assert_eq!(tones.tones().len(), 1);
        // suppressed calls do not move the window
        assert_eq!(gate.last_fired("person"), Some(t0));
    }

    #[test]
    fn test_fires_again_after_cooldown() {
        let (mut gate, tones) = recording_gate();
        let t0 = Instant::now();

        assert!(gate.check("car", t0));
        assert!(gate.check("car", t0 + Duration::from_secs(2)));
        assert!(gate.check("car", t0 + Duration::from_secs(5)));
        assert_eq!(tones.tones().len(), 3);
    }

    #[test]
    fn test_labels_are_independent() {
        let (mut gate, _) = recording_gate();
        let t0 = Instant::now();

        assert!(gate.check("car", t0));
        assert!(gate.check("person", t0 + Duration::from_millis(10)));
        assert!(!gate.check("car", t0 + Duration::from_millis(20)));
        assert_eq!(gate.tracked(), 2);
    }

    #[test]
    fn test_tone_failure_is_not_fatal() {
        struct Broken;
        impl ToneSink for Broken {
            fn play(&self, _tone: Tone) -> Result<(), AlertError> {
                Err(AlertError::AudioUnavailable("no device".into()))
            }
        }

        let mut gate = AlertGate::new(AlertConfig::default(), Box::new(Broken));
        assert!(gate.check("bus", Instant::now()));
        assert_eq!(gate.tracked(), 1);
    }

    #[test]
    fn test_clear() {
        let (mut gate, _) = recording_gate();
        let t0 = Instant::now();
        gate.check("truck", t0);
        gate.clear();
        assert!(gate.check("truck", t0 + Duration::from_millis(1)));
    }
}
