//! Layered settings: defaults, optional TOML file, `PROXIMITY_*` environment

use std::path::Path;

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use config::{Config, ConfigError, Environment, File};
use inference_engine::DetectorConfig;
use proximity::ProximityConfig;
use serde::{Deserialize, Serialize};

/// Settings file read when no `--config` is given; may be absent
pub const DEFAULT_CONFIG_FILE: &str = "proximity.toml";

/// Environment variable prefix; nested keys use `__`, e.g.
/// `PROXIMITY_PROXIMITY__ALERT_DISTANCE_M=4.5`
pub const ENV_PREFIX: &str = "PROXIMITY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// trace, debug, info, warn or error
    pub log_level: String,

    /// Prometheus listener address; no exporter when unset
    pub metrics_addr: Option<String>,

    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub alert: AlertConfig,
    pub proximity: ProximityConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_addr: None,
            camera: CameraConfig::default(),
            detector: DetectorConfig::default(),
            alert: AlertConfig::default(),
            proximity: ProximityConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; the default file may not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Path::new(DEFAULT_CONFIG_FILE).to_path_buf(), false),
        };

        Config::builder()
            .add_source(File::from(file).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
