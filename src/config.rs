use crate::defaults;
use crate::error::{Result, VadPipeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub vad: VadConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    pub threshold: f32,
    pub min_utterance_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::THRESHOLD,
            min_utterance_ms: defaults::MIN_UTTERANCE_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VadPipeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VadPipeError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if the file
    /// doesn't exist.
    ///
    /// Invalid TOML is still an error; only a missing file falls back.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(VadPipeError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Default configuration file path (~/.config/vadpipe/config.toml).
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vadpipe")
            .join("config.toml")
    }

    /// Default configuration file path without the `dirs` lookup.
    #[cfg(not(feature = "cli"))]
    pub fn default_path() -> PathBuf {
        PathBuf::from("vadpipe.toml")
    }

    /// Apply environment variable overrides.
    ///
    /// Supported environment variables:
    /// - VADPIPE_THRESHOLD → vad.threshold
    /// - VADPIPE_MIN_UTTERANCE_MS → vad.min_utterance_ms
    /// - VADPIPE_SAMPLE_RATE → audio.sample_rate
    /// - VADPIPE_AUDIO_DEVICE → audio.device
    ///
    /// Unparseable numeric values are ignored rather than overriding with
    /// garbage; `validate()` still runs on the final result.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(threshold) = std::env::var("VADPIPE_THRESHOLD")
            && let Ok(value) = threshold.parse::<f32>()
        {
            self.vad.threshold = value;
        }

        if let Ok(min_ms) = std::env::var("VADPIPE_MIN_UTTERANCE_MS")
            && let Ok(value) = min_ms.parse::<u32>()
        {
            self.vad.min_utterance_ms = value;
        }

        if let Ok(rate) = std::env::var("VADPIPE_SAMPLE_RATE")
            && let Ok(value) = rate.parse::<u32>()
        {
            self.audio.sample_rate = value;
        }

        if let Ok(device) = std::env::var("VADPIPE_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Validate the configuration, failing fast on malformed values.
    ///
    /// The pipeline never starts with an invalid configuration:
    /// - `threshold` must lie strictly between 0 and 1
    /// - `min_utterance_ms` must be positive
    /// - `sample_rate` must be positive and divisible into whole-millisecond
    ///   frames
    pub fn validate(&self) -> Result<()> {
        if !(self.vad.threshold > 0.0 && self.vad.threshold < 1.0) {
            return Err(VadPipeError::ConfigInvalidValue {
                key: "vad.threshold".to_string(),
                message: format!(
                    "must be between 0 and 1 exclusive, got {}",
                    self.vad.threshold
                ),
            });
        }

        if self.vad.min_utterance_ms == 0 {
            return Err(VadPipeError::ConfigInvalidValue {
                key: "vad.min_utterance_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }

        if self.audio.sample_rate == 0 {
            return Err(VadPipeError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }

        if self.audio.sample_rate % 1000 != 0 {
            return Err(VadPipeError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: format!(
                    "must be a multiple of 1000 Hz for {}ms framing, got {}",
                    defaults::FRAME_MS,
                    self.audio.sample_rate
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.vad.threshold, 0.5);
        assert_eq!(config.vad.min_utterance_ms, 250);
        assert!(config.audio.device.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
            [audio]
            device = "pipewire"
            sample_rate = 8000

            [vad]
            threshold = 0.7
            min_utterance_ms = 500
            "#,
        );

        let config = Config::load(file.path()).expect("load config");
        assert_eq!(config.audio.device.as_deref(), Some("pipewire"));
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.vad.threshold, 0.7);
        assert_eq!(config.vad.min_utterance_ms, 500);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = write_config(
            r#"
            [vad]
            threshold = 0.3
            "#,
        );

        let config = Config::load(file.path()).expect("load config");
        assert_eq!(config.vad.threshold, 0.3);
        assert_eq!(config.vad.min_utterance_ms, 250);
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = Config::load(Path::new("/nonexistent/vadpipe/config.toml"));
        assert!(matches!(
            result,
            Err(VadPipeError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/vadpipe/config.toml"))
            .expect("defaults for missing file");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_invalid_toml_is_error() {
        let file = write_config("not [ valid toml");
        let result = Config::load_or_default(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_threshold_bounds() {
        for bad in [0.0, 1.0, -0.1, 1.5] {
            let config = Config {
                vad: VadConfig {
                    threshold: bad,
                    ..Default::default()
                },
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("vad.threshold"),
                "expected threshold error for {}, got: {}",
                bad,
                err
            );
        }

        for good in [0.001, 0.5, 0.999] {
            let config = Config {
                vad: VadConfig {
                    threshold: good,
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "expected {} to validate", good);
        }
    }

    #[test]
    fn test_validate_min_utterance_ms_positive() {
        let config = Config {
            vad: VadConfig {
                min_utterance_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vad.min_utterance_ms"));
    }

    #[test]
    fn test_validate_sample_rate_positive() {
        let config = Config {
            audio: AudioConfig {
                sample_rate: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("audio.sample_rate"));
    }

    #[test]
    fn test_validate_sample_rate_framing() {
        let config = Config {
            audio: AudioConfig {
                sample_rate: 44100,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multiple of 1000"));
    }

    #[test]
    fn test_env_overrides() {
        // Env vars are process-global; run the combinations in one test to
        // avoid races with parallel test threads.
        // SAFETY: no other test in this binary mutates these variables.
        unsafe {
            std::env::set_var("VADPIPE_THRESHOLD", "0.8");
            std::env::set_var("VADPIPE_MIN_UTTERANCE_MS", "400");
            std::env::set_var("VADPIPE_SAMPLE_RATE", "8000");
            std::env::set_var("VADPIPE_AUDIO_DEVICE", "pulse");
        }

        let config = Config::default().with_env_overrides();
        assert_eq!(config.vad.threshold, 0.8);
        assert_eq!(config.vad.min_utterance_ms, 400);
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.device.as_deref(), Some("pulse"));

        // Unparseable values are ignored
        unsafe {
            std::env::set_var("VADPIPE_THRESHOLD", "not-a-number");
        }
        let config = Config::default().with_env_overrides();
        assert_eq!(config.vad.threshold, defaults::THRESHOLD);

        unsafe {
            std::env::remove_var("VADPIPE_THRESHOLD");
            std::env::remove_var("VADPIPE_MIN_UTTERANCE_MS");
            std::env::remove_var("VADPIPE_SAMPLE_RATE");
            std::env::remove_var("VADPIPE_AUDIO_DEVICE");
        }
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config {
            audio: AudioConfig {
                device: Some("hw:1".to_string()),
                sample_rate: 8000,
            },
            vad: VadConfig {
                threshold: 0.6,
                min_utterance_ms: 300,
            },
        };

        let toml = toml::to_string(&config).expect("serialize");
        let parsed: Config = toml::from_str(&toml).expect("parse");
        assert_eq!(parsed, config);
    }
}
