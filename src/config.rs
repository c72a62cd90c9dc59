//! Configuration for the audio bridge
//!
//! Stream parameters, the JVM method the callback pulls samples from and
//! logging verbosity can be overridden from a JSON file. Every field has a
//! default matching the values the emulator front-end was built against, so
//! a missing or broken file never prevents audio from starting.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

/// Output stream performance hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    None,
    LowLatency,
    PowerSaving,
}

/// Output stream usage attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamUsage {
    Game,
    Media,
}

/// Audio engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Largest buffer accepted from the producer per callback, in mono samples
    pub buffer_capacity: usize,
    pub performance_mode: PerformanceMode,
    pub usage: StreamUsage,
    /// Request an exclusive (non-mixed) stream
    pub exclusive: bool,
    /// Log a failing sample source once every N failed periods
    pub log_every_n_failures: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            // Matches the emulator's AudioBuffer size
            buffer_capacity: 2048,
            performance_mode: PerformanceMode::None,
            usage: StreamUsage::Game,
            exclusive: true,
            log_every_n_failures: 500,
        }
    }
}

/// Where the callback fetches the next buffer from on the JVM side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Binary class name, slash separated
    pub activity_class: String,
    /// Static method returning the next buffer
    pub buffer_method: String,
    pub buffer_method_signature: String,
    /// Periods to skip after a failed class or method lookup
    pub lookup_retry_periods: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            activity_class: "com/felipecsl/knes/app/MainActivity".to_string(),
            buffer_method: "audioBuffer".to_string(),
            buffer_method_signature: "()[F".to_string(),
            lookup_retry_periods: 100,
        }
    }
}

impl BridgeConfig {
    /// Class name in the dotted form `ClassLoader.loadClass` expects
    pub fn activity_class_dotted(&self) -> String {
        self.activity_class.replace('/', ".")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Android log tag
    pub tag: String,
    /// One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            tag: "KTNES".to_string(),
            level: "debug".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Debug)
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file cannot be read
    /// or parsed. Missing fields take their default values.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Configuration used by the JNI library
    ///
    /// The library is loaded before any asset access is possible, so the
    /// defaults are used.
    #[cfg(target_os = "android")]
    pub fn load_android() -> Self {
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/audio_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.buffer_capacity, 2048);
        assert_eq!(config.audio.performance_mode, PerformanceMode::None);
        assert_eq!(config.audio.usage, StreamUsage::Game);
        assert!(config.audio.exclusive);
        assert_eq!(config.bridge.buffer_method_signature, "()[F");
        assert_eq!(config.bridge.lookup_retry_periods, 100);
        assert_eq!(config.logging.tag, "KTNES");
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = AppConfig::default();
        config.audio.performance_mode = PerformanceMode::LowLatency;
        config.audio.buffer_capacity = 512;

        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "audio": { "performance_mode": "power_saving" } }"#)
                .unwrap();

        assert_eq!(parsed.audio.performance_mode, PerformanceMode::PowerSaving);
        assert_eq!(parsed.audio.buffer_capacity, 2048);
        assert_eq!(parsed.bridge, BridgeConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/ktnes/audio_config.json");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "logging": {{ "tag": "EMU", "level": "warn" }} }}"#).unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.logging.tag, "EMU");
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_level_filter_fallback() {
        let logging = LoggingConfig {
            tag: "KTNES".to_string(),
            level: "chatty".to_string(),
        };
        assert_eq!(logging.level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_activity_class_dotted() {
        let bridge = BridgeConfig::default();
        assert_eq!(
            bridge.activity_class_dotted(),
            "com.felipecsl.knes.app.MainActivity"
        );
    }
}
