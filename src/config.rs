use crate::view::components::Components;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Format templates for every rendered line
    #[serde(default)]
    pub ui: Components,

    /// Redraw interval of both modes
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Log lines kept per vertex for error replay in plain mode
    #[serde(default = "default_error_log_lines")]
    pub error_log_lines: usize,

    /// Minimum gutter width in front of captured terminal output
    #[serde(default = "default_term_pad")]
    pub term_pad: usize,

    /// Used until the terminal reports its size
    #[serde(default = "default_viewport_width")]
    pub viewport_fallback_width: usize,

    #[serde(default = "default_viewport_height")]
    pub viewport_fallback_height: usize,
}

fn default_tick_interval() -> u64 {
    100
}

fn default_error_log_lines() -> usize {
    10
}

fn default_term_pad() -> usize {
    4
}

fn default_viewport_width() -> usize {
    80
}

fn default_viewport_height() -> usize {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ui: Components::default(),
            tick_interval_ms: default_tick_interval(),
            error_log_lines: default_error_log_lines(),
            term_pad: default_term_pad(),
            viewport_fallback_width: default_viewport_width(),
            viewport_fallback_height: default_viewport_height(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.viewport_fallback_width == 0 || self.viewport_fallback_height == 0 {
            return Err(ConfigError::ValidationError(
                "viewport fallback size must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.error_log_lines, 10);
        assert_eq!(config.term_pad, 4);
        assert_eq!(config.ui.vertex_running.as_str(), "=> {0}");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut config = Config::default();
        config.ui.vertex_done = "DONE {0}".into();
        config.save_to_file(&config_path).unwrap();

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{
            "error_log_lines": 3,
            "ui": { "hide_tag": "[internal]" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.error_log_lines, 3);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.ui.hide_tag, "[internal]");
        assert_eq!(config.ui.vertex_done, Components::default().vertex_done);
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(matches!(
            Config::load_from_file(&missing),
            Err(ConfigError::IoError(_))
        ));

        let broken = temp_dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from_file(&broken),
            Err(ConfigError::ParseError(_))
        ));
    }
}
