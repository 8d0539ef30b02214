//! Service configuration.
//!
//! Values come from defaults, an optional YAML or JSON file, and
//! `FREIGHTLINE_*` environment variables, in that order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::DEFAULT_STAGE_PREFIX_MAX;
use crate::errors::{FreightlineError, Result};

/// Environment variable overriding [`ServiceConfig::fan_out_concurrency`].
pub const ENV_FAN_OUT_CONCURRENCY: &str = "FREIGHTLINE_FAN_OUT_CONCURRENCY";
/// Environment variable overriding [`LogConfig::level`].
pub const ENV_LOG_LEVEL: &str = "FREIGHTLINE_LOG_LEVEL";
/// Environment variable overriding [`LogConfig::format`].
pub const ENV_LOG_FORMAT: &str = "FREIGHTLINE_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = FreightlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(FreightlineError::invalid_argument(format!(
                "unknown log format {other:?}"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `freightline=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Configuration for [`FreightService`](crate::service::FreightService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Maximum Promotion creations in flight during a fan-out.
    #[serde(default = "default_fan_out_concurrency")]
    pub fan_out_concurrency: usize,
    /// Maximum length of the Stage-name prefix in generated Promotion names.
    ///
    /// Kept within `1..=DEFAULT_STAGE_PREFIX_MAX` so generated names stay valid.
    #[serde(default = "default_promotion_name_prefix_max")]
    pub promotion_name_prefix_max: usize,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

fn default_fan_out_concurrency() -> usize {
    4
}

fn default_promotion_name_prefix_max() -> usize {
    DEFAULT_STAGE_PREFIX_MAX
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fan_out_concurrency: default_fan_out_concurrency(),
            promotion_name_prefix_max: default_promotion_name_prefix_max(),
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration file. YAML and JSON are both accepted.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FreightlineError::Internal(format!("read config {}: {e}", path.display()))
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|e| {
            FreightlineError::invalid_argument(format!("parse config {}: {e}", path.display()))
        })?;
        Ok(config.normalized())
    }

    /// Builds a configuration from defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Overlays `FREIGHTLINE_*` values produced by `lookup`.
    pub fn overlay_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_FAN_OUT_CONCURRENCY) {
            self.fan_out_concurrency = raw.trim().parse().map_err(|_| {
                FreightlineError::invalid_argument(format!(
                    "{ENV_FAN_OUT_CONCURRENCY} must be a positive integer, got {raw:?}"
                ))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log.format = format.parse()?;
        }
        Ok(self.normalized())
    }

    /// Sets the fan-out concurrency (minimum 1).
    #[must_use]
    pub fn with_fan_out_concurrency(mut self, n: usize) -> Self {
        self.fan_out_concurrency = n.max(1);
        self
    }

    /// Sets the Promotion name prefix limit, clamped to `1..=DEFAULT_STAGE_PREFIX_MAX`.
    #[must_use]
    pub fn with_promotion_name_prefix_max(mut self, n: usize) -> Self {
        self.promotion_name_prefix_max = clamp_prefix_max(n);
        self
    }

    /// Sets the log configuration.
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    fn normalized(mut self) -> Self {
        self.fan_out_concurrency = self.fan_out_concurrency.max(1);
        self.promotion_name_prefix_max = clamp_prefix_max(self.promotion_name_prefix_max);
        self
    }
}

fn clamp_prefix_max(n: usize) -> usize {
    n.clamp(1, DEFAULT_STAGE_PREFIX_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.fan_out_concurrency, 4);
        assert_eq!(config.promotion_name_prefix_max, 212);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_from_yaml_file_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fan_out_concurrency: 0\nlog:\n  format: json").unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fan_out_concurrency, 1);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"promotion_name_prefix_max": 40}}"#).unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.promotion_name_prefix_max, 40);
        assert_eq!(config.fan_out_concurrency, 4);
    }

    #[test]
    fn test_missing_file() {
        let err = ServiceConfig::from_file("/nonexistent/freightline.yaml").unwrap_err();
        assert!(err.to_string().contains("read config"));
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [
            (ENV_FAN_OUT_CONCURRENCY, "8"),
            (ENV_LOG_LEVEL, "freightline=debug"),
            (ENV_LOG_FORMAT, "JSON"),
        ]
        .into_iter()
        .collect();

        let config = ServiceConfig::default()
            .overlay_env(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.fan_out_concurrency, 8);
        assert_eq!(config.log.level, "freightline=debug");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_env_overlay_rejects_garbage() {
        let err = ServiceConfig::default()
            .overlay_env(|k| (k == ENV_FAN_OUT_CONCURRENCY).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_FAN_OUT_CONCURRENCY));
    }

    #[test]
    fn test_builder() {
        let config = ServiceConfig::new()
            .with_fan_out_concurrency(0)
            .with_promotion_name_prefix_max(10);
        assert_eq!(config.fan_out_concurrency, 1);
        assert_eq!(config.promotion_name_prefix_max, 10);
    }

    #[test]
    fn test_prefix_max_is_clamped() {
        let config = ServiceConfig::new().with_promotion_name_prefix_max(1000);
        assert_eq!(config.promotion_name_prefix_max, DEFAULT_STAGE_PREFIX_MAX);
        let config = ServiceConfig::new().with_promotion_name_prefix_max(0);
        assert_eq!(config.promotion_name_prefix_max, 1);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "promotion_name_prefix_max: 4096").unwrap();
        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.promotion_name_prefix_max, DEFAULT_STAGE_PREFIX_MAX);
    }
}
