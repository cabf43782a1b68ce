//! CLI configuration
//!
//! Loaded from a TOML file, `PRICER_*` environment variables and command-line
//! flags, in increasing order of precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::OutputFormat;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pricer.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid output format: {0}. Must be one of: json, table, csv, minimal")]
    InvalidOutput(String),

    #[error("Configuration file error: {0}")]
    FileError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

fn parse_output(s: &str) -> Result<OutputFormat, ConfigError> {
    <OutputFormat as clap::ValueEnum>::from_str(s, true)
        .map_err(|_| ConfigError::InvalidOutput(s.to_string()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricerConfig {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// JSON or YAML rate-table snapshot; built-in schedule when absent
    pub rate_tables: Option<PathBuf>,
    #[serde(deserialize_with = "deserialize_output")]
    pub output: OutputFormat,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

fn deserialize_output<'de, D>(deserializer: D) -> Result<OutputFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_output(&s).map_err(serde::de::Error::custom)
}

impl Default for PricerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            rate_tables: None,
            output: OutputFormat::Json,
        }
    }
}

impl PricerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply `PRICER_*` variables through `lookup`, so tests need not touch
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("PRICER_LOG_LEVEL") {
            self.log_level = LogLevel::from_str(&level)?;
        }
        if let Some(path) = lookup("PRICER_RATE_TABLES") {
            self.rate_tables = Some(PathBuf::from(path));
        }
        if let Some(output) = lookup("PRICER_OUTPUT") {
            self.output = parse_output(&output)?;
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliArgs) -> Result<(), ConfigError> {
        if let Some(level) = &cli.log_level {
            self.log_level = LogLevel::from_str(level)?;
        }
        if let Some(output) = &cli.output {
            self.output = output.clone();
        }
        Ok(())
    }
}

/// Configuration-relevant command-line flags
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub output: Option<OutputFormat>,
}

/// Build configuration from all sources
///
/// Priority (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Config file (`--config`, else `pricer.toml` when present)
/// 4. Default values
pub fn build_config(cli: &CliArgs) -> Result<PricerConfig, ConfigError> {
    build_config_with(cli, |key| std::env::var(key).ok())
}

fn build_config_with<F>(cli: &CliArgs, lookup: F) -> Result<PricerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config_file {
        Some(path) => PricerConfig::from_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                PricerConfig::from_file(default_path)?
            } else {
                PricerConfig::default()
            }
        }
    };

    config.apply_env(lookup)?;
    config.merge_with_cli(cli)?;
    Ok(config)
}
