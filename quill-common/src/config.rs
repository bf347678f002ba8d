//! Configuration loading for the Quill bridge
//!
//! Configuration is a single TOML file with two tables:
//! - `[logging]` - log level for the tracing subscriber
//! - `[bridge]` - transfer bridge tuning (cooldown, retries, hydration wait, scoring)
//!
//! # Resolution priority
//! 1. Explicit path supplied by the host application
//! 2. `QUILL_CONFIG` environment variable
//! 3. `<config_dir>/quill/bridge.toml` (platform config directory)
//! 4. Compiled defaults
//!
//! A missing file is never fatal: a warning is logged and defaults are used.
//! A file that exists but fails to parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "QUILL_CONFIG";
/// Environment override for `bridge.cooldown_ms`
pub const COOLDOWN_ENV: &str = "QUILL_COOLDOWN_MS";
/// Environment override for `bridge.tolerant_mode`
pub const TOLERANT_MODE_ENV: &str = "QUILL_TOLERANT_MODE";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transfer bridge settings (optional)
    #[serde(default)]
    pub bridge: BridgeSettings,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Transfer bridge settings
///
/// Every value has a compiled default. The heuristic constants (pass threshold,
/// prefix check length, tolerant mode) are kept as named settings so hosts can
/// tune them without touching the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Minimum spacing between the end of one transfer and the start of the next
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Attempts for the update-apply step (first attempt included)
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Base delay for linear apply backoff (`retry_delay_ms * attempt`)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound on waiting for the Form domain to hydrate
    #[serde(default = "default_hydration_wait_ms")]
    pub hydration_wait_ms: u64,

    /// First readiness poll delay
    #[serde(default = "default_hydration_initial_backoff_ms")]
    pub hydration_initial_backoff_ms: u64,

    /// Readiness poll backoff multiplier
    #[serde(default = "default_hydration_backoff_factor")]
    pub hydration_backoff_factor: f64,

    /// Readiness poll delay cap
    #[serde(default = "default_hydration_max_backoff_ms")]
    pub hydration_max_backoff_ms: u64,

    /// Capability resolution attempts
    #[serde(default = "default_resolve_attempts")]
    pub resolve_attempts: u32,

    /// Spacing after the first failed resolution attempt
    #[serde(default = "default_resolve_spacing_ms")]
    pub resolve_spacing_ms: u64,

    /// Added spacing for each further resolution attempt
    #[serde(default = "default_resolve_spacing_step_ms")]
    pub resolve_spacing_step_ms: u64,

    /// Validation score (0-100) at or above which a transfer succeeds
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,

    /// Number of leading characters of the expected document checked for containment
    #[serde(default = "default_prefix_check_len")]
    pub prefix_check_len: usize,

    /// Record the validation score but never fail a transfer on it
    #[serde(default)]
    pub tolerant_mode: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            hydration_wait_ms: default_hydration_wait_ms(),
            hydration_initial_backoff_ms: default_hydration_initial_backoff_ms(),
            hydration_backoff_factor: default_hydration_backoff_factor(),
            hydration_max_backoff_ms: default_hydration_max_backoff_ms(),
            resolve_attempts: default_resolve_attempts(),
            resolve_spacing_ms: default_resolve_spacing_ms(),
            resolve_spacing_step_ms: default_resolve_spacing_step_ms(),
            pass_threshold: default_pass_threshold(),
            prefix_check_len: default_prefix_check_len(),
            tolerant_mode: false,
        }
    }
}

impl BridgeSettings {
    /// Reject settings the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pass_threshold > 100 {
            return Err(Error::Config(format!(
                "bridge.pass_threshold must be within 0-100, got {}",
                self.pass_threshold
            )));
        }
        if self.max_retry_attempts == 0 {
            return Err(Error::Config(
                "bridge.max_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.resolve_attempts == 0 {
            return Err(Error::Config(
                "bridge.resolve_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.hydration_backoff_factor >= 1.0) {
            return Err(Error::Config(format!(
                "bridge.hydration_backoff_factor must be >= 1.0, got {}",
                self.hydration_backoff_factor
            )));
        }
        Ok(())
    }

    /// Apply `QUILL_COOLDOWN_MS` / `QUILL_TOLERANT_MODE` overrides
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(COOLDOWN_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => {
                    info!(cooldown_ms = ms, "Cooldown overridden from environment");
                    self.cooldown_ms = ms;
                }
                Err(_) => warn!("Ignoring invalid {}: {:?}", COOLDOWN_ENV, raw),
            }
        }

        if let Ok(raw) = std::env::var(TOLERANT_MODE_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.tolerant_mode = true,
                "0" | "false" | "no" | "off" => self.tolerant_mode = false,
                _ => warn!("Ignoring invalid {}: {:?}", TOLERANT_MODE_ENV, raw),
            }
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_hydration_wait_ms() -> u64 {
    3000
}

fn default_hydration_initial_backoff_ms() -> u64 {
    50
}

fn default_hydration_backoff_factor() -> f64 {
    1.5
}

fn default_hydration_max_backoff_ms() -> u64 {
    200
}

fn default_resolve_attempts() -> u32 {
    3
}

fn default_resolve_spacing_ms() -> u64 {
    100
}

fn default_resolve_spacing_step_ms() -> u64 {
    50
}

fn default_pass_threshold() -> u8 {
    60
}

fn default_prefix_check_len() -> usize {
    50
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no candidate exists; callers fall back to defaults.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: explicit path from the host
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config directory
    let default_path = default_config_path()?;
    default_path.exists().then_some(default_path)
}

/// `<config_dir>/quill/bridge.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quill").join("bridge.toml"))
}

/// Load a TOML config file
///
/// Missing file → warning + defaults. Parse failure → `Error::Config`.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found: {} (using compiled defaults)",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve, load, apply environment overrides and validate
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => load_toml_config(&path)?,
        None => {
            info!("No config file found, using compiled defaults");
            TomlConfig::default()
        }
    };

    config.bridge.apply_env_overrides();
    config.bridge.validate()?;
    Ok(config)
}

/// Write a TOML config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
