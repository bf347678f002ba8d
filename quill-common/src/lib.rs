//! # Quill Common Library
//!
//! Shared code for the Quill editor bridge crates:
//! - Error type and result alias
//! - TOML configuration loading (logging + bridge settings)
//! - Tracing subscriber bootstrap
//! - Time utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::{BridgeSettings, LoggingConfig, TomlConfig};
pub use error::{Error, Result};
