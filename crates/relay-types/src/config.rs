//! Configuration for a relay invocation.
//!
//! [`RelayConfig`] is the merged result of built-in defaults, an optional
//! TOML file, `RELAY_*` environment variables, and CLI flags (see
//! [`crate::config_loader`]).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_MODEL;

/// Directory holding the workspace-level config file.
pub const CONFIG_DIR: &str = ".relay";

/// Name of the config file inside [`CONFIG_DIR`].
pub const CONFIG_FILENAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Model label reported on the session and in the request summary.
    pub model: String,
    /// Directory tools resolve relative paths against. Defaults to the
    /// process working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    pub log: LogConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            working_dir: None,
            log: LogConfig::default(),
        }
    }
}

/// Diagnostic logging. Logs never go to stdout, which carries the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `"warn"` or `"relay_tools=debug"`.
    pub level: String,
    /// Write logs to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}
