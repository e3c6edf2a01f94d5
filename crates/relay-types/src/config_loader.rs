//! Layered configuration loading with provenance.
//!
//! The priority chain (later overrides earlier):
//! 1. Built-in defaults ([`RelayConfig::default()`])
//! 2. A config file: the explicit `--config` path (which must exist), or
//!    else `./.relay/config.toml` when present
//! 3. `RELAY_*` environment variables
//! 4. CLI flags ([`ConfigOverrides`])
//!
//! Each field in the final [`EffectiveConfig`] is annotated with the
//! [`ConfigSource`] that determined its value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{RelayConfig, CONFIG_DIR, CONFIG_FILENAME};
use crate::RelayError;

/// Config files larger than this are rejected.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    BuiltinDefault,
    File(PathBuf),
    EnvVar(String),
    CliFlag(String),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::BuiltinDefault => write!(f, "built-in default"),
            ConfigSource::File(p) => write!(f, "file: {}", p.display()),
            ConfigSource::EnvVar(name) => write!(f, "env var: {name}"),
            ConfigSource::CliFlag(name) => write!(f, "CLI flag: {name}"),
        }
    }
}

/// The merged config plus provenance for each field.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub config: RelayConfig,
    /// Dot-separated field path -> the source that determined its value.
    pub sources: HashMap<String, ConfigSource>,
    /// The config file that was loaded, if any.
    pub source_file: Option<PathBuf>,
}

/// Values supplied on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Environment variable to config field mapping.
pub struct EnvMapping {
    pub env_var: &'static str,
    /// Dot-separated TOML path segments.
    pub toml_path: &'static [&'static str],
}

/// All supported `RELAY_*` environment variables.
pub const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        env_var: "RELAY_MODEL",
        toml_path: &["model"],
    },
    EnvMapping {
        env_var: "RELAY_WORKING_DIR",
        toml_path: &["working_dir"],
    },
    EnvMapping {
        env_var: "RELAY_LOG_LEVEL",
        toml_path: &["log", "level"],
    },
    EnvMapping {
        env_var: "RELAY_LOG_FILE",
        toml_path: &["log", "file"],
    },
];

/// Layered configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
    workspace_path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load this file instead of the workspace file. It must exist.
    #[must_use]
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.explicit_path = Some(path);
        self
    }

    /// Override the workspace config file location (for testing).
    #[must_use]
    pub fn with_workspace_path(mut self, path: PathBuf) -> Self {
        self.workspace_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load and merge configuration from all sources.
    pub fn load(&self) -> Result<EffectiveConfig, RelayError> {
        let mut sources = HashMap::new();

        let mut merged = toml::Value::try_from(RelayConfig::default())
            .map_err(|e| RelayError::ConfigError(format!("failed to serialize defaults: {e}")))?;
        record_sources(&merged, &mut sources, ConfigSource::BuiltinDefault);

        let source_file = match &self.explicit_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(RelayError::ConfigError(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.clone())
            }
            None => {
                let path = self
                    .workspace_path
                    .clone()
                    .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILENAME));
                path.is_file().then_some(path)
            }
        };

        if let Some(path) = &source_file {
            let content = read_config_file(path)?;
            let layer: toml::Value = toml::from_str(&content).map_err(|e| {
                RelayError::ConfigError(format!("invalid config file {}: {e}", path.display()))
            })?;
            deep_merge(&mut merged, &layer);
            record_sources(&layer, &mut sources, ConfigSource::File(path.clone()));
        }

        apply_env_overrides(&mut merged, &mut sources)?;
        apply_cli_overrides(&mut merged, &mut sources, &self.overrides);

        let config: RelayConfig = merged
            .try_into()
            .map_err(|e| RelayError::ConfigError(format!("failed to parse merged config: {e}")))?;

        validate_config(&config)?;

        Ok(EffectiveConfig {
            config,
            sources,
            source_file,
        })
    }
}

/// Read a config file with a size limit and a null-byte check.
fn read_config_file(path: &Path) -> Result<String, RelayError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        RelayError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(RelayError::ConfigError(format!(
            "config file {} exceeds maximum size of {} bytes (actual: {} bytes)",
            path.display(),
            MAX_CONFIG_FILE_SIZE,
            metadata.len()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;

    if content.contains('\0') {
        return Err(RelayError::ConfigError(format!(
            "config file {} contains null bytes",
            path.display()
        )));
    }

    Ok(content)
}

/// Deep-merge `overlay` into `base`. Tables merge field by field; any other
/// overlay value replaces the base value.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Record which source contributed each key, nested keys as dotted paths.
fn record_sources(
    layer: &toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
    source: ConfigSource,
) {
    fn walk(
        value: &toml::Value,
        prefix: Option<&str>,
        sources: &mut HashMap<String, ConfigSource>,
        source: &ConfigSource,
    ) {
        if let toml::Value::Table(table) = value {
            for (key, val) in table {
                let path = match prefix {
                    Some(p) => format!("{p}.{key}"),
                    None => key.clone(),
                };
                sources.insert(path.clone(), source.clone());
                walk(val, Some(&path), sources, source);
            }
        }
    }
    walk(layer, None, sources, &source);
}

fn apply_env_overrides(
    merged: &mut toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
) -> Result<(), RelayError> {
    for mapping in ENV_MAPPINGS {
        if let Ok(raw_value) = std::env::var(mapping.env_var) {
            validate_env_value(mapping.env_var, &raw_value)?;
            set_nested_value(merged, mapping.toml_path, toml::Value::String(raw_value));
            sources.insert(
                mapping.toml_path.join("."),
                ConfigSource::EnvVar(mapping.env_var.to_string()),
            );
        }
    }
    Ok(())
}

fn apply_cli_overrides(
    merged: &mut toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
    overrides: &ConfigOverrides,
) {
    let mut apply = |path: &[&str], flag: &str, value: Option<String>| {
        if let Some(value) = value {
            set_nested_value(merged, path, toml::Value::String(value));
            sources.insert(path.join("."), ConfigSource::CliFlag(flag.to_string()));
        }
    };
    let path_value = |p: &PathBuf| p.to_string_lossy().into_owned();

    apply(&["model"], "--model", overrides.model.clone());
    apply(
        &["working_dir"],
        "--directory",
        overrides.working_dir.as_ref().map(path_value),
    );
    apply(&["log", "level"], "--verbose", overrides.log_level.clone());
    apply(
        &["log", "file"],
        "--log-file",
        overrides.log_file.as_ref().map(path_value),
    );
}

/// Reject null bytes and control characters (other than whitespace).
fn validate_env_value(var_name: &str, value: &str) -> Result<(), RelayError> {
    for ch in value.chars() {
        if ch.is_control() && ch != '\t' && ch != '\n' && ch != '\r' {
            return Err(RelayError::ConfigError(format!(
                "environment variable {var_name} contains control character U+{:04X}",
                ch as u32
            )));
        }
    }
    Ok(())
}

/// Set a value at a nested path, creating intermediate tables as needed.
fn set_nested_value(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if let toml::Value::Table(table) = root {
        if rest.is_empty() {
            table.insert(first.to_string(), value);
        } else {
            let entry = table
                .entry(first.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
            set_nested_value(entry, rest, value);
        }
    }
}

fn validate_config(config: &RelayConfig) -> Result<(), RelayError> {
    if config.model.trim().is_empty() {
        return Err(RelayError::ConfigError("model must not be empty".into()));
    }
    if config.log.level.trim().is_empty() {
        return Err(RelayError::ConfigError("log.level must not be empty".into()));
    }
    if let Some(dir) = &config.working_dir {
        validate_path("working_dir", dir)?;
    }
    if let Some(file) = &config.log.file {
        validate_path("log.file", file)?;
    }
    Ok(())
}

fn validate_path(field: &str, path: &Path) -> Result<(), RelayError> {
    let path_str = path.to_string_lossy();
    if path_str.is_empty() {
        return Err(RelayError::ConfigError(format!("{field}: path is empty")));
    }
    if path_str.len() > 4096 {
        return Err(RelayError::ConfigError(format!(
            "{field}: path exceeds maximum length of 4096 characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::session::DEFAULT_MODEL;

    /// Serializes tests that read or write `RELAY_*` variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_relay_env_vars() {
        for mapping in ENV_MAPPINGS {
            std::env::remove_var(mapping.env_var);
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn loader_without_workspace(tmp: &TempDir) -> ConfigLoader {
        ConfigLoader::new().with_workspace_path(tmp.path().join("missing").join(CONFIG_FILENAME))
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();

        let effective = loader_without_workspace(&tmp).load().unwrap();
        assert_eq!(effective.config, RelayConfig::default());
        assert_eq!(effective.sources["model"], ConfigSource::BuiltinDefault);
        assert!(effective.source_file.is_none());
    }

    #[test]
    fn workspace_file_overrides_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
            model = "local/echo"
            [log]
            level = "info"
            "#,
        );

        let effective = ConfigLoader::new()
            .with_workspace_path(path.clone())
            .load()
            .unwrap();
        assert_eq!(effective.config.model, "local/echo");
        assert_eq!(effective.config.log.level, "info");
        assert_eq!(effective.sources["log.level"], ConfigSource::File(path.clone()));
        assert_eq!(effective.source_file, Some(path));
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), r#"model = "file/model""#);

        std::env::set_var("RELAY_MODEL", "env/model");
        std::env::set_var("RELAY_LOG_LEVEL", "debug");
        let effective = ConfigLoader::new()
            .with_config_path(path.clone())
            .load()
            .unwrap();
        assert_eq!(effective.config.model, "env/model");
        assert_eq!(effective.config.log.level, "debug");
        assert_eq!(
            effective.sources["model"],
            ConfigSource::EnvVar("RELAY_MODEL".into())
        );

        let effective = ConfigLoader::new()
            .with_config_path(path)
            .with_overrides(ConfigOverrides {
                model: Some("cli/model".into()),
                ..Default::default()
            })
            .load()
            .unwrap();
        clear_relay_env_vars();
        assert_eq!(effective.config.model, "cli/model");
        assert_eq!(
            effective.sources["model"],
            ConfigSource::CliFlag("--model".into())
        );
        assert_eq!(effective.config.log.level, "debug");
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .with_config_path(tmp.path().join("nope.toml"))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "model = [unterminated");
        let err = ConfigLoader::new().with_config_path(path).load().unwrap_err();
        assert!(matches!(err, RelayError::ConfigError(_)));
    }

    #[test]
    fn empty_model_is_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();
        let err = loader_without_workspace(&tmp)
            .with_overrides(ConfigOverrides {
                model: Some(" ".into()),
                ..Default::default()
            })
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("model must not be empty"));
    }

    #[test]
    fn cli_paths_land_in_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_relay_env_vars();
        let tmp = TempDir::new().unwrap();
        let effective = loader_without_workspace(&tmp)
            .with_overrides(ConfigOverrides {
                working_dir: Some(tmp.path().to_path_buf()),
                log_file: Some(tmp.path().join("relay.log")),
                ..Default::default()
            })
            .load()
            .unwrap();
        assert_eq!(effective.config.working_dir.as_deref(), Some(tmp.path()));
        assert_eq!(effective.config.log.file, Some(tmp.path().join("relay.log")));
        assert_eq!(effective.config.model, DEFAULT_MODEL);
    }
}
