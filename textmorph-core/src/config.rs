//! Configuration system for textmorph.
//!
//! Uses `figment` for layered configuration: defaults, then user config,
//! then workspace config, then `TEXTMORPH_` environment variables, then
//! explicit overrides.

use crate::error::ConfigError;
use crate::executor::{ExecutionOptions, Strategy};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextmorphConfig {
    pub executor: ExecutorConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Which strategy `ExecutorConfig` selects; sizes live in sibling fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Sequential,
    Parallel,
    Batch,
    Streaming,
}

/// Defaults for executor calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub strategy: StrategyKind,
    /// Used by the parallel strategy.
    pub concurrency: usize,
    /// Used by the batch strategy.
    pub batch_size: usize,
    pub cache: bool,
    pub trace: bool,
    /// Per-node timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Sequential,
            concurrency: 4,
            batch_size: 32,
            cache: true,
            trace: false,
            timeout_ms: None,
        }
    }
}

impl ExecutorConfig {
    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::Sequential => Strategy::Sequential,
            StrategyKind::Parallel => Strategy::Parallel(self.concurrency),
            StrategyKind::Batch => Strategy::Batch(self.batch_size),
            StrategyKind::Streaming => Strategy::Streaming,
        }
    }

    /// Build validated execution options targeting every node.
    pub fn to_options(&self) -> Result<ExecutionOptions, ConfigError> {
        self.validate()?;
        let mut options = ExecutionOptions::new(self.strategy())
            .with_cache(self.cache)
            .with_trace(self.trace);
        if let Some(ms) = self.timeout_ms {
            options = options.with_timeout(Duration::from_millis(ms));
        }
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                message: "executor.concurrency must be at least 1".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                message: "executor.batch_size must be at least 1".into(),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                message: "executor.timeout_ms must be positive when set".into(),
            });
        }
        Ok(())
    }
}

/// Result cache housekeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries stored longer ago than this are removed by `gc`.
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Log output settings consumed by `telemetry::init_tracing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive for stderr output (e.g. "info", "textmorph_core=debug").
    pub level: String,
    /// Also write JSON logs to a daily-rolling file.
    pub json_file: bool,
    /// Directory for the JSON log file. Defaults to the user data dir.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_file: false,
            log_dir: None,
        }
    }
}

impl TextmorphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.executor.validate()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "logging.level must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Render as TOML, e.g. to seed a workspace config file.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "textmorph", "textmorph")
}

/// Default directory for log files.
pub fn default_log_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration from all sources.
///
/// Priority (highest first):
/// 1. Explicit overrides
/// 2. Environment variables (`TEXTMORPH_EXECUTOR__CONCURRENCY=8`)
/// 3. Workspace config (`.textmorph/config.toml`)
/// 4. User config (`~/.config/textmorph/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&TextmorphConfig>,
) -> Result<TextmorphConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(TextmorphConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".textmorph").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("TEXTMORPH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: TextmorphConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TextmorphConfig::default();
        assert_eq!(config.executor.strategy, StrategyKind::Sequential);
        assert_eq!(config.executor.concurrency, 4);
        assert!(config.executor.cache);
        assert_eq!(config.cache.max_age(), Duration::from_secs(3600));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_options() {
        let executor = ExecutorConfig {
            strategy: StrategyKind::Batch,
            batch_size: 8,
            timeout_ms: Some(250),
            ..ExecutorConfig::default()
        };
        let options = executor.to_options().unwrap();
        assert_eq!(options.strategy, Strategy::Batch(8));
        assert!(options.cache);
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let zero_concurrency = ExecutorConfig {
            concurrency: 0,
            ..ExecutorConfig::default()
        };
        assert!(matches!(zero_concurrency.to_options(), Err(ConfigError::Invalid { .. })));

        let zero_batch = ExecutorConfig {
            batch_size: 0,
            ..ExecutorConfig::default()
        };
        assert!(zero_batch.validate().is_err());

        let zero_timeout = ExecutorConfig {
            timeout_ms: Some(0),
            ..ExecutorConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = TextmorphConfig::default();
        overrides.executor.strategy = StrategyKind::Parallel;
        overrides.executor.concurrency = 16;

        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.executor.strategy(), Strategy::Parallel(16));
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(".textmorph");
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(
            ws_dir.join("config.toml"),
            r#"
[executor]
strategy = "streaming"
trace = true
timeout_ms = 500

[cache]
max_age_secs = 60
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.executor.strategy, StrategyKind::Streaming);
        assert!(config.executor.trace);
        assert_eq!(config.executor.timeout_ms, Some(500));
        // Unset fields keep their defaults.
        assert_eq!(config.executor.concurrency, 4);
        assert_eq!(config.cache.max_age_secs, 60);
    }

    #[test]
    fn test_load_config_rejects_invalid_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(".textmorph");
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(ws_dir.join("config.toml"), "[executor]\nbatch_size = 0\n").unwrap();

        let err = load_config(Some(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(".textmorph");
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(ws_dir.join("config.toml"), "[executor]\nconcurrency = \"many\"\n").unwrap();

        let err = load_config(Some(dir.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip_through_workspace() {
        let mut config = TextmorphConfig::default();
        config.executor.strategy = StrategyKind::Parallel;
        config.executor.concurrency = 3;
        config.logging.json_file = true;

        let dir = tempfile::tempdir().unwrap();
        let ws_dir = dir.path().join(".textmorph");
        std::fs::create_dir_all(&ws_dir).unwrap();
        std::fs::write(ws_dir.join("config.toml"), config.to_toml().unwrap()).unwrap();

        assert_eq!(load_config(Some(dir.path()), None).unwrap(), config);
    }

    #[test]
    fn test_default_log_dir_is_named() {
        let dir = default_log_dir();
        assert!(dir.ends_with("logs") || dir == PathBuf::from("."));
    }
}
