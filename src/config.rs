use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::{Cli, ColorMode, RunOptions};

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// On-disk configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub output: OutputSection,
    pub validation: ValidationSection,
    pub files: FilesSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputSection {
    /// Diagnostic coloring mode
    pub color: ColorMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ValidationSection {
    /// Surface validation warnings by default
    pub warn: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FilesSection {
    /// Schema glob patterns used when no -s/--schema is given
    pub schemas: Vec<String>,
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Build the effective run options with precedence: defaults -> file ->
    /// environment -> CLI.
    pub async fn load_options(cli: &Cli) -> Result<RunOptions> {
        Self::load_options_with_env(cli, &SystemEnvProvider).await
    }

    /// Same as [`load_options`](Self::load_options) with injectable
    /// environment access for tests.
    pub async fn load_options_with_env(
        cli: &Cli,
        env: &dyn EnvProvider,
    ) -> Result<RunOptions> {
        let mut config = if let Some(config_path) = &cli.config {
            Self::load_from_file(config_path).await?
        } else {
            Self::find_config_file().await?.unwrap_or_default()
        };

        config = Self::apply_environment_overrides(config, env)?;

        Ok(Self::merge_with_cli(config, cli))
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<ConfigFile> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try TOML first, then JSON
                if let Ok(config) = toml::from_str::<ConfigFile>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find a configuration file in standard locations: the working
    /// directory first, then the user configuration directory.
    pub async fn find_config_file() -> Result<Option<ConfigFile>> {
        let config_names = [
            "xmlvalidator.toml",
            "xmlvalidator.json",
            ".xmlvalidator.toml",
            ".xmlvalidator.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("xmlvalidator").join("config.toml");
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        Ok(None)
    }

    /// Apply XMLVALIDATOR_* environment variable overrides
    fn apply_environment_overrides(
        mut config: ConfigFile,
        env: &dyn EnvProvider,
    ) -> Result<ConfigFile> {
        if let Some(value) = env.get("XMLVALIDATOR_COLOR") {
            config.output.color = ColorMode::from_str(&value, true).map_err(|_| {
                ConfigError::Environment(format!(
                    "XMLVALIDATOR_COLOR must be auto, always, or never, got '{}'",
                    value
                ))
            })?;
        }

        if let Some(value) = env.get("XMLVALIDATOR_WARN") {
            config.validation.warn = parse_bool(&value).ok_or_else(|| {
                ConfigError::Environment(format!(
                    "XMLVALIDATOR_WARN must be a boolean, got '{}'",
                    value
                ))
            })?;
        }

        if let Some(value) = env.get("XMLVALIDATOR_SCHEMAS") {
            let separator = if cfg!(windows) { ';' } else { ':' };
            config.files.schemas = value
                .split(separator)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Apply CLI argument overrides (highest precedence)
    fn merge_with_cli(config: ConfigFile, cli: &Cli) -> RunOptions {
        let schema_patterns = if cli.schemas.is_empty() {
            config.files.schemas
        } else {
            cli.schemas.clone()
        };

        RunOptions {
            schema_patterns,
            document_patterns: cli.documents.clone(),
            warn: cli.warn || config.validation.warn,
            color: cli.color.unwrap_or(config.output.color),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
