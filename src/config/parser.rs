//! Settings parser for loading the settings file.
//!
//! This module handles loading settings from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, GoldenConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::Settings;

/// Default data file, relative to the settings file directory.
pub const DEFAULT_STORE_PATH: &str = ".golden-config/data.json";

/// Settings parser.
#[derive(Debug, Default)]
pub struct SettingsParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl SettingsParser {
    /// Creates a new settings parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(GoldenConfigError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            GoldenConfigError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Settings> {
        debug!("Parsing YAML settings");

        let settings: Settings = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            GoldenConfigError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed settings with {} drivers and {} secrets groups",
            settings.drivers.len(),
            settings.secrets_groups.len()
        );
        Ok(settings)
    }

    /// Loads settings with environment variable overrides.
    ///
    /// Recognised variables: `GOLDEN_CONFIG_COMMIT`,
    /// `GOLDEN_CONFIG_NUM_WORKERS` and `GOLDEN_CONFIG_STORE_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an
    /// override has an invalid value.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Settings> {
        let mut settings = self.load_file(path)?;
        Self::apply_env_overrides(&mut settings)?;
        Ok(settings)
    }

    /// Applies environment variable overrides to the settings.
    fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
        if let Ok(commit) = std::env::var("GOLDEN_CONFIG_COMMIT") {
            debug!("Overriding deploy.commit from environment");
            settings.deploy.commit = parse_bool(&commit).ok_or_else(|| {
                ConfigError::validation(
                    format!("GOLDEN_CONFIG_COMMIT must be a boolean, got '{commit}'"),
                    "deploy.commit",
                )
            })?;
        }

        if let Ok(workers) = std::env::var("GOLDEN_CONFIG_NUM_WORKERS") {
            debug!("Overriding runner.num_workers from environment");
            settings.runner.num_workers = workers.trim().parse().map_err(|_| {
                ConfigError::validation(
                    format!("GOLDEN_CONFIG_NUM_WORKERS must be a number, got '{workers}'"),
                    "runner.num_workers",
                )
            })?;
        }

        if let Ok(path) = std::env::var("GOLDEN_CONFIG_STORE_PATH") {
            debug!("Overriding store.path from environment");
            settings.store.path = Some(path);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                GoldenConfigError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves the plan store data file for these settings.
    ///
    /// Relative paths are resolved against the base path.
    #[must_use]
    pub fn store_path(&self, settings: &Settings) -> PathBuf {
        let raw = settings
            .store
            .path
            .as_deref()
            .unwrap_or(DEFAULT_STORE_PATH);
        let path = PathBuf::from(raw);
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

/// Parses common boolean spellings.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Default settings file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "golden-config.yaml",
    "golden-config.yml",
    "golden_config.yaml",
    ".golden-config.yaml",
];

/// Finds the settings file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no settings file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found settings file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(GoldenConfigError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
