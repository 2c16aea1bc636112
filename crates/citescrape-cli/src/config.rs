//! Application configuration.
//!
//! One TOML file holds the LLM settings, the engine tables and the name of
//! the active profile. A missing file means defaults.

use crate::error::{CliError, Result};
use citescrape_engines::EngineSettings;
use citescrape_llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the home directory holding the default configuration
pub const CONFIG_DIR_NAME: &str = ".citescrape";

/// File name of the default configuration
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory, next to the configuration file, holding named profiles
pub const PROFILES_DIR_NAME: &str = "profiles";

/// The `[llm]` table, with an optional `[llm.planner]` model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    /// Main model
    #[serde(flatten)]
    pub main: LlmConfig,

    /// Model asked for plans by the browser agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner: Option<LlmConfig>,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Active profile name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Base directory for results, overriding the profile's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Log at debug level
    pub debug_mode: bool,

    /// LLM settings
    pub llm: LlmSection,

    /// `[agent]`, `[browser]`, `[proxy]` and `[pdf]`
    #[serde(flatten)]
    pub engines: EngineSettings,
}

impl AppConfig {
    /// Default configuration file path: `~/.citescrape/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home =
            dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Configuration file path: the explicit one if given, else the default.
    ///
    /// `--config` and `$CITESCRAPE_CONFIG` both arrive as `explicit`.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load configuration from file, or defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.engines.validate()?;
        Ok(config)
    }

    /// Directory holding named profiles for a configuration file.
    pub fn profiles_dir(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(PROFILES_DIR_NAME)
    }
}
