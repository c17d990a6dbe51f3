use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::debug;
use serde::Deserialize;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DOTENV_FILE: &str = ".env";

/// Contents of ~/.config/necture/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub model: Option<String>,
    pub lang: Option<String>,
    pub bind: Option<String>,
}

impl Config {
    /// Load config from ~/.config/necture/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config =
                toml::from_str(&content).wrap_err_with(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

/// Load `KEY=value` pairs from a dotenv file into the process environment.
///
/// Variables already set in the environment keep their value. Returns
/// whether the file existed.
pub fn load_dotenv(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e).wrap_err_with(|| format!("invalid dotenv file {}", path.display())),
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("necture")
        .join("config.toml")
}

/// Resolved process configuration, built once at startup and shared read-only.
///
/// The API key stays optional: a missing key is reported when notes are
/// generated, not when the server starts.
#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub lang: String,
    pub bind: String,
    pub gemini_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            bind: DEFAULT_BIND.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Merge the config file with an API key taken from the environment.
    /// The environment wins over the file.
    pub fn from_config(config: Config, env_api_key: Option<String>) -> Self {
        let defaults = Settings::default();
        let env_api_key = env_api_key.filter(|k| !k.trim().is_empty());
        Self {
            gemini_api_key: env_api_key.or(config.gemini_api_key),
            model: config.model.unwrap_or(defaults.model),
            lang: config.lang.unwrap_or(defaults.lang),
            bind: config.bind.unwrap_or(defaults.bind),
            gemini_base_url: defaults.gemini_base_url,
        }
    }

    /// Settings from the config file and process environment
    pub fn from_env(config: Config) -> Self {
        Self::from_env_var(config, API_KEY_ENV)
    }

    fn from_env_var(config: Config, key_var: &str) -> Self {
        Self::from_config(config, std::env::var(key_var).ok())
    }
}
