use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "https://api.trello.com/1";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
const CONFIG_DIR_NAME: &str = "trello-ticket";
const CONFIG_FILE_NAME: &str = "config.toml";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub access_token: String,
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub api_url: Option<String>,
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub api_url: String,
    pub artifacts_dir: PathBuf,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn load(overrides: ConfigOverrides) -> AppResult<Self> {
        Self::resolve(overrides, StoredConfig::load()?)
    }

    /// Overrides win over the stored file, which wins over defaults.
    pub fn resolve(overrides: ConfigOverrides, stored: StoredConfig) -> AppResult<Self> {
        let api_key = non_empty(overrides.api_key)
            .or(non_empty(stored.api_key))
            .ok_or_else(|| AppError::Configuration("Trello API key not configured".to_string()))?;
        let access_token = non_empty(overrides.access_token)
            .or(non_empty(stored.access_token))
            .ok_or_else(|| {
                AppError::Configuration("Trello access token not configured".to_string())
            })?;
        let api_url = non_empty(overrides.api_url)
            .or(non_empty(stored.api_url))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let artifacts_dir = overrides
            .artifacts_dir
            .or_else(|| non_empty(stored.artifacts_dir).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR));

        Ok(Self {
            credentials: Credentials {
                api_key,
                access_token,
            },
            api_url,
            artifacts_dir,
            request_timeout: REQUEST_TIMEOUT,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Contents of the local config file written by `config init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub api_url: Option<String>,
    pub artifacts_dir: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid config file: {err}"))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| {
            AppError::Configuration("unable to determine the user config directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}
