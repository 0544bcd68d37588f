use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding every document
    pub data_dir: PathBuf,
    /// Path to the YAML credential store
    pub credentials_path: PathBuf,
    /// Port the server listens on
    pub port: u16,
    /// Idle minutes before a session expires
    pub session_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flatcms");
        Self {
            data_dir: base.join("data"),
            credentials_path: base.join("users.yml"),
            port: 4567,
            session_minutes: 24 * 60,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(data_dir) = std::env::var("FLATCMS_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(credentials_path) = std::env::var("FLATCMS_CREDENTIALS") {
            config.credentials_path = PathBuf::from(credentials_path);
        }
        if let Some(port) = std::env::var("FLATCMS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.port = port;
        }
        if let Some(minutes) = std::env::var("FLATCMS_SESSION_MINUTES")
            .ok()
            .and_then(|m| m.parse().ok())
        {
            config.session_minutes = minutes;
        }

        Ok(config)
    }

    /// Default config file path: <config dir>/flatcms/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flatcms")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
