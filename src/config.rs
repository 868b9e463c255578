use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::{Lookup, QuantityPolicy};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Which document store the CLI talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local SQLite database at `database_path`
    #[default]
    Sqlite,
    /// A pantry-server at `server.url`
    Http,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Http => write!(f, "http"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "http" => Ok(Backend::Http),
            _ => Err(format!(
                "Invalid backend '{}'. Valid options: sqlite, http",
                s
            )),
        }
    }
}

/// Remote server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Server URL (e.g., "http://localhost:8080")
    pub url: Option<String>,
    /// API key for authentication
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ServerConfig {
    /// The server URL, if one is set and not blank
    pub fn configured_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Document store backend
    pub backend: ConfigValue<Backend>,
    /// How items are matched to their stored records
    pub lookup: ConfigValue<Lookup>,
    /// Handling of quantities below zero
    pub quantity_policy: ConfigValue<QuantityPolicy>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote server configuration
    pub server: ServerConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    backend: Option<Backend>,
    lookup: Option<Lookup>,
    quantity_policy: Option<QuantityPolicy>,
    server: Option<ServerConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("pantry.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut backend = ConfigValue::new(Backend::default(), ConfigSource::Default);
        let mut lookup = ConfigValue::new(Lookup::default(), ConfigSource::Default);
        let mut quantity_policy =
            ConfigValue::new(QuantityPolicy::default(), ConfigSource::Default);
        let mut config_file = None;
        let mut server = ServerConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(value) = file_config.backend {
                backend = ConfigValue::new(value, ConfigSource::File);
            }
            if let Some(value) = file_config.lookup {
                lookup = ConfigValue::new(value, ConfigSource::File);
            }
            if let Some(value) = file_config.quantity_policy {
                quantity_policy = ConfigValue::new(value, ConfigSource::File);
            }
            if let Some(server_config) = file_config.server {
                server = server_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("PANTRY_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(value) = env_parse("PANTRY_BACKEND")? {
            backend = ConfigValue::new(value, ConfigSource::Environment);
        }
        if let Some(value) = env_parse("PANTRY_LOOKUP")? {
            lookup = ConfigValue::new(value, ConfigSource::Environment);
        }
        if let Some(value) = env_parse("PANTRY_QUANTITY_POLICY")? {
            quantity_policy = ConfigValue::new(value, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("PANTRY_SERVER_URL") {
            server.url = Some(url);
        }
        if let Ok(key) = std::env::var("PANTRY_API_KEY") {
            server.api_key = Some(key);
        }

        Ok(Self {
            database_path,
            backend,
            lookup,
            quantity_policy,
            config_file,
            server,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/pantry/
    /// - macOS: ~/Library/Application Support/pantry/
    /// - Windows: %APPDATA%/pantry/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pantry")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/pantry/
    /// - macOS: ~/Library/Application Support/pantry/
    /// - Windows: %APPDATA%/pantry/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pantry")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Reads and parses an environment variable, if set
fn env_parse<T: FromStr<Err = String>>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnv(name, e)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, e) => {
                write!(f, "Invalid value in {}: {}", name, e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
