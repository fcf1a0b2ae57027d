//! Configuration System
//!
//! Loads configuration from a TOML file with `NUTSHELL_*` environment
//! variable overrides.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// "sqlite" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory holding locally stored meal photos
    #[serde(default)]
    pub photo_dir: Option<String>,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("nutshell").to_string_lossy().to_string())
        .unwrap_or_else(|| "./nutshell_data".to_string())
}

fn default_backend() -> String {
    "sqlite".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: default_backend(),
            photo_dir: None,
        }
    }
}

impl StoreConfig {
    /// Photo directory, defaulting to `<data_dir>/photos`
    pub fn photo_dir(&self) -> PathBuf {
        self.photo_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(&self.data_dir).join("photos"))
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Socket address to bind
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                field: "api.host/api.port",
                error: e.to_string(),
            })
    }
}

/// Graph geometry and scaling
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub width_px: f64,
    pub height_px: f64,
    /// Default visible window
    pub window_hours: f64,
    pub glucose_low_mgdl: f64,
    pub glucose_high_mgdl: f64,
    /// Glucose value at the top of the glucose band
    pub glucose_range_mgdl: f64,
    /// Smallest bolus scale, so tiny doses don't fill the band
    pub min_bolus_scale: f64,
    pub min_basal_scale: f64,
    pub label_height_px: f64,
    /// How far before the window to fetch records that may span into it
    pub lookback_minutes: i64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            width_px: 800.0,
            height_px: 400.0,
            window_hours: 6.0,
            glucose_low_mgdl: 70.0,
            glucose_high_mgdl: 180.0,
            glucose_range_mgdl: 340.0,
            min_bolus_scale: 5.0,
            min_basal_scale: 2.0,
            label_height_px: 12.0,
            lookback_minutes: 720,
        }
    }
}

/// Event list configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// User whose records are aggregated
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Time bucket grouping untitled insulin entries
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: i64,

    /// Capacity of the store change channel
    #[serde(default = "default_change_capacity")]
    pub change_channel_capacity: usize,
}

fn default_user_id() -> String {
    "default".to_string()
}

fn default_bucket_minutes() -> i64 {
    5
}

fn default_change_capacity() -> usize {
    64
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            bucket_minutes: default_bucket_minutes(),
            change_channel_capacity: default_change_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("nutshell").join("config.toml")),
            Some(PathBuf::from("./nutshell.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Default path for `config init`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("nutshell").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./nutshell.toml"))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `NUTSHELL_*` overrides from `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = lookup("NUTSHELL_DATA_DIR") {
            self.store.data_dir = data_dir;
        }
        if let Some(backend) = lookup("NUTSHELL_STORE_BACKEND") {
            self.store.backend = backend;
        }
        if let Some(photo_dir) = lookup("NUTSHELL_PHOTO_DIR") {
            self.store.photo_dir = Some(photo_dir);
        }

        if let Some(host) = lookup("NUTSHELL_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("NUTSHELL_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Some(user_id) = lookup("NUTSHELL_USER_ID") {
            self.events.user_id = user_id;
        }

        if let Some(level) = lookup("NUTSHELL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("NUTSHELL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid {field}: {error}")]
    Invalid { field: &'static str, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Nutshell Configuration
#
# Environment variables override these settings:
# - NUTSHELL_DATA_DIR
# - NUTSHELL_STORE_BACKEND
# - NUTSHELL_PHOTO_DIR
# - NUTSHELL_API_HOST
# - NUTSHELL_API_PORT
# - NUTSHELL_USER_ID
# - NUTSHELL_LOG_LEVEL
# - NUTSHELL_LOG_FORMAT

[store]
# Directory holding records.db
data_dir = "~/.local/share/nutshell"

# Record store backend: sqlite or memory
backend = "sqlite"

# Local meal photos (defaults to <data_dir>/photos)
# photo_dir = "~/.local/share/nutshell/photos"

[api]
host = "127.0.0.1"
port = 8086

# Allowed CORS origins
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[graph]
width_px = 800.0
height_px = 400.0
window_hours = 6.0

# Glucose target range (mg/dL)
glucose_low_mgdl = 70.0
glucose_high_mgdl = 180.0
glucose_range_mgdl = 340.0

# Minimum vertical scales for insulin bars
min_bolus_scale = 5.0
min_basal_scale = 2.0

label_height_px = 12.0
lookback_minutes = 720

[events]
# User whose records are listed
user_id = "default"

# Untitled insulin entries within this many minutes form one event
bucket_minutes = 5

change_channel_capacity = 64

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
