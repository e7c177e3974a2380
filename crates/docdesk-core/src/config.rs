//! Configuration management for docdesk.
//!
//! Loads configuration from ${DOCDESK_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `[api].base_url`.
pub const API_URL_ENV: &str = "DOCDESK_API_URL";

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Keep a cookie store so credentials ride along with every request
    pub with_credentials: bool,
    /// Login entry point handed to the invalidation hook after a 401
    pub login_path: String,
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    pub const DEFAULT_TIMEOUT_MS: u64 = 50_000;
    pub const DEFAULT_LOGIN_PATH: &str = "/login";

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the effective base URL.
    ///
    /// Resolution order:
    /// 1. `DOCDESK_API_URL` env var (if set and non-empty)
    /// 2. `base_url` from config (if non-empty)
    /// 3. Default: `http://localhost:8000`
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn effective_base_url(&self) -> Result<url::Url> {
        let env_url = std::env::var(API_URL_ENV).ok();
        resolve_base_url(env_url.as_deref(), Some(&self.base_url))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            with_credentials: true,
            login_path: Self::DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `DOCDESK_LOG` is unset
    pub level: String,
    /// Also write logs to `<base>/logs/docdesk.log`
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the selected value is not a valid URL.
pub fn resolve_base_url(env_url: Option<&str>, config_url: Option<&str>) -> Result<url::Url> {
    let candidate = [env_url, config_url]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(ApiConfig::DEFAULT_BASE_URL);

    url::Url::parse(candidate).with_context(|| format!("Invalid API base URL: {candidate}"))
}

pub mod paths {
    //! Path resolution for docdesk configuration and data.
    //!
    //! DOCDESK_HOME resolution order:
    //! 1. DOCDESK_HOME environment variable (if set)
    //! 2. ~/.config/docdesk (default)

    use std::path::PathBuf;

    /// Returns the docdesk home directory.
    pub fn docdesk_home() -> PathBuf {
        if let Ok(home) = std::env::var("DOCDESK_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("docdesk"))
            .unwrap_or_else(|| PathBuf::from(".docdesk"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        docdesk_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        docdesk_home().join("session.json")
    }

    /// Returns the log directory.
    pub fn logs_dir() -> PathBuf {
        docdesk_home().join("logs")
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Saves only `[api].base_url` to the default config file.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_base_url(base_url: &str) -> Result<()> {
        Self::save_base_url_to(&paths::config_path(), base_url)
    }

    /// Saves only `[api].base_url` to a specific config file path.
    ///
    /// An existing file is edited in place, keeping its comments and other
    /// keys. A missing file starts from the default template.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid, `api` is not a table, or the
    /// file cannot be read or written.
    pub fn save_base_url_to(path: &Path, base_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, table, value};

        let parsed = resolve_base_url(None, Some(base_url))?;

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };
        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let api = doc
            .entry("api")
            .or_insert_with(table)
            .as_table_like_mut()
            .with_context(|| format!("`api` in {} is not a table", path.display()))?;
        api.insert("base_url", value(parsed.as_str().trim_end_matches('/')));

        Self::write_config(path, &doc.to_string())
    }

    fn write_config(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}
