//! Layered application configuration
//!
//! Sources, lowest precedence first: built-in defaults, `nomark.toml` in the
//! working directory, `$XDG_CONFIG_HOME/nomark/config.toml`, an explicit
//! `--config` file, then `NOMARK__SECTION__KEY` environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "nomark";
const ENV_PREFIX: &str = "NOMARK";

/// Configuration result type
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Render error: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8086/".to_string(),
            timeout_secs: 30,
            user_agent: concat!("nomark/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Platform login settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed login code; a fresh device code is generated when unset
    pub login_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session file lives here
    pub data_dir: PathBuf,
    /// Saved videos and images
    pub album_dir: PathBuf,
    /// Partial downloads; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR);
        let album_dir = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| data_dir.clone())
            .join(APP_DIR);

        Self {
            data_dir,
            album_dir,
            temp_dir: None,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub level: String,
    pub json: bool,
    /// Daily rolling log files go here when set
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "nomark=info".to_string(),
            json: false,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load every layer, with `explicit` as the highest-precedence file
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name(APP_DIR).required(false));

        if let Some(user) = user_config_path() {
            builder = builder.add_source(File::from(user).required(false));
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Effective configuration as TOML
    pub fn render(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// `$XDG_CONFIG_HOME/nomark/config.toml` or the platform equivalent
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert!(config.auth.login_code.is_none());
        assert!(config.storage.session_file().ends_with("nomark/session.json"));
        assert!(!config.log.json);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://api.example.com/\"\ntimeout_secs = 5\n\n[auth]\nlogin_code = \"fixed\""
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com/");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.auth.login_code.as_deref(), Some("fixed"));
        // Untouched sections keep their defaults
        assert_eq!(config.log.level, "nomark=info");
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_render_round_trips_through_toml() {
        let config = AppConfig::default();
        let rendered = config.render().unwrap();
        assert!(rendered.contains("[api]"));

        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
