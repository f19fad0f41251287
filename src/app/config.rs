use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_CREDENTIAL_ERROR_NAMES, DEFAULT_TELEMATICS_ENDPOINT, HTTP_REQUEST_TIMEOUT_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Telematics API connection and service account
    #[serde(default)]
    pub telematics: TelematicsConfig,

    /// Local document store
    #[serde(default)]
    pub documents: DocumentsConfig,
}

/// Telematics API configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelematicsConfig {
    /// JSON-RPC endpoint all calls are posted to
    pub endpoint: String,
    /// Vendor database the service account belongs to
    pub database: String,
    /// Service account user name
    pub user_name: String,
    /// Service account password
    pub password: String,
    /// Transport timeout in seconds
    pub timeout_secs: u64,
    /// Error names that mean the session token was rejected
    pub credential_error_names: Vec<String>,
}

impl TelematicsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_credential_error(&self, name: &str) -> bool {
        self.credential_error_names.iter().any(|n| n == name)
    }
}

impl Default for TelematicsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TELEMATICS_ENDPOINT.to_string(),
            database: String::new(),
            user_name: String::new(),
            password: String::new(),
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
            credential_error_names: DEFAULT_CREDENTIAL_ERROR_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// Keep the password out of logs
impl fmt::Debug for TelematicsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelematicsConfig")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("credential_error_names", &self.credential_error_names)
            .finish()
    }
}

/// Document store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// JSON file holding the document collections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    let global_config = config_dir.join("config.toml");
    let local_config = PathBuf::from(".fleetlink/config.toml");

    load_config_from(&[global_config, local_config])
}

/// Defaults, then each existing file in order, then `FLEETLINK_` environment
/// variables (`FLEETLINK_TELEMATICS__PASSWORD` sets `telematics.password`)
pub fn load_config_from(files: &[PathBuf]) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files {
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
    }

    figment = figment.merge(Env::prefixed("FLEETLINK_").split("__"));

    figment
        .extract()
        .context("Failed to load configuration")
}

/// Load a single explicit config file (plus environment overrides)
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    load_config_from(&[path.to_path_buf()])
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "fleetlink") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("fleetlink");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist. Returns the
/// path when a file was written.
pub fn init_config() -> Result<Option<PathBuf>> {
    let config_file = get_config_dir()?.join("config.toml");

    if config_file.exists() {
        return Ok(None);
    }

    save_config(&Config::default(), Some(config_file.clone()))?;
    Ok(Some(config_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.telematics.endpoint, DEFAULT_TELEMATICS_ENDPOINT);
        assert_eq!(config.telematics.timeout(), Duration::from_secs(10));
        assert!(config.telematics.is_credential_error("InvalidUserException"));
        assert!(!config.telematics.is_credential_error("ArgumentException"));
        assert!(config.documents.path.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[telematics]
database = "fleet"
user_name = "ops@example.com"
timeout_secs = 30

[documents]
path = "docs.json"
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();

        assert_eq!(config.telematics.database, "fleet");
        assert_eq!(config.telematics.user_name, "ops@example.com");
        assert_eq!(config.telematics.timeout_secs, 30);
        // untouched keys keep their defaults
        assert_eq!(config.telematics.endpoint, DEFAULT_TELEMATICS_ENDPOINT);
        assert_eq!(config.documents.path, Some(PathBuf::from("docs.json")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config_file(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.telematics.database = "fleet".into();

        save_config(&config, Some(path.clone())).unwrap();

        assert_eq!(load_config_file(&path).unwrap().telematics.database, "fleet");
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = TelematicsConfig::default();
        config.password = "hunter2".into();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
