//! Service settings loaded from `config.toml`.
//!
//! Every section is optional; a missing file yields the defaults. A handful of values can be
//! overridden from the environment (`DATABASE_URL`, `PORT`, `DOCUMENTS_DIR`). Secrets such as
//! `OPENAI_API_KEY` are never read from the file; they are looked up right before use.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Document bucket settings
    pub storage: StorageConfig,
    /// Report narrative settings
    pub summarizer: SummarizerConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body, in bytes (document uploads)
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: Vec::new(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// `[database]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` takes precedence
    pub url: Option<String>,
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the document bucket
    pub documents_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("data/documents"),
        }
    }
}

/// `[summarizer]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Whether report narratives are requested at all
    pub enabled: bool,
    /// Chat-completions endpoint
    pub endpoint: String,
    /// Model name sent with each request
    pub model: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from a TOML file. A missing file yields the defaults.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("{} not found, using default settings", path.display());
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    let config = parse_config(&contents)?;
    info!("Loaded settings from {}", path.display());
    Ok(config)
}

/// Loads `./config.toml` (or the file named by `INDICORE_CONFIG`) and applies
/// environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("INDICORE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = load_config(path)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Applies `DATABASE_URL`, `PORT` and `DOCUMENTS_DIR` from `lookup`.
///
/// # Errors
/// Returns [`Error::Config`] if `PORT` is not a valid port number.
pub fn apply_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
        config.database.url = Some(url);
    }
    if let Some(port) = lookup("PORT") {
        config.server.port = port.trim().parse().map_err(|e| Error::Config {
            message: format!("Invalid PORT '{port}': {e}"),
        })?;
    }
    if let Some(dir) = lookup("DOCUMENTS_DIR").filter(|v| !v.trim().is_empty()) {
        config.storage.documents_dir = PathBuf::from(dir);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            cors_origins = ["http://localhost:5173"]
            max_upload_bytes = 1024

            [database]
            url = "sqlite://kpis.sqlite?mode=rwc"

            [storage]
            documents_dir = "/var/lib/indicore/docs"

            [summarizer]
            enabled = true
            model = "gpt-4o"
            max_tokens = 500
            temperature = 0.2
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.database.url.as_deref(), Some("sqlite://kpis.sqlite?mode=rwc"));
        assert_eq!(config.storage.documents_dir, PathBuf::from("/var/lib/indicore/docs"));
        assert!(config.summarizer.enabled);
        assert_eq!(config.summarizer.model, "gpt-4o");
        assert_eq!(config.summarizer.max_tokens, 500);
        assert_eq!(config.summarizer.temperature, 0.2);
        // Unset fields keep their defaults
        assert_eq!(
            config.summarizer.endpoint,
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.database.url.is_none());
        assert!(!config.summarizer.enabled);
        assert_eq!(config.summarizer.model, "gpt-4o-mini");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[server]\nport = \"not a number\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "9000"),
            ("DOCUMENTS_DIR", "/tmp/docs"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        apply_overrides(&mut config, |k| env.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.documents_dir, PathBuf::from("/tmp/docs"));
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = AppConfig::default();
        let result = apply_overrides(&mut config, |k| (k == "PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
