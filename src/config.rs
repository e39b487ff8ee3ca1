//! Service configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file
//! (`~/.config/medialink/config.toml` or an explicit path), then environment
//! variables. `.env` files are loaded into the environment by the binary
//! before [`Config::load`] runs.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::platform::PlatformConfig;

/// Deployment mode. Development responses include upstream error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => bail!("unknown environment \"{other}\" (expected development or production)"),
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => bail!("unknown log format \"{other}\" (expected compact or json)"),
        }
    }
}

/// Upstream API endpoints. Overridable so tests and staging can stub them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub music163_song_detail: Option<String>,
    pub youku_video_show: Option<String>,
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    /// Youku open API `client_id`. Not validated locally.
    pub youku_client_id: Option<String>,
    /// Timeout for every upstream call, in milliseconds.
    pub upstream_timeout_ms: u64,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 7100,
            environment: Environment::default(),
            log_format: LogFormat::default(),
            youku_client_id: None,
            upstream_timeout_ms: 2048,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location) and the
    /// process environment.
    ///
    /// A missing default file is fine; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Override fields from environment variables, read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("HOST") {
            self.host = host
                .trim()
                .parse()
                .with_context(|| format!("HOST is not an IP address: {host}"))?;
        }
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?;
        }
        if let Some(env) = var("MEDIALINK_ENV") {
            self.environment = env.parse().context("MEDIALINK_ENV")?;
        }
        if let Some(format) = var("MEDIALINK_LOG_FORMAT") {
            self.log_format = format.parse().context("MEDIALINK_LOG_FORMAT")?;
        }
        if let Some(client_id) = var("YOUKU_CLIENT_ID") {
            self.youku_client_id = Some(client_id);
        }
        if let Some(timeout) = var("MEDIALINK_UPSTREAM_TIMEOUT_MS") {
            self.upstream_timeout_ms = timeout.trim().parse().with_context(|| {
                format!("MEDIALINK_UPSTREAM_TIMEOUT_MS is not a number: {timeout}")
            })?;
        }
        if let Some(url) = var("MEDIALINK_MUSIC163_API_URL") {
            self.endpoints.music163_song_detail = Some(url);
        }
        if let Some(url) = var("MEDIALINK_YOUKU_API_URL") {
            self.endpoints.youku_video_show = Some(url);
        }

        if self.upstream_timeout_ms == 0 {
            bail!("upstream timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Handler settings derived from this config.
    pub fn platforms(&self) -> PlatformConfig {
        PlatformConfig {
            music163_api_url: self.endpoints.music163_song_detail.clone(),
            youku_api_url: self.endpoints.youku_video_show.clone(),
            youku_client_id: self.youku_client_id.clone(),
        }
    }
}

/// Return the path to the default config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medialink")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:7100".parse().unwrap());
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.upstream_timeout(), Duration::from_millis(2048));
        assert!(config.youku_client_id.is_none());
    }

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.port, 7100);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
host = "127.0.0.1"
port = 8080
environment = "development"
log_format = "json"
youku_client_id = "abc123"
upstream_timeout_ms = 5000

[endpoints]
music163_song_detail = "http://localhost:9000/weapi/song/detail"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.youku_client_id.as_deref(), Some("abc123"));
        assert_eq!(config.upstream_timeout_ms, 5000);
        assert_eq!(
            config.platforms().music163_api_url.as_deref(),
            Some("http://localhost:9000/weapi/song/detail")
        );
        assert!(config.platforms().youku_api_url.is_none());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: Config = toml::from_str("port = 8080\nyouku_client_id = \"file\"").unwrap();
        config
            .apply_env(env(&[
                ("PORT", "9090"),
                ("YOUKU_CLIENT_ID", "env"),
                ("MEDIALINK_ENV", "dev"),
                ("MEDIALINK_UPSTREAM_TIMEOUT_MS", "1000"),
                ("MEDIALINK_YOUKU_API_URL", "http://stub/show.json"),
            ]))
            .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.youku_client_id.as_deref(), Some("env"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.upstream_timeout(), Duration::from_secs(1));
        assert_eq!(config.platforms().youku_api_url.as_deref(), Some("http://stub/show.json"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("PORT", ""), ("YOUKU_CLIENT_ID", "  ")])).unwrap();
        assert_eq!(config.port, 7100);
        assert!(config.youku_client_id.is_none());
    }

    #[test]
    fn invalid_env_values_are_errors() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("PORT", "seventy")])).is_err());
        assert!(config.apply_env(env(&[("MEDIALINK_ENV", "staging")])).is_err());
        assert!(config.apply_env(env(&[("MEDIALINK_UPSTREAM_TIMEOUT_MS", "0")])).is_err());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 7200\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, 7200);
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_file(&dir.path().join("absent.toml")).is_err());
    }
}
