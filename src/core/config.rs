use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Currency pair code as the provider spells it, e.g. `USD-BRL`.
    pub pair: String,
    pub timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: "https://economia.awesomeapi.com.br".to_string(),
            pair: "USD-BRL".to_string(),
            timeout_ms: 200,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_path: PathBuf,
    /// Inbound budget for one `GET /cotacao`.
    pub request_timeout_ms: u64,
    pub upstream: UpstreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "0.0.0.0:8080".to_string(),
            database_path: PathBuf::from("./cotacoes.db"),
            request_timeout_ms: 300,
            upstream: UpstreamConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub timeout_ms: u64,
    pub output_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "http://localhost:8080".to_string(),
            timeout_ms: 300,
            output_path: PathBuf::from("cotacao.txt"),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        match Self::default_config_path() {
            Ok(path) if path.exists() => Self::load_from_path(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("br", "cotacao", "cotacao")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Checks the deadline budgets nest: the upstream call must get strictly
    /// less time than the inbound request that spawns it.
    pub fn validate(&self) -> Result<()> {
        let server = &self.server;
        ensure!(server.request_timeout_ms > 0, "server.request_timeout_ms must be > 0");
        ensure!(server.upstream.timeout_ms > 0, "server.upstream.timeout_ms must be > 0");
        ensure!(
            server.upstream.timeout_ms < server.request_timeout_ms,
            "server.upstream.timeout_ms ({}) must be less than server.request_timeout_ms ({})",
            server.upstream.timeout_ms,
            server.request_timeout_ms
        );
        ensure!(!server.upstream.pair.is_empty(), "server.upstream.pair must not be empty");
        ensure!(self.client.timeout_ms > 0, "client.timeout_ms must be > 0");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_endpoints() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.server.database_path, PathBuf::from("./cotacoes.db"));
        assert_eq!(config.server.request_timeout(), Duration::from_millis(300));
        assert_eq!(config.server.upstream.timeout(), Duration::from_millis(200));
        assert_eq!(config.server.upstream.pair, "USD-BRL");
        assert_eq!(config.client.server_url, "http://localhost:8080");
        assert_eq!(config.client.timeout(), Duration::from_millis(300));
        assert_eq!(config.client.output_path, PathBuf::from("cotacao.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_deserialization() {
        let yaml_str = r#"
server:
  listen_addr: "127.0.0.1:9090"
  upstream:
    base_url: "http://example.com/upstream"
client:
  output_path: "/tmp/dolar.txt"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.server.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.server.upstream.base_url, "http://example.com/upstream");
        // Unset fields keep their defaults
        assert_eq!(config.server.upstream.pair, "USD-BRL");
        assert_eq!(config.server.upstream.timeout_ms, 200);
        assert_eq!(config.server.request_timeout_ms, 300);
        assert_eq!(config.client.output_path, PathBuf::from("/tmp/dolar.txt"));
        assert_eq!(config.client.server_url, "http://localhost:8080");
    }

    #[test]
    fn test_upstream_budget_must_be_tighter() {
        let mut config = AppConfig::default();
        config.server.upstream.timeout_ms = 300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be less than"));

        config.server.upstream.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_path_rejects_invalid_budgets() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            "server:\n  request_timeout_ms: 100\n  upstream:\n    timeout_ms: 150\n",
        )
        .unwrap();

        let result = AppConfig::load_from_path(file.path());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid config file")
        );
    }
}
