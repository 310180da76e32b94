//! Server configuration

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Model registry file
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Where batch result CSVs are written and served from
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Static UI directory, served as the fallback route
    #[serde(default)]
    pub frontend_dir: Option<PathBuf>,

    /// Models loaded before the listener starts
    #[serde(default)]
    pub preload: Vec<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_overrides(cli);
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(registry) = &cli.registry {
            self.registry_path = registry.clone();
        }
        if let Some(results_dir) = &cli.results_dir {
            self.results_dir = results_dir.clone();
        }
        if let Some(frontend_dir) = &cli.frontend_dir {
            self.frontend_dir = Some(frontend_dir.clone());
        }
        if !cli.preload.is_empty() {
            self.preload = cli.preload.clone();
        }
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            results_dir: default_results_dir(),
            frontend_dir: None,
            preload: Vec::new(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("models_registry.yaml")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load("does-not-exist.yaml", &Cli::default()).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_file_then_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smsguard.yaml");
        std::fs::write(
            &path,
            "registry_path: /srv/models.yaml\nport: 9000\npreload: [lr]\n",
        )
        .unwrap();

        let cli = Cli {
            port: Some(9100),
            frontend_dir: Some(PathBuf::from("ui")),
            ..Cli::default()
        };
        let config = ServerConfig::load(path.to_str().unwrap(), &cli).unwrap();

        assert_eq!(config.registry_path, PathBuf::from("/srv/models.yaml"));
        assert_eq!(config.port, 9100);
        assert_eq!(config.preload, vec!["lr"]);
        assert_eq!(config.frontend_dir, Some(PathBuf::from("ui")));
        assert_eq!(config.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smsguard.yaml");
        std::fs::write(&path, "listen: 0.0.0.0\n").unwrap();
        assert!(ServerConfig::load(path.to_str().unwrap(), &Cli::default()).is_err());
    }
}
