use crate::game::Side;
use crate::network::{ClientConfig, JoinRequest, RelayConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relay host the `play` command connects to
    pub server_host: String,
    /// Relay port the `play` command connects to
    pub server_port: u16,
    /// Ceiling on a connection attempt, in milliseconds
    pub connect_timeout_ms: u64,
    /// Listen address for the `relay` command
    pub relay_bind: String,
    /// How long the relay waits for a new connection's `join`
    pub join_timeout_secs: u64,
    /// Side announced as moving first when a room pairs up
    pub opening_side: Side,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8765,
            connect_timeout_ms: 3000,
            relay_bind: crate::network::server::DEFAULT_RELAY_ADDR.to_string(),
            join_timeout_secs: 30,
            opening_side: Side::Defender,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "hnefatafl", "hnefatafl")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    /// Load from an explicit path or the platform default location
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_config_file() {
                Ok(path) => Self::load_from(&path),
                Err(_) => Ok(Self::default()),
            },
        }
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content).context("Failed to write configuration file")?;

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            join_timeout: Duration::from_secs(self.join_timeout_secs),
            opening_side: self.opening_side,
            ..RelayConfig::default()
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: self.connect_timeout(),
            ..ClientConfig::default()
        }
    }

    /// Join request for `play`; flags override the configured relay address
    pub fn join_request(
        &self,
        room: String,
        name: String,
        host: Option<String>,
        port: Option<u16>,
    ) -> JoinRequest {
        JoinRequest {
            host: host.unwrap_or_else(|| self.server_host.clone()),
            port: port.unwrap_or(self.server_port),
            room,
            name,
        }
    }
}
