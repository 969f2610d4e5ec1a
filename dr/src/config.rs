//! distrelay configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main distrelay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the hardware bridge lives
    pub bridge: BridgeConfig,

    /// Broadcast loop timing
    pub relay: RelayConfig,

    /// WebSocket listener
    pub web: WebConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.relay.tick_interval_ms == 0 {
            return Err(eyre::eyre!("relay.tick-interval-ms must be greater than zero"));
        }
        if self.relay.update_interval_ms < self.relay.tick_interval_ms {
            return Err(eyre::eyre!(
                "relay.update-interval-ms ({}) must not be shorter than relay.tick-interval-ms ({})",
                self.relay.update_interval_ms,
                self.relay.tick_interval_ms
            ));
        }
        if self.web.channel_capacity == 0 {
            return Err(eyre::eyre!("web.channel-capacity must be greater than zero"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .distrelay.yml
        let local_config = PathBuf::from(".distrelay.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/distrelay/distrelay.yml
        if let Some(user_config) = user_config_path().filter(|path| path.exists()) {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Any problem is ignored here; the full `load` reports it once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => [Some(PathBuf::from(".distrelay.yml")), user_config_path()]
                .into_iter()
                .flatten()
                .collect(),
        };

        candidates
            .iter()
            .find(|path| path.exists())
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("distrelay").join("distrelay.yml"))
}

/// Hardware bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Unix socket the bridge listens on
    #[serde(rename = "socket-path")]
    pub socket_path: PathBuf,

    /// Use the built-in simulator instead of the socket
    pub simulate: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/arduino-router.sock"),
            simulate: false,
        }
    }
}

/// Broadcast loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Minimum time between periodic broadcasts in milliseconds
    #[serde(rename = "update-interval-ms")]
    pub update_interval_ms: u64,

    /// How often the loop checks whether a broadcast is due, in milliseconds
    #[serde(rename = "tick-interval-ms")]
    pub tick_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 100,
            tick_interval_ms: 50,
        }
    }
}

impl RelayConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// WebSocket listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address to accept browser connections on
    pub bind: String,

    /// Frames buffered per client before a slow client starts skipping
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:7000".to_string(),
            channel_capacity: 64,
        }
    }
}
