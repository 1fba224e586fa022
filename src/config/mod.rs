//! Configuration module
//!
//! Handles loading and saving synclient configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dispatch::ProtocolVersion;
use crate::network::{NetworkConfig as NetConfig, DEFAULT_MAX_FRAME_SIZE};
use crate::protocol::{DEFAULT_PORT, PROTOCOL_MAJOR, PROTOCOL_MINOR};
use crate::screen::StaticDisplay;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Screen settings
    #[serde(default)]
    pub screen: ScreenConfig,

    /// Protocol settings
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Screen name announced to the primary
    #[serde(default = "default_name")]
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            verbose: false,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Primary to connect to
    pub server: Option<String>,
    /// Port of the primary
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Idle time before giving up on the primary in ms; 0 disables
    #[serde(default = "default_keep_alive_timeout")]
    pub keep_alive_timeout_ms: u64,
    /// Largest accepted frame in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_keep_alive_timeout() -> u64 {
    9000
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
            keep_alive_timeout_ms: default_keep_alive_timeout(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

/// Screen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Left edge reported to the primary
    pub x: Option<i32>,
    /// Top edge reported to the primary
    pub y: Option<i32>,
    /// Screen width override (platform default if not set)
    pub width: Option<u32>,
    /// Screen height override (platform default if not set)
    pub height: Option<u32>,
}

/// Protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Major version announced in the handshake reply
    #[serde(default = "default_major")]
    pub major: i32,
    /// Minor version announced in the handshake reply
    #[serde(default = "default_minor")]
    pub minor: i32,
}

fn default_major() -> i32 {
    PROTOCOL_MAJOR
}

fn default_minor() -> i32 {
    PROTOCOL_MINOR
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            major: default_major(),
            minor: default_minor(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values sent as 16-bit wire fields are in range
    pub fn validate(&self) -> ConfigResult<()> {
        let wire_max = i64::from(i16::MAX);
        let wire_min = i64::from(i16::MIN);

        let checks = [
            ("protocol.major", Some(i64::from(self.protocol.major)), 0),
            ("protocol.minor", Some(i64::from(self.protocol.minor)), 0),
            ("screen.x", self.screen.x.map(i64::from), wire_min),
            ("screen.y", self.screen.y.map(i64::from), wire_min),
            ("screen.width", self.screen.width.map(i64::from), 1),
            ("screen.height", self.screen.height.map(i64::from), 1),
        ];
        for (field, value, min) in checks {
            if let Some(value) = value {
                if value < min || value > wire_max {
                    return Err(ConfigError::Invalid(format!(
                        "{} = {} is outside {}..={}",
                        field, value, min, wire_max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("synclient/config.toml")),
            Some(PathBuf::from("./synclient.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                tracing::debug!("Loading configuration from {}", path.display());
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Version announced in the handshake reply
    pub fn protocol_version(&self) -> ProtocolVersion {
        ProtocolVersion::new(self.protocol.major, self.protocol.minor)
    }

    /// Network settings for the client
    pub fn net_config(&self) -> NetConfig {
        NetConfig {
            port: self.network.port,
            connect_timeout_ms: self.network.connect_timeout_ms,
            keep_alive_timeout_ms: self.network.keep_alive_timeout_ms,
            max_frame_size: self.network.max_frame_size,
        }
    }

    /// Display geometry with configured overrides applied
    pub fn display(&self) -> StaticDisplay {
        StaticDisplay::from_overrides(
            self.screen.x,
            self.screen.y,
            self.screen.width,
            self.screen.height,
        )
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        general: GeneralConfig {
            name: "living-room-pc".to_string(),
            verbose: false,
        },
        network: NetworkConfig {
            server: Some("192.168.1.10".to_string()),
            ..Default::default()
        },
        screen: ScreenConfig {
            width: Some(1920),
            height: Some(1080),
            ..Default::default()
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}
