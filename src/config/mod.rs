//! Configuration module

use std::time::Duration;

use serde::Deserialize;

/// Data path listing the mesh (WSHD) managed devices
pub const MESH_DEVICES_XPATH: &str = "Device/Services/WSHDServices/WSHDDevicesMgt/Devices";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_logout_timeout_secs")]
    pub logout_timeout_secs: u64,
    #[serde(default)]
    pub initial_delay_secs: u64,
    #[serde(default = "default_mesh_xpath")]
    pub mesh_xpath: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
            logout_timeout_secs: default_logout_timeout_secs(),
            initial_delay_secs: 0,
            mesh_xpath: default_mesh_xpath(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn logout_timeout(&self) -> Duration {
        Duration::from_secs(self.logout_timeout_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_logout_timeout_secs() -> u64 {
    5
}

fn default_mesh_xpath() -> String {
    MESH_DEVICES_XPATH.to_string()
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8089
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config/default")
    }

    /// Load from an optional file (any format `config` understands) plus
    /// `SAGEMCOM_PRESENCE__SECTION__KEY` environment overrides
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SAGEMCOM_PRESENCE").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        anyhow::ensure!(config.sync.timeout_secs > 0, "sync.timeout_secs must be positive");
        anyhow::ensure!(config.sync.interval_secs > 0, "sync.interval_secs must be positive");

        Ok(config)
    }
}
