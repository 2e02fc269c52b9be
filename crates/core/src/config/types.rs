use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::mover::MoverConfig;
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub mover: MoverConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8080
}

/// Where runtime-mutable move settings are persisted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("movetools-settings.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(
            config.settings.path.to_str().unwrap(),
            "movetools-settings.toml"
        );
        assert_eq!(config.scheduler.tick_interval_ms, 2000);
        assert!(config.mover.prefer_atomic_moves);
    }

    #[test]
    fn test_deserialize_all_sections() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[scheduler]
tick_interval_ms = 500
default_speed_bps = 1048576.0
min_speed_sample_bytes = 0

[settings]
path = "/var/lib/movetools/settings.toml"

[mover]
prefer_atomic_moves = false
overwrite = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.scheduler.tick_interval_ms, 500);
        assert_eq!(config.scheduler.default_speed_bps, 1048576.0);
        assert_eq!(config.scheduler.min_speed_sample_bytes, 0);
        assert_eq!(
            config.settings.path.to_str().unwrap(),
            "/var/lib/movetools/settings.toml"
        );
        assert!(!config.mover.prefer_atomic_moves);
        assert!(config.mover.overwrite);
        assert_eq!(config.mover.buffer_size, 8 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[server]\nhost = \"not-an-ip\"");
        assert!(result.is_err());
    }
}
