use crate::domain::dice::DieType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: default_true(),
            file_logging_enabled: default_false(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_target: default_true(),
            ansi_colors: default_true(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "godice_bridge".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Downstream server
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_client_uuid")]
    pub client_uuid: String,
    #[serde(default = "default_client_username")]
    pub client_username: String,

    // Dice discovery
    #[serde(default = "default_device_prefix")]
    pub device_prefix: String,
    #[serde(default)]
    pub die_type: DieType,

    // Timing policy (milliseconds)
    #[serde(default = "default_discovery_poll_ms")]
    pub discovery_poll_ms: u64,
    #[serde(default = "default_scan_window_ms")]
    pub scan_window_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_connection_poll_ms")]
    pub connection_poll_ms: u64,

    // Advanced BLE settings
    #[serde(default = "default_control_uuid")]
    pub control_char_uuid: String,
    #[serde(default = "default_notify_uuid")]
    pub notify_char_uuid: String,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            client_uuid: default_client_uuid(),
            client_username: default_client_username(),
            device_prefix: default_device_prefix(),
            die_type: DieType::default(),
            discovery_poll_ms: default_discovery_poll_ms(),
            scan_window_ms: default_scan_window_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            connection_poll_ms: default_connection_poll_ms(),
            control_char_uuid: default_control_uuid(),
            notify_char_uuid: default_notify_uuid(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_client_uuid() -> String {
    "dice".to_string()
}
fn default_client_username() -> String {
    "BLE Proxy".to_string()
}
fn default_device_prefix() -> String {
    "GoDice_".to_string()
}
fn default_discovery_poll_ms() -> u64 {
    5000
}
fn default_scan_window_ms() -> u64 {
    3000
}
fn default_retry_delay_ms() -> u64 {
    3000
}
fn default_connection_poll_ms() -> u64 {
    1000
}
fn default_control_uuid() -> String {
    "6e400002-b5a3-f393-e0a9-e50e24dcca9e".to_string()
}
fn default_notify_uuid() -> String {
    "6e400003-b5a3-f393-e0a9-e50e24dcca9e".to_string()
}

impl Settings {
    /// Load settings from an explicit path, or from the default config
    /// location. A missing file yields the defaults; a malformed file is an
    /// error rather than a silent fallback.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    fn default_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("godice-bridge");
        path.push("settings.json");
        Ok(path)
    }
}
