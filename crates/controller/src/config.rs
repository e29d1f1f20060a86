//! Controller configuration management

use anyhow::{Context, Result, anyhow};
use common::VALID_LOG_LEVELS;
use protocol::{ARM_INTERFACE, DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ArmConfig {
    /// Which USB device to drive and how
    #[serde(default)]
    pub device: DeviceSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Command line front-end defaults
    #[serde(default)]
    pub cli: CliSettings,
}

/// USB device selection and transfer settings
///
/// # Example Configuration
/// ```toml
/// [device]
/// vendor_id = "0x1267"
/// product_id = "0x0000"
/// interface = 0
/// transfer_timeout_ms = 0  # 0 = wait forever
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// USB vendor ID, written as a hex string
    #[serde(with = "hex_id", default = "DeviceSettings::default_vendor_id")]
    pub vendor_id: u16,
    /// USB product ID, written as a hex string
    #[serde(with = "hex_id", default = "DeviceSettings::default_product_id")]
    pub product_id: u16,
    /// Interface claimed for control transfers
    #[serde(default = "DeviceSettings::default_interface")]
    pub interface: u8,
    /// Control transfer timeout in milliseconds (0 = no timeout)
    #[serde(default)]
    pub transfer_timeout_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            interface: Self::default_interface(),
            transfer_timeout_ms: 0,
        }
    }
}

impl DeviceSettings {
    fn default_vendor_id() -> u16 {
        DEFAULT_VENDOR_ID
    }

    fn default_product_id() -> u16 {
        DEFAULT_PRODUCT_ID
    }

    fn default_interface() -> u8 {
        ARM_INTERFACE
    }

    /// Transfer timeout; zero means unlimited
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliSettings {
    /// How long `send` keeps a command asserted before stopping
    #[serde(default = "CliSettings::default_hold_ms")]
    pub hold_ms: u64,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            hold_ms: Self::default_hold_ms(),
        }
    }
}

impl CliSettings {
    fn default_hold_ms() -> u64 {
        1000
    }
}

/// Serde module for USB IDs written as `"0x1267"`
pub mod hex_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(id: &u16, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:#06x}", id))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_id(&s).map_err(serde::de::Error::custom)
    }

    /// Parse a hex ID such as `0x1267`
    pub fn parse_hex_id(id: &str) -> Result<u16, String> {
        let id = id.trim();
        let hex_part = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .ok_or_else(|| format!("Invalid ID '{}', must start with '0x' (e.g., '0x1267')", id))?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(format!("Invalid ID '{}', hex part must be 1-4 digits", id));
        }

        u16::from_str_radix(hex_part, 16)
            .map_err(|_| format!("Invalid ID '{}', not a valid hex number", id))
    }
}

impl ArmConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/robotic-arm/arm.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: ArmConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("robotic-arm").join("arm.toml")
        } else {
            PathBuf::from(".config/robotic-arm/arm.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.log_level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }
}

/// Load a configuration file, expanding a leading `~`
pub fn load_config(path: &str) -> Result<ArmConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    ArmConfig::load(Some(path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArmConfig::default();
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.device.vendor_id, 0x1267);
        assert_eq!(config.device.product_id, 0x0000);
        assert_eq!(config.device.interface, 0);
        assert_eq!(config.device.transfer_timeout(), Duration::ZERO);
    }

    #[test]
    fn test_parse_hex_id_valid() {
        assert_eq!(hex_id::parse_hex_id("0x1267"), Ok(0x1267));
        assert_eq!(hex_id::parse_hex_id("0X0"), Ok(0));
        assert_eq!(hex_id::parse_hex_id("0xABCD"), Ok(0xabcd));
    }

    #[test]
    fn test_parse_hex_id_invalid() {
        assert!(hex_id::parse_hex_id("1267").is_err());
        assert!(hex_id::parse_hex_id("0x").is_err());
        assert!(hex_id::parse_hex_id("0x12345").is_err());
        assert!(hex_id::parse_hex_id("0xGHIJ").is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = ArmConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("vendor_id = \"0x1267\""));
        let parsed: ArmConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = ArmConfig::default();
        assert!(config.validate().is_ok());

        config.logging.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }
}
