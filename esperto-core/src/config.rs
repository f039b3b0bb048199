/// Boot configuration that can be tested independently
use serde::{Deserialize, Serialize};

use crate::countdown::DEFAULT_COUNTDOWN_SECS;
use crate::error::ConfigError;
use crate::gate::NetworkCredentials;
use crate::update::{UpdatePolicy, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IMAGE_BYTES};

const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BootConfig {
    pub target: String,

    // WiFi / OTA settings
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub update_url: String,
    pub update_enabled: bool,
    pub http_timeout_secs: u32,
    pub chunk_size: usize,
    pub max_image_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sha256: Option<String>,

    // Restart
    pub countdown_secs: u32,

    /// off, error, warn, info, debug or trace
    pub log_level: String,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            target: "esp32".to_string(),
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            update_url: String::new(),
            update_enabled: true,
            http_timeout_secs: 60,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            expected_sha256: None,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl BootConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: BootConfig =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ConfigError> {
        serde_json::to_vec(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Structural checks only. Emptiness is left to the readiness gate so a
    /// device without credentials still boots and restarts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::SsidTooLong {
                len: self.wifi_ssid.len(),
            });
        }
        if self.wifi_password.len() > MAX_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooLong {
                len: self.wifi_password.len(),
            });
        }
        for (field, value) in [
            ("WiFi SSID", &self.wifi_ssid),
            ("WiFi password", &self.wifi_password),
            ("update URL", &self.update_url),
        ] {
            if value.chars().any(|c| c.is_control()) {
                return Err(ConfigError::ControlCharacter { field });
            }
        }
        if let Some(digest) = &self.expected_sha256 {
            let well_formed = digest.len() == 64
                && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
            if !well_formed {
                return Err(ConfigError::InvalidDigest);
            }
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    pub fn credentials(&self) -> NetworkCredentials {
        NetworkCredentials::new(&self.wifi_ssid, &self.wifi_password, &self.update_url)
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy {
            chunk_size: self.chunk_size,
            max_image_bytes: self.max_image_bytes,
            expected_sha256: self.expected_sha256.clone(),
        }
    }
}
