//! Error types shared across the boot path
//!
//! Gate and update failures live next to the operations that raise them
//! (`gate::GateError`, `update::UpdateError`).

use std::fmt;

/// The one-time platform query at boot could not be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareQueryError {
    ChipInfoUnavailable(String),
    FlashSizeUnavailable(String),
    /// The platform reported a chip with zero CPU cores.
    NoCores,
}

impl fmt::Display for HardwareQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareQueryError::ChipInfoUnavailable(why) => write!(f, "chip info query failed: {why}"),
            HardwareQueryError::FlashSizeUnavailable(why) => write!(f, "Get flash size failed: {why}"),
            HardwareQueryError::NoCores => write!(f, "chip reported zero CPU cores"),
        }
    }
}

impl std::error::Error for HardwareQueryError {}

/// Malformed configuration. Surfaced immediately and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    SsidTooLong { len: usize },
    PasswordTooLong { len: usize },
    ControlCharacter { field: &'static str },
    InvalidDigest,
    ZeroChunkSize,
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SsidTooLong { len } => {
                write!(f, "WiFi SSID must be 32 bytes or less (got {len})")
            }
            ConfigError::PasswordTooLong { len } => {
                write!(f, "WiFi password must be 64 bytes or less (got {len})")
            }
            ConfigError::ControlCharacter { field } => {
                write!(f, "{field} cannot contain control characters")
            }
            ConfigError::InvalidDigest => {
                write!(f, "expected_sha256 must be 64 lowercase hex characters")
            }
            ConfigError::ZeroChunkSize => write!(f, "chunk_size must be greater than zero"),
            ConfigError::Parse(why) => write!(f, "config parse error: {why}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failures of the boot sequence itself. Hardware, gate, update and console
/// failures are recorded in the report instead because they still reach the
/// restart.
#[derive(Debug)]
pub enum BootError {
    /// The restart action returned instead of rebooting.
    Restart(anyhow::Error),
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Restart(e) => write!(f, "restart sequence failed: {e:#}"),
        }
    }
}

impl std::error::Error for BootError {}
