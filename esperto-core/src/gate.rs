/// Network readiness gate: pure validation before any update attempt
use std::fmt;

use serde::{Deserialize, Serialize};

pub const SECURE_SCHEME: &str = "https://";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredentials {
    pub ssid: String,
    pub password: String,
    pub update_url: String,
}

impl NetworkCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>, update_url: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            update_url: update_url.into(),
        }
    }
}

/// Proof that [`check_readiness`] passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    MissingSsid,
    MissingPassword,
    InsecureOrMissingUrl,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::MissingSsid => write!(f, "WiFi SSID is empty"),
            GateError::MissingPassword => write!(f, "WiFi password is empty"),
            GateError::InsecureOrMissingUrl => {
                write!(f, "update URL is missing or does not use {SECURE_SCHEME}")
            }
        }
    }
}

impl std::error::Error for GateError {}

/// Checks run in order and the first failure wins. No network I/O happens here.
pub fn check_readiness(creds: &NetworkCredentials) -> Result<Ready, GateError> {
    if creds.ssid.is_empty() {
        return Err(GateError::MissingSsid);
    }
    if creds.password.is_empty() {
        return Err(GateError::MissingPassword);
    }
    match creds.update_url.strip_prefix(SECURE_SCHEME) {
        Some(rest) if !rest.is_empty() => Ok(Ready),
        _ => Err(GateError::InsecureOrMissingUrl),
    }
}
