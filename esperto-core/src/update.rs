// OTA update trigger
//
// Update flow:
// 1. Gate the credentials (no I/O on failure)
// 2. Join the network and open the image URL
// 3. Stream the image into the inactive slot, hashing as we go
// 4. Verify size and digest, then let the writer select the new slot
//
// One attempt per call. Retrying is the caller's business; the boot sequence
// never retries and restarts regardless of the outcome.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::gate::{check_readiness, GateError, NetworkCredentials};
use crate::platform::{ImageWriter, Transport};

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub chunk_size: usize,
    pub max_image_bytes: u64,
    /// Lowercase hex SHA-256 the image must match
    pub expected_sha256: Option<String>,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            expected_sha256: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    NotReady(GateError),
    TransferFailed(String),
    VerificationFailed(String),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::NotReady(e) => write!(f, "update not ready: {e}"),
            UpdateError::TransferFailed(why) => write!(f, "OTA transfer failed: {why}"),
            UpdateError::VerificationFailed(why) => write!(f, "OTA verification failed: {why}"),
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpdateError::NotReady(e) => Some(e),
            _ => None,
        }
    }
}

fn transfer(context: &str, e: anyhow::Error) -> UpdateError {
    UpdateError::TransferFailed(format!("{context}: {e:#}"))
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Make a single update attempt
pub fn attempt_update(
    creds: &NetworkCredentials,
    policy: &UpdatePolicy,
    transport: &mut impl Transport,
    writer: &mut impl ImageWriter,
) -> Result<Applied, UpdateError> {
    check_readiness(creds).map_err(UpdateError::NotReady)?;

    transport
        .join_network(&creds.ssid, &creds.password)
        .map_err(|e| transfer("join network", e))?;

    log::info!("Starting OTA update from {}", creds.update_url);
    let announced = transport
        .open(&creds.update_url)
        .map_err(|e| transfer("open", e))?;

    if let Some(len) = announced {
        if len == 0 || len > policy.max_image_bytes {
            return Err(UpdateError::TransferFailed(format!(
                "announced image size {len} outside 1..={}",
                policy.max_image_bytes
            )));
        }
    }

    writer.begin(announced).map_err(|e| transfer("begin", e))?;

    match stream_image(policy, announced, transport, writer) {
        Ok(applied) => Ok(applied),
        Err(e) => {
            writer.abort();
            Err(e)
        }
    }
}

fn stream_image(
    policy: &UpdatePolicy,
    announced: Option<u64>,
    transport: &mut impl Transport,
    writer: &mut impl ImageWriter,
) -> Result<Applied, UpdateError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; policy.chunk_size.max(1)];
    let mut total: u64 = 0;
    let mut last_progress = 0;

    loop {
        let n = transport.read(&mut buf).map_err(|e| transfer("read", e))?;
        if n == 0 {
            break;
        }
        if n > buf.len() {
            return Err(UpdateError::TransferFailed(format!(
                "transport reported {n} bytes for a {} byte buffer",
                buf.len()
            )));
        }

        total += n as u64;
        if total > policy.max_image_bytes {
            return Err(UpdateError::TransferFailed(format!(
                "image exceeds {} bytes",
                policy.max_image_bytes
            )));
        }

        let chunk = &buf[..n];
        hasher.update(chunk);
        writer.write(chunk).map_err(|e| transfer("write", e))?;

        if let Some(len) = announced {
            let progress = (total * 100 / len.max(1)).min(100);
            if progress >= last_progress + 10 {
                last_progress = progress;
                log::info!("OTA progress: {}% ({}/{})", progress, total, len);
            }
        }
    }

    if total == 0 {
        return Err(UpdateError::TransferFailed("empty image".to_string()));
    }
    if let Some(len) = announced {
        if total != len {
            return Err(UpdateError::TransferFailed(format!(
                "received {total} of {len} announced bytes"
            )));
        }
    }

    let digest = to_hex(&hasher.finalize());
    if let Some(expected) = &policy.expected_sha256 {
        if *expected != digest {
            return Err(UpdateError::VerificationFailed(format!(
                "sha256 mismatch: expected {expected}, got {digest}"
            )));
        }
    }

    writer
        .complete()
        .map_err(|e| UpdateError::VerificationFailed(format!("{e:#}")))?;

    log::info!("OTA update written: {} bytes, sha256 {}", total, digest);
    Ok(Applied {
        bytes: total,
        sha256: digest,
    })
}
