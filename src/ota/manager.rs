// OTA Manager - writes firmware into the next OTA slot using the ESP-IDF OTA API

use core::ffi::c_void;
use std::fmt;

use anyhow::Result;
use esp_idf_sys::{
    esp, esp_ota_abort, esp_ota_begin, esp_ota_end, esp_ota_get_next_update_partition,
    esp_ota_handle_t, esp_ota_set_boot_partition, esp_ota_write, esp_partition_t,
    ESP_ERR_OTA_VALIDATE_FAILED,
};
use esperto_core::platform::ImageWriter;

/// esp_ota_begin() size for "erase the whole slot", from esp_ota_ops.h
const OTA_SIZE_UNKNOWN: usize = 0xffff_ffff;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OtaStatus {
    Idle,
    Writing { bytes: u64 },
    Verifying,
    Ready,
    Failed,
}

#[derive(Debug)]
pub enum OtaError {
    NoUpdatePartition,
    NotStarted,
    ValidationFailed,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtaError::NoUpdatePartition => write!(f, "no OTA update partition"),
            OtaError::NotStarted => write!(f, "OTA write not started"),
            OtaError::ValidationFailed => write!(f, "image failed validation"),
        }
    }
}

impl std::error::Error for OtaError {}

pub struct OtaManager {
    update_partition: *const esp_partition_t,
    ota_handle: Option<esp_ota_handle_t>,
    status: OtaStatus,
}

impl OtaManager {
    /// The partition is looked up on `begin`, so a missing slot only fails
    /// the update attempt, not the boot.
    pub fn new() -> Self {
        Self {
            update_partition: core::ptr::null(),
            ota_handle: None,
            status: OtaStatus::Idle,
        }
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for OtaManager {
    fn begin(&mut self, size_hint: Option<u64>) -> Result<()> {
        let partition = unsafe { esp_ota_get_next_update_partition(core::ptr::null()) };
        if partition.is_null() {
            return Err(OtaError::NoUpdatePartition.into());
        }

        let size = size_hint.map_or(OTA_SIZE_UNKNOWN, |s| s as usize);
        let mut handle: esp_ota_handle_t = 0;
        esp!(unsafe { esp_ota_begin(partition, size, &mut handle) })?;

        self.update_partition = partition;
        self.ota_handle = Some(handle);
        self.status = OtaStatus::Writing { bytes: 0 };
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let handle = self.ota_handle.ok_or(OtaError::NotStarted)?;

        if let Err(e) = esp!(unsafe { esp_ota_write(handle, chunk.as_ptr() as *const c_void, chunk.len()) }) {
            self.status = OtaStatus::Failed;
            return Err(e.into());
        }

        if let OtaStatus::Writing { bytes } = self.status {
            self.status = OtaStatus::Writing {
                bytes: bytes + chunk.len() as u64,
            };
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        let handle = self.ota_handle.take().ok_or(OtaError::NotStarted)?;

        self.status = OtaStatus::Verifying;

        // End the OTA update; this checks the image header and digest
        let result = unsafe { esp_ota_end(handle) };
        if result == ESP_ERR_OTA_VALIDATE_FAILED as i32 {
            self.status = OtaStatus::Failed;
            return Err(OtaError::ValidationFailed.into());
        }
        if let Err(e) = esp!(result) {
            self.status = OtaStatus::Failed;
            return Err(e.into());
        }

        // Set the new boot partition
        if let Err(e) = esp!(unsafe { esp_ota_set_boot_partition(self.update_partition) }) {
            self.status = OtaStatus::Failed;
            return Err(e.into());
        }

        self.status = OtaStatus::Ready;
        log::info!("OTA image accepted, next boot uses the new slot");
        Ok(())
    }

    fn abort(&mut self) {
        log::warn!("Aborting OTA write ({:?})", self.status);
        if let Some(handle) = self.ota_handle.take() {
            unsafe {
                esp_ota_abort(handle);
            }
        }
        self.status = OtaStatus::Failed;
    }
}

impl Drop for OtaManager {
    fn drop(&mut self) {
        // Clean up any ongoing OTA operation
        if let Some(handle) = self.ota_handle.take() {
            unsafe {
                esp_ota_abort(handle);
            }
        }
    }
}
