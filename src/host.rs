/// Host simulation backend
///
/// Lets the boot path run on a development machine: a simulated dual-core
/// chip, an in-memory OTA slot and a transport with no radio behind it.
use std::time::Duration;

use anyhow::{bail, Result};
use esperto_core::chip::features;
use esperto_core::platform::{ChipQuery, ImageWriter, RawChip, Restarter, Ticker, Transport};

pub struct SimulatedChip {
    pub target: String,
}

impl ChipQuery for SimulatedChip {
    fn chip(&self) -> Result<RawChip> {
        Ok(RawChip {
            target: self.target.clone(),
            cores: 2,
            features: features::EMB_FLASH | features::WIFI | features::BLE,
            revision: 100,
        })
    }

    fn flash_size(&self) -> Result<u32> {
        Ok(4 * 1024 * 1024)
    }

    fn min_free_heap(&self) -> u32 {
        0
    }
}

/// Sleeps for real so the countdown reads like it does on the device
pub struct SleepTicker {
    pub period: Duration,
}

impl Ticker for SleepTicker {
    fn wait_tick(&mut self) {
        std::thread::sleep(self.period);
    }
}

/// The host has no radio, so every join fails and the update reports a
/// transfer failure.
pub struct NoRadio;

impl Transport for NoRadio {
    fn join_network(&mut self, ssid: &str, _password: &str) -> Result<()> {
        bail!("no WiFi radio on host, cannot join '{}'", ssid)
    }

    fn open(&mut self, _url: &str) -> Result<Option<u64>> {
        bail!("not connected")
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        bail!("not connected")
    }
}

#[derive(Default)]
pub struct MemorySlot {
    pub image: Vec<u8>,
    pub ready: bool,
}

impl ImageWriter for MemorySlot {
    fn begin(&mut self, size_hint: Option<u64>) -> Result<()> {
        self.image.clear();
        if let Some(size) = size_hint {
            self.image.reserve(size as usize);
        }
        self.ready = false;
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.image.extend_from_slice(chunk);
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        self.ready = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.image.clear();
    }
}

/// Ends the process instead of rebooting
pub struct ExitRestarter;

impl Restarter for ExitRestarter {
    fn restart(&mut self) -> Result<()> {
        log::info!("Restart requested; host simulation ends here");
        Ok(())
    }
}
