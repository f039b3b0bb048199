//! Host-based boot scenarios for ESPerto
//! These tests run on the development machine, not on the ESP32

use std::cell::Cell;

use anyhow::{bail, Result};
use esperto_core::chip::features;
use esperto_core::platform::{ChipQuery, ImageWriter, RawChip, Restarter, Ticker, Transport};

/// Chip whose queries can be made to fail
pub struct BenchChip {
    pub raw: RawChip,
    pub flash_bytes: Option<u32>,
    pub fail_chip: bool,
    pub heap_queries: Cell<u32>,
}

impl BenchChip {
    pub fn esp32() -> Self {
        Self {
            raw: RawChip {
                target: "esp32".to_string(),
                cores: 2,
                features: features::WIFI | features::BLE,
                revision: 301,
            },
            flash_bytes: Some(4 * 1024 * 1024),
            fail_chip: false,
            heap_queries: Cell::new(0),
        }
    }
}

impl ChipQuery for BenchChip {
    fn chip(&self) -> Result<RawChip> {
        if self.fail_chip {
            bail!("esp_chip_info unavailable");
        }
        Ok(self.raw.clone())
    }

    fn flash_size(&self) -> Result<u32> {
        match self.flash_bytes {
            Some(bytes) => Ok(bytes),
            None => bail!("ESP_ERR_FLASH_NOT_INITIALISED"),
        }
    }

    fn min_free_heap(&self) -> u32 {
        self.heap_queries.set(self.heap_queries.get() + 1);
        300_000
    }
}

/// Returns immediately so a ten second countdown runs instantly
#[derive(Default)]
pub struct InstantTicker {
    pub ticks: u32,
}

impl Ticker for InstantTicker {
    fn wait_tick(&mut self) {
        self.ticks += 1;
    }
}

#[derive(Default)]
pub struct CountingRestarter {
    pub restarts: u32,
}

impl Restarter for CountingRestarter {
    fn restart(&mut self) -> Result<()> {
        self.restarts += 1;
        Ok(())
    }
}

/// Serves one image, or refuses to join when `image` is `None`
#[derive(Default)]
pub struct BenchServer {
    pub image: Option<Vec<u8>>,
    pub joins: u32,
    pub opens: u32,
    offset: usize,
}

impl BenchServer {
    pub fn serving(image: &[u8]) -> Self {
        Self {
            image: Some(image.to_vec()),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }
}

impl Transport for BenchServer {
    fn join_network(&mut self, ssid: &str, _password: &str) -> Result<()> {
        self.joins += 1;
        if self.image.is_none() {
            bail!("no AP named '{}' in range", ssid);
        }
        Ok(())
    }

    fn open(&mut self, _url: &str) -> Result<Option<u64>> {
        self.opens += 1;
        self.offset = 0;
        match &self.image {
            Some(image) => Ok(Some(image.len() as u64)),
            None => bail!("not connected"),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(image) = &self.image else {
            bail!("not connected");
        };
        let n = buf.len().min(image.len() - self.offset);
        buf[..n].copy_from_slice(&image[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

#[derive(Default)]
pub struct BenchSlot {
    pub image: Vec<u8>,
    pub bootable: bool,
    pub aborted: bool,
}

impl ImageWriter for BenchSlot {
    fn begin(&mut self, _size_hint: Option<u64>) -> Result<()> {
        self.image.clear();
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.image.extend_from_slice(chunk);
        Ok(())
    }

    fn complete(&mut self) -> Result<()> {
        self.bootable = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.image.clear();
    }
}
