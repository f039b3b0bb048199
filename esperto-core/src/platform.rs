/// Collaborator traits implemented by the firmware (ESP-IDF) and by test fakes
use anyhow::Result;

/// What the platform reports about the chip, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChip {
    pub target: String,
    pub cores: u8,
    /// Bitset in the layout described by `chip::features`.
    pub features: u32,
    /// Full silicon revision, `major * 100 + minor`.
    pub revision: u16,
}

pub trait ChipQuery {
    fn chip(&self) -> Result<RawChip>;
    fn flash_size(&self) -> Result<u32>;
    fn min_free_heap(&self) -> u32;
}

/// One countdown step. Blocks for a second on real hardware.
pub trait Ticker {
    fn wait_tick(&mut self);
}

pub trait Restarter {
    /// On hardware this does not return.
    fn restart(&mut self) -> Result<()>;
}

/// Network side of an update: join the access point, then stream one image.
pub trait Transport {
    fn join_network(&mut self, ssid: &str, password: &str) -> Result<()>;
    /// Open the image URL; returns the announced content length if any.
    fn open(&mut self, url: &str) -> Result<Option<u64>>;
    /// Returns 0 at end of image.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Flash side of an update: the inactive OTA slot.
pub trait ImageWriter {
    fn begin(&mut self, size_hint: Option<u64>) -> Result<()>;
    fn write(&mut self, chunk: &[u8]) -> Result<()>;
    /// Validate the image and select it for the next boot.
    fn complete(&mut self) -> Result<()>;
    fn abort(&mut self);
}
