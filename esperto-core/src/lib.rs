//! ESPerto Core - Hardware-independent boot and update logic
//!
//! This crate contains the boot sequencer, chip reporting, readiness gate and
//! OTA trigger. Everything that touches hardware goes through the traits in
//! [`platform`], so the whole boot path can be tested on the host platform
//! without requiring ESP32 hardware.

pub mod boot;
pub mod chip;
pub mod config;
pub mod countdown;
pub mod error;
pub mod gate;
pub mod link;
pub mod platform;
pub mod update;

pub use boot::{BootReport, BootSequence};
pub use chip::{
    describe, describe_flash, describe_heap, read_chip_info, read_flash_config, ChipInfo, FlashConfig, FlashKind,
};
pub use config::BootConfig;
pub use countdown::{run_countdown, Countdown, Tick};
pub use error::{BootError, ConfigError, HardwareQueryError};
pub use gate::{check_readiness, GateError, NetworkCredentials, Ready};
pub use link::{format_mac, LinkInfo, LinkStatus};
pub use update::{attempt_update, Applied, UpdateError, UpdatePolicy};
