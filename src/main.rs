use anyhow::Result;
use esperto_core::{BootConfig, BootSequence};
use log::info;

// Generate ESP-IDF app descriptor
// Note: This macro generates warnings about cfg conditions but they're harmless
#[cfg(target_os = "espidf")]
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

mod config;
mod logging;
mod system;
mod version;

#[cfg(target_os = "espidf")]
mod network;
#[cfg(target_os = "espidf")]
mod ota;

#[cfg(not(target_os = "espidf"))]
mod host;

/// Configuration that still boots, reports and restarts when the real one is unusable
fn fallback_config(e: anyhow::Error) -> BootConfig {
    log::error!("Configuration error: {:#}. Update disabled for this boot", e);
    BootConfig {
        update_enabled: false,
        ..config::compiled_defaults()
    }
}

fn apply_log_level(level: &str) {
    if !logging::set_max_level_from_str(level) {
        log::warn!("Unknown log level '{}', keeping {}", level, log::max_level());
    }
}

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};

    use crate::network::{HttpTransport, WifiManager};
    use crate::ota::OtaManager;
    use crate::system::chip::{EspChip, EspRestarter, FreeRtosTicker};

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    logging::init_logger().map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    info!("ESPerto {}", version::full_version());
    info!("Boot reason: {}", system::reset::get_reset_reason());

    if let Err(e) = system::reset::confirm_running_slot() {
        log::warn!("Could not confirm running OTA slot: {:?}", e);
    }

    // Take peripherals, system event loop and NVS once; everything else borrows clones
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let config = config::load_or_default(nvs.clone()).unwrap_or_else(fallback_config);
    apply_log_level(&config.log_level);
    info!("Configuration loaded");

    let wifi = match WifiManager::new(peripherals.modem, sys_loop, nvs) {
        Ok(wifi) => Some(wifi),
        Err(e) => {
            log::error!("WiFi init failed: {:?}", e);
            None
        }
    };

    let chip = EspChip::new(config.target.clone());
    let mut transport = HttpTransport::new(wifi, config.http_timeout_secs);
    let mut writer = OtaManager::new();

    // The restarter never returns on hardware, so neither does this
    BootSequence::new(config).run(
        &chip,
        &mut transport,
        &mut writer,
        &mut FreeRtosTicker,
        &mut EspRestarter,
        &mut std::io::stdout(),
    )?;

    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::host::{ExitRestarter, MemorySlot, NoRadio, SimulatedChip, SleepTicker};

    logging::init_logger().map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    info!("ESPerto {} (host simulation)", version::full_version());

    let path = std::env::var_os("ESPERTO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("esperto.json"));
    let config = config::load_or_default(&path).unwrap_or_else(fallback_config);
    // ESPERTO_LOG overrides the configured level on the host
    apply_log_level(&std::env::var("ESPERTO_LOG").unwrap_or_else(|_| config.log_level.clone()));

    let chip = SimulatedChip {
        target: config.target.clone(),
    };
    let mut slot = MemorySlot::default();
    let mut ticker = SleepTicker {
        period: Duration::from_secs(1),
    };

    let report = BootSequence::new(config).run(
        &chip,
        &mut NoRadio,
        &mut slot,
        &mut ticker,
        &mut ExitRestarter,
        &mut std::io::stdout(),
    )?;

    info!(
        "Boot finished: gate {:?}, update {:?}, {} countdown lines, slot {} bytes (ready: {})",
        report.gate,
        report.update,
        report.emitted,
        slot.image.len(),
        slot.ready
    );
    if let Some(e) = &report.console_error {
        log::warn!("Console output was incomplete: {}", e);
    }
    Ok(())
}
