use anyhow::Result;
use esperto_core::BootConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "esperto";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &str = "config";

/// Compiled-in configuration.
///
/// WiFi credentials and the OTA URL come from environment variables set by
/// build.rs, which reads them from wifi_config.h (NOT committed to git).
pub fn compiled_defaults() -> BootConfig {
    let config = BootConfig {
        target: env!("ESPERTO_TARGET").to_string(),
        wifi_ssid: env!("WIFI_SSID").to_string(),
        wifi_password: env!("WIFI_PASSWORD").to_string(),
        update_url: env!("OTA_URL").to_string(),
        update_enabled: !cfg!(feature = "skip_update"),
        ..BootConfig::default()
    };

    log::info!(
        "Config default: SSID='{}', Password={}, OTA URL='{}'",
        config.wifi_ssid,
        if config.wifi_password.is_empty() { "<empty>" } else { "<set>" },
        config.update_url
    );
    config
}

/// Stored values win, except empty credentials which fall back to the
/// compiled-in ones.
pub fn merge_with_defaults(mut stored: BootConfig, defaults: &BootConfig) -> BootConfig {
    if stored.wifi_ssid.is_empty() || stored.wifi_password.is_empty() {
        log::warn!(
            "Stored WiFi credentials empty, using compiled defaults: SSID='{}'",
            defaults.wifi_ssid
        );
        stored.wifi_ssid = defaults.wifi_ssid.clone();
        stored.wifi_password = defaults.wifi_password.clone();
    }
    if stored.update_url.is_empty() {
        stored.update_url = defaults.update_url.clone();
    }
    stored.target = defaults.target.clone();
    stored
}

/// Validated configuration: compiled defaults overlaid with NVS
#[cfg(target_os = "espidf")]
pub fn load_or_default(nvs_partition: EspDefaultNvsPartition) -> Result<BootConfig> {
    let defaults = compiled_defaults();

    match load_from_nvs(nvs_partition.clone()) {
        Ok(Some(stored)) => {
            log::info!("Loaded configuration from NVS");
            let config = merge_with_defaults(stored, &defaults);
            match config.validate() {
                Ok(()) => return Ok(config),
                Err(e) => log::error!("Stored configuration rejected: {}", e),
            }
        }
        Ok(None) => {
            log::info!("No configuration in NVS, saving defaults");
            if let Err(e) = save_to_nvs(nvs_partition, &defaults) {
                log::warn!("Failed to save default config to NVS: {:?}", e);
            }
        }
        Err(e) => log::warn!("Failed to load config from NVS: {:?}, using defaults", e),
    }

    defaults.validate()?;
    Ok(defaults)
}

/// Host builds read an optional JSON file instead of NVS
#[cfg(not(target_os = "espidf"))]
pub fn load_or_default(path: &std::path::Path) -> Result<BootConfig> {
    let defaults = compiled_defaults();

    match std::fs::read(path) {
        Ok(bytes) => {
            let stored = BootConfig::from_json(&bytes)?;
            log::info!("Loaded configuration from {}", path.display());
            let config = merge_with_defaults(stored, &defaults);
            config.validate()?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("{} not found, using compiled defaults", path.display());
            defaults.validate()?;
            Ok(defaults)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(target_os = "espidf")]
fn load_from_nvs(nvs_partition: EspDefaultNvsPartition) -> Result<Option<BootConfig>> {
    let nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;

    let mut buf = vec![0u8; 2048]; // Max config size
    match nvs.get_blob(CONFIG_KEY, &mut buf)? {
        Some(data) => Ok(Some(BootConfig::from_json(data)?)),
        None => Ok(None),
    }
}

#[cfg(target_os = "espidf")]
fn save_to_nvs(nvs_partition: EspDefaultNvsPartition, config: &BootConfig) -> Result<()> {
    let mut nvs = EspNvs::new(nvs_partition, CONFIG_NAMESPACE, true)?;

    let json = config.to_json()?;
    nvs.set_blob(CONFIG_KEY, &json)?;
    log::info!("Configuration saved to NVS");

    Ok(())
}
