use std::fs;
use std::path::Path;

/// `#define NAME "value"` lines read from wifi_config.h, mapped to rustc env vars
const DEFINES: &[(&str, &str)] = &[
    ("WIFI_SSID", "WIFI_SSID"),
    ("WIFI_PASS", "WIFI_PASSWORD"),
    ("WIFI_PASSWORD", "WIFI_PASSWORD"),
    ("OTA_URL", "OTA_URL"),
];

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    println!("cargo:rerun-if-changed=wifi_config.h");
    println!("cargo:rerun-if-env-changed=ESP_IDF_TARGET");
    println!("cargo:rerun-if-env-changed=MCU");

    // Chip name for the "This is {TARGET} chip" line. esp-idf-sys reads the
    // target from MCU, so honour it after ESP_IDF_TARGET.
    let target = std::env::var("ESP_IDF_TARGET")
        .or_else(|_| std::env::var("MCU"))
        .unwrap_or_else(|_| "esp32".to_string());
    println!("cargo:rustc-env=ESPERTO_TARGET={}", target);

    // Read WiFi/OTA configuration if it exists
    let config_path = "wifi_config.h";
    let mut found: Vec<(&str, String)> = Vec::new();
    if Path::new(config_path).exists() {
        let contents = fs::read_to_string(config_path)?;

        for line in contents.lines() {
            let mut parts = line.split_whitespace();
            if parts.next() != Some("#define") {
                continue;
            }
            let Some(name) = parts.next() else { continue };
            let Some(&(_, env_name)) = DEFINES.iter().find(|(define, _)| *define == name) else {
                continue;
            };
            if let Some(value) = line.split('"').nth(1) {
                found.push((env_name, value.to_string()));
            }
        }
    } else {
        println!("cargo:warning=wifi_config.h not found! Copy wifi_config.h.example to wifi_config.h and add your credentials.");
    }

    // Use empty defaults for anything the file did not set
    for env_name in ["WIFI_SSID", "WIFI_PASSWORD", "OTA_URL"] {
        let value = found
            .iter()
            .find(|(name, _)| *name == env_name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        println!("cargo:rustc-env={}={}", env_name, value);
    }

    Ok(())
}
