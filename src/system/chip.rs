/// Chip query and restart primitives backed by ESP-IDF
use esperto_core::chip::features;

// esp_chip_info() feature bits (esp_chip_info.h). These are BIT(n) macros,
// which bindgen does not export.
const IDF_EMB_FLASH: u32 = 1 << 0;
const IDF_WIFI_BGN: u32 = 1 << 1;
const IDF_BLE: u32 = 1 << 4;
const IDF_BT: u32 = 1 << 5;

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
/// Translate the ESP-IDF feature word into the descriptor's bit layout.
/// Classic BT and BLE both land on the BLE bit.
pub fn map_idf_features(idf: u32) -> u32 {
    let mut out = 0;
    if idf & IDF_EMB_FLASH != 0 {
        out |= features::EMB_FLASH;
    }
    if idf & IDF_WIFI_BGN != 0 {
        out |= features::WIFI;
    }
    if idf & (IDF_BLE | IDF_BT) != 0 {
        out |= features::BLE;
    }
    out
}

#[cfg(target_os = "espidf")]
pub use self::esp::{EspChip, EspRestarter, FreeRtosTicker};

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::Result;
    use esp_idf_sys::{esp, esp_chip_info, esp_chip_info_t};
    use esperto_core::platform::{ChipQuery, RawChip, Restarter, Ticker};

    pub struct EspChip {
        target: String,
    }

    impl EspChip {
        pub fn new(target: String) -> Self {
            Self { target }
        }
    }

    impl ChipQuery for EspChip {
        fn chip(&self) -> Result<RawChip> {
            let mut info: esp_chip_info_t = unsafe { core::mem::zeroed() };
            unsafe { esp_chip_info(&mut info) };

            Ok(RawChip {
                target: self.target.clone(),
                cores: info.cores,
                features: super::map_idf_features(info.features),
                revision: info.revision,
            })
        }

        fn flash_size(&self) -> Result<u32> {
            let mut size = 0u32;
            esp!(unsafe { esp_idf_sys::esp_flash_get_size(core::ptr::null_mut(), &mut size) })?;
            Ok(size)
        }

        fn min_free_heap(&self) -> u32 {
            unsafe { esp_idf_sys::esp_get_minimum_free_heap_size() }
        }
    }

    /// One second per tick, yielding to FreeRTOS
    pub struct FreeRtosTicker;

    impl Ticker for FreeRtosTicker {
        fn wait_tick(&mut self) {
            esp_idf_hal::delay::FreeRtos::delay_ms(1000);
        }
    }

    pub struct EspRestarter;

    impl Restarter for EspRestarter {
        fn restart(&mut self) -> Result<()> {
            // Ensure log is flushed
            log::logger().flush();
            unsafe { esp_idf_sys::esp_restart() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esp32_feature_word() {
        // ESP32 with embedded flash: EMB_FLASH | WIFI_BGN | BLE | BT
        let idf = IDF_EMB_FLASH | IDF_WIFI_BGN | IDF_BLE | IDF_BT;
        assert_eq!(map_idf_features(idf), 0b111);
    }

    #[test]
    fn test_esp32s2_has_no_bluetooth() {
        assert_eq!(map_idf_features(IDF_WIFI_BGN), features::WIFI);
    }

    #[test]
    fn test_ble_only_parts() {
        assert_eq!(map_idf_features(IDF_WIFI_BGN | IDF_BLE), features::WIFI | features::BLE);
    }
}
