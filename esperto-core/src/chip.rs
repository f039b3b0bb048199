/// Chip descriptor: capability flags read once at boot, plus the summary lines
/// printed on the serial console.
use crate::error::HardwareQueryError;
use crate::platform::ChipQuery;

/// Feature bits carried in [`ChipInfo::features`]
pub mod features {
    pub const EMB_FLASH: u32 = 1 << 0;
    pub const WIFI: u32 = 1 << 1;
    pub const BLE: u32 = 1 << 2;

    /// The radio bits. Either one lights up both the BT and the BLE label.
    pub const RADIO: u32 = WIFI | BLE;
}

const MIB: u32 = 1024 * 1024;

/// Ordered label table for the `WiFi{labels}` part of the chip line
const RADIO_LABELS: &[(u32, &str)] = &[(features::RADIO, "/BT"), (features::RADIO, "/BLE")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipInfo {
    target: String,
    cores: u8,
    features: u32,
    major_rev: u16,
    minor_rev: u16,
}

impl ChipInfo {
    pub fn new(
        target: impl Into<String>,
        cores: u8,
        features: u32,
        major_rev: u16,
        minor_rev: u16,
    ) -> Result<Self, HardwareQueryError> {
        if cores == 0 {
            return Err(HardwareQueryError::NoCores);
        }
        Ok(Self {
            target: target.into(),
            cores,
            features,
            major_rev,
            minor_rev,
        })
    }

    /// Build from an ESP-IDF style full revision (`major * 100 + minor`)
    pub fn from_revision(
        target: impl Into<String>,
        cores: u8,
        features: u32,
        revision: u16,
    ) -> Result<Self, HardwareQueryError> {
        Self::new(target, cores, features, revision / 100, revision % 100)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn cores(&self) -> u8 {
        self.cores
    }

    pub fn features(&self) -> u32 {
        self.features
    }

    pub fn revision(&self) -> (u16, u16) {
        (self.major_rev, self.minor_rev)
    }

    pub fn has(&self, mask: u32) -> bool {
        self.features & mask != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Embedded,
    External,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Embedded => "embedded",
            FlashKind::External => "external",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashConfig {
    size_bytes: u32,
    kind: FlashKind,
}

impl FlashConfig {
    /// Flash kind comes from the chip's embedded-flash bit
    pub fn new(size_bytes: u32, chip: &ChipInfo) -> Result<Self, HardwareQueryError> {
        if size_bytes == 0 {
            return Err(HardwareQueryError::FlashSizeUnavailable(
                "flash size reported as zero".to_string(),
            ));
        }
        let kind = if chip.has(features::EMB_FLASH) {
            FlashKind::Embedded
        } else {
            FlashKind::External
        };
        Ok(Self { size_bytes, kind })
    }

    pub fn size_bytes(&self) -> u32 {
        self.size_bytes
    }

    pub fn kind(&self) -> FlashKind {
        self.kind
    }
}

/// Query the platform once and validate what it reports
pub fn read_chip_info(query: &impl ChipQuery) -> Result<ChipInfo, HardwareQueryError> {
    let raw = query
        .chip()
        .map_err(|e| HardwareQueryError::ChipInfoUnavailable(format!("{e:#}")))?;
    let chip = ChipInfo::from_revision(raw.target, raw.cores, raw.features, raw.revision)?;
    log::debug!(
        "Chip query: {} cores, features {:#05b}, rev {:?}",
        chip.cores,
        chip.features,
        chip.revision()
    );
    Ok(chip)
}

/// Read the flash size and pair it with the chip's flash kind
pub fn read_flash_config(query: &impl ChipQuery, chip: &ChipInfo) -> Result<FlashConfig, HardwareQueryError> {
    let size = query
        .flash_size()
        .map_err(|e| HardwareQueryError::FlashSizeUnavailable(format!("{e:#}")))?;
    FlashConfig::new(size, chip)
}

/// Chip summary. The trailing ", " is part of the line; the flash line follows it.
pub fn describe(chip: &ChipInfo) -> String {
    let labels: String = RADIO_LABELS
        .iter()
        .filter(|(mask, _)| chip.has(*mask))
        .map(|(_, label)| *label)
        .collect();

    format!(
        "This is {} chip with {} CPU core(s), WiFi{}, silicon revision v{}.{}, ",
        chip.target, chip.cores, labels, chip.major_rev, chip.minor_rev
    )
}

/// Whole megabytes only; sizes are multiples of 1 MiB on every supported part.
pub fn describe_flash(flash: &FlashConfig) -> String {
    format!("{}MB {} flash\n", flash.size_bytes / MIB, flash.kind.as_str())
}

pub fn describe_heap(min_free_bytes: u32) -> String {
    format!("Minimum free heap size: {min_free_bytes} bytes\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RawChip;

    struct FakeChip {
        raw: Option<RawChip>,
        flash: u32,
    }

    impl ChipQuery for FakeChip {
        fn chip(&self) -> anyhow::Result<RawChip> {
            self.raw.clone().ok_or_else(|| anyhow::anyhow!("esp_chip_info unavailable"))
        }

        fn flash_size(&self) -> anyhow::Result<u32> {
            Ok(self.flash)
        }

        fn min_free_heap(&self) -> u32 {
            0
        }
    }

    #[test]
    fn test_describe_dual_core_with_radio() {
        let chip = ChipInfo::new("esp32", 2, 0b11, 1, 0).unwrap();
        let line = describe(&chip);

        assert!(line.contains("2 CPU core(s)"));
        assert!(line.contains("/BT"));
        assert!(line.contains("/BLE"));
        assert!(line.contains("v1.0"));
        assert_eq!(
            line,
            "This is esp32 chip with 2 CPU core(s), WiFi/BT/BLE, silicon revision v1.0, "
        );
    }

    #[test]
    fn test_describe_without_radio_labels() {
        let chip = ChipInfo::new("esp32s2", 1, features::EMB_FLASH, 0, 3).unwrap();
        assert_eq!(
            describe(&chip),
            "This is esp32s2 chip with 1 CPU core(s), WiFi, silicon revision v0.3, "
        );
    }

    #[test]
    fn test_ble_bit_alone_shows_both_labels() {
        let chip = ChipInfo::new("esp32c3", 1, features::BLE, 0, 4).unwrap();
        assert!(describe(&chip).contains("WiFi/BT/BLE"));
    }

    #[test]
    fn test_revision_split() {
        let chip = ChipInfo::from_revision("esp32s3", 2, 0, 102).unwrap();
        assert_eq!(chip.revision(), (1, 2));
        assert!(describe(&chip).ends_with("silicon revision v1.2, "));
    }

    #[test]
    fn test_zero_cores_rejected() {
        assert_eq!(
            ChipInfo::new("esp32", 0, 0, 0, 0),
            Err(HardwareQueryError::NoCores)
        );
    }

    #[test]
    fn test_describe_flash_embedded() {
        let chip = ChipInfo::new("esp32", 2, 0b01, 1, 0).unwrap();
        let flash = FlashConfig::new(4 * 1024 * 1024, &chip).unwrap();
        assert_eq!(describe_flash(&flash), "4MB embedded flash\n");
    }

    #[test]
    fn test_describe_flash_external() {
        let chip = ChipInfo::new("esp32", 2, 0b10, 1, 0).unwrap();
        let flash = FlashConfig::new(16 * 1024 * 1024, &chip).unwrap();
        assert_eq!(flash.kind(), FlashKind::External);
        assert_eq!(describe_flash(&flash), "16MB external flash\n");
    }

    #[test]
    fn test_zero_flash_rejected() {
        let chip = ChipInfo::new("esp32", 2, 0, 1, 0).unwrap();
        assert!(matches!(
            FlashConfig::new(0, &chip),
            Err(HardwareQueryError::FlashSizeUnavailable(_))
        ));
    }

    #[test]
    fn test_describe_heap() {
        assert_eq!(describe_heap(280_120), "Minimum free heap size: 280120 bytes\n");
    }

    #[test]
    fn test_read_chip_info_maps_query_failure() {
        let query = FakeChip { raw: None, flash: 0 };
        let err = read_chip_info(&query).unwrap_err();
        assert!(matches!(err, HardwareQueryError::ChipInfoUnavailable(_)));
    }

    #[test]
    fn test_read_chip_and_flash() {
        let query = FakeChip {
            raw: Some(RawChip {
                target: "esp32".to_string(),
                cores: 2,
                features: 0b11,
                revision: 301,
            }),
            flash: 8 * 1024 * 1024,
        };
        let chip = read_chip_info(&query).unwrap();
        assert_eq!(chip.revision(), (3, 1));

        let flash = read_flash_config(&query, &chip).unwrap();
        assert_eq!(describe_flash(&flash), "8MB embedded flash\n");
    }
}
