// Centralized version information

// Firmware version - this is what the boot banner shows
pub const FIRMWARE_VERSION: &str = "v0.2-esperto";

// Cargo package version from Cargo.toml
pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

// Full version string including Cargo version
pub fn full_version() -> String {
    format!("{} ({})", FIRMWARE_VERSION, CARGO_VERSION)
}
