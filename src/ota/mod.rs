// OTA (Over-The-Air) update module
//
// The download itself is driven by esperto_core::update; this module only
// owns the flash side: the next OTA partition and its write handle.

pub mod manager;

pub use manager::OtaManager;
