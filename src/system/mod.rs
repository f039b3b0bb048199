pub mod chip;

#[cfg(target_os = "espidf")]
pub mod reset;
