pub mod ota;
pub mod wifi;

pub use ota::HttpTransport;
pub use wifi::WifiManager;
