/// Station link status and the info block logged after joining
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Disconnected => "Disconnected",
            LinkStatus::Connecting => "Connecting",
            LinkStatus::Connected => "Connected",
            LinkStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the station interface. Fields the driver could not answer are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkInfo {
    pub status: LinkStatus,
    pub ssid: String,
    pub ip: Option<String>,
    pub mac: Option<[u8; 6]>,
    pub rssi_dbm: Option<i32>,
}

/// `AA:BB:CC:DD:EE:FF`
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":")
}

impl LinkInfo {
    /// Report lines; RSSI only appears while connected
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("WiFi Status: {}", self.status),
            format!("SSID: {}", self.ssid),
            format!("IP Address: {}", self.ip.as_deref().unwrap_or("")),
            format!("MAC Address: {}", self.mac.as_ref().map(format_mac).unwrap_or_default()),
        ];
        if let (LinkStatus::Connected, Some(rssi)) = (self.status, self.rssi_dbm) {
            lines.push(format!("RSSI: {rssi} dBm"));
        }
        lines
    }
}
