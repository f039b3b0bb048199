use anyhow::{bail, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};
use esperto_core::{LinkInfo, LinkStatus};

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
    status: LinkStatus,
    ssid: String,
}

impl WifiManager {
    pub fn new(modem: Modem, sys_loop: EspSystemEventLoop, nvs: EspDefaultNvsPartition) -> Result<Self> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
        let wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

        log::info!("WiFi manager initialized successfully");
        Ok(Self {
            wifi,
            status: LinkStatus::Disconnected,
            ssid: String::new(),
        })
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Station mode join; blocks until DHCP has handed out an address
    pub fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        self.ssid = ssid.to_string();
        self.status = LinkStatus::Connecting;
        let result = self.join(ssid, password);
        self.status = match result {
            Ok(()) => LinkStatus::Connected,
            Err(_) => LinkStatus::Failed,
        };
        self.log_info();
        result
    }

    fn join(&mut self, ssid: &str, password: &str) -> Result<()> {
        log::info!("Initializing WiFi station for SSID: '{}'", ssid);

        if ssid.is_empty() {
            log::error!("WiFi SSID is empty! Check wifi_config.h");
            bail!("WiFi SSID cannot be empty");
        }

        let cfg = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|e| {
                log::error!("Failed to convert SSID '{}': {:?}", ssid, e);
                anyhow::anyhow!("Invalid SSID format: {}", ssid)
            })?,
            password: password.try_into().map_err(|e| {
                log::error!("Failed to convert password: {:?}", e);
                anyhow::anyhow!("Invalid password format")
            })?,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        });

        self.wifi.set_configuration(&cfg)?;
        self.wifi.start()?;

        log::info!("Connecting to {}...", ssid);
        self.wifi.connect()?;

        log::info!("Waiting for DHCP...");
        self.wifi.wait_netif_up()?;
        Ok(())
    }

    pub fn get_ip(&self) -> Option<String> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|ip_info| format!("{}", ip_info.ip))
    }

    pub fn get_mac(&self) -> Option<[u8; 6]> {
        self.wifi.wifi().sta_netif().get_mac().ok()
    }

    /// Signal strength of the joined AP; `None` when not associated
    pub fn get_rssi(&self) -> Option<i32> {
        if self.status != LinkStatus::Connected {
            return None;
        }
        unsafe {
            let mut ap_info: esp_idf_sys::wifi_ap_record_t = core::mem::zeroed();
            if esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info) == esp_idf_sys::ESP_OK {
                Some(i32::from(ap_info.rssi))
            } else {
                None
            }
        }
    }

    pub fn link_info(&self) -> LinkInfo {
        LinkInfo {
            status: self.status,
            ssid: self.ssid.clone(),
            ip: self.get_ip(),
            mac: self.get_mac(),
            rssi_dbm: self.get_rssi(),
        }
    }

    pub fn log_info(&self) {
        for line in self.link_info().lines() {
            log::info!("{}", line);
        }
    }
}
