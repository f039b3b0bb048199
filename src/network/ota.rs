use std::time::Duration;

use anyhow::{bail, Result};
use embedded_svc::http::Method;
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use esperto_core::platform::Transport;
use esperto_core::LinkStatus;

use super::wifi::WifiManager;

/// HTTPS image download over the station interface.
///
/// The connection timeout is the only bound on a stalled download; there is
/// no retry at this level.
pub struct HttpTransport {
    wifi: Option<WifiManager>,
    timeout: Duration,
    connection: Option<EspHttpConnection>,
}

impl HttpTransport {
    /// `wifi` is `None` when the driver failed to come up; joining then fails.
    pub fn new(wifi: Option<WifiManager>, timeout_secs: u32) -> Self {
        Self {
            wifi,
            timeout: Duration::from_secs(u64::from(timeout_secs)),
            connection: None,
        }
    }
}

impl Transport for HttpTransport {
    fn join_network(&mut self, ssid: &str, password: &str) -> Result<()> {
        match self.wifi.as_mut() {
            Some(wifi) if wifi.status() == LinkStatus::Connected => {
                log::info!("WiFi already connected, skipping join");
                Ok(())
            }
            Some(wifi) => wifi.connect(ssid, password),
            None => bail!("WiFi driver not available"),
        }
    }

    fn open(&mut self, url: &str) -> Result<Option<u64>> {
        let config = HttpConfig {
            buffer_size: Some(4096),
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        let mut connection = EspHttpConnection::new(&config)?;
        connection.initiate_request(Method::Get, url, &[])?;
        connection.initiate_response()?;

        let status = connection.status();
        if status != 200 {
            bail!("Failed to download firmware: HTTP {}", status);
        }

        let length = connection
            .header("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        log::info!("Firmware response: HTTP {}, {:?} bytes", status, length);

        self.connection = Some(connection);
        Ok(length)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(connection) = self.connection.as_mut() else {
            bail!("read before open");
        };
        let n = connection.read(buf)?;
        if n == 0 {
            self.connection = None;
        }
        Ok(n)
    }
}
