/// Boot sequence: the single-threaded startup path from banner to restart
use std::io::{self, Write};

use crate::chip::{self, ChipInfo, FlashConfig};
use crate::config::BootConfig;
use crate::countdown::{run_countdown, Countdown};
use crate::error::{BootError, HardwareQueryError};
use crate::gate::{check_readiness, GateError, Ready};
use crate::platform::{ChipQuery, ImageWriter, Restarter, Ticker, Transport};
use crate::update::{attempt_update, Applied, UpdateError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BootStage {
    Banner,
    ChipQuery,
    ReadinessGate,
    Update,
    Countdown,
    Complete,
}

impl BootStage {
    fn description(&self) -> &'static str {
        match self {
            BootStage::Banner => "Boot banner",
            BootStage::ChipQuery => "Reading chip info",
            BootStage::ReadinessGate => "Checking network readiness",
            BootStage::Update => "OTA update",
            BootStage::Countdown => "Restart countdown",
            BootStage::Complete => "Restart issued",
        }
    }
}

/// What happened on the way to the restart
#[derive(Debug, Default)]
pub struct BootReport {
    pub chip: Option<ChipInfo>,
    pub flash: Option<FlashConfig>,
    pub hardware_error: Option<HardwareQueryError>,
    /// First failed console write. Output is best effort and never stops the boot.
    pub console_error: Option<io::Error>,
    /// `None` when the gate was not evaluated
    pub gate: Option<Result<Ready, GateError>>,
    /// `None` when the update was skipped
    pub update: Option<Result<Applied, UpdateError>>,
    pub emitted: u32,
    pub fired: bool,
}

/// Console wrapper that swallows write errors after logging them, keeping
/// the first one for the report.
struct Console<'a, W: Write> {
    inner: &'a mut W,
    error: Option<io::Error>,
}

impl<'a, W: Write> Console<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self { inner, error: None }
    }

    fn record(&mut self, e: io::Error) {
        log::error!("Console write failed: {e}");
        if self.error.is_none() {
            self.error = Some(e);
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = self.inner.write_all(text.as_bytes()) {
            self.record(e);
        }
    }
}

impl<W: Write> Write for Console<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.record(e);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Err(e) = self.inner.flush() {
            self.record(e);
        }
        Ok(())
    }
}

pub struct BootSequence {
    config: BootConfig,
}

impl BootSequence {
    pub fn new(config: BootConfig) -> Self {
        Self { config }
    }

    /// Run every stage in order. Only a failed restart is returned as an
    /// error; everything else is recorded and the countdown still runs so the
    /// device ends in a known state.
    pub fn run(
        &self,
        query: &impl ChipQuery,
        transport: &mut impl Transport,
        writer: &mut impl ImageWriter,
        ticker: &mut impl Ticker,
        restarter: &mut impl Restarter,
        out: &mut impl Write,
    ) -> Result<BootReport, BootError> {
        let mut report = BootReport::default();
        let mut console = Console::new(out);

        self.enter(BootStage::Banner);
        console.line("Hello world!\n");

        self.enter(BootStage::ChipQuery);
        if let Err(e) = self.report_hardware(query, &mut console, &mut report) {
            log::error!("{e}");
            report.hardware_error = Some(e);
        }

        if report.hardware_error.is_some() {
            log::warn!("Skipping update after hardware query failure");
        } else if !self.config.update_enabled {
            log::info!("OTA update disabled in config, skipping");
        } else {
            self.enter(BootStage::ReadinessGate);
            let creds = self.config.credentials();
            let gate = check_readiness(&creds);
            if let Err(e) = gate {
                log::warn!("Update skipped: {e}");
            } else {
                self.enter(BootStage::Update);
                let outcome = attempt_update(&creds, &self.config.update_policy(), transport, writer);
                match &outcome {
                    Ok(applied) => log::info!("OTA update successful ({} bytes)", applied.bytes),
                    Err(e) => log::error!("OTA update failed: {e}"),
                }
                report.update = Some(outcome);
            }
            report.gate = Some(gate);
        }

        self.enter(BootStage::Countdown);
        let mut countdown = Countdown::new(self.config.countdown_secs);
        let counted = run_countdown(&mut countdown, ticker, &mut console, restarter);
        report.console_error = console.error.take();
        report.emitted = counted.map_err(BootError::Restart)?;
        report.fired = countdown.is_fired();

        self.enter(BootStage::Complete);
        Ok(report)
    }

    fn report_hardware<W: Write>(
        &self,
        query: &impl ChipQuery,
        console: &mut Console<'_, W>,
        report: &mut BootReport,
    ) -> Result<(), HardwareQueryError> {
        let info = chip::read_chip_info(query)?;
        console.line(&chip::describe(&info));
        let flash = chip::read_flash_config(query, &info);
        report.chip = Some(info);

        let flash = match flash {
            Ok(flash) => flash,
            Err(e) => {
                console.line("Get flash size failed\n");
                return Err(e);
            }
        };
        console.line(&chip::describe_flash(&flash));
        report.flash = Some(flash);

        console.line(&chip::describe_heap(query.min_free_heap()));
        Ok(())
    }

    fn enter(&self, stage: BootStage) {
        log::debug!("Boot stage: {}", stage.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RawChip;
    use crate::update::fakes::{FakeTransport, FakeWriter};

    struct FakeChip {
        fail_flash: bool,
    }

    impl ChipQuery for FakeChip {
        fn chip(&self) -> anyhow::Result<RawChip> {
            Ok(RawChip {
                target: "esp32".to_string(),
                cores: 2,
                features: 0b11,
                revision: 100,
            })
        }

        fn flash_size(&self) -> anyhow::Result<u32> {
            if self.fail_flash {
                anyhow::bail!("ESP_ERR_FLASH_NOT_INITIALISED");
            }
            Ok(4 * 1024 * 1024)
        }

        fn min_free_heap(&self) -> u32 {
            291_000
        }
    }

    struct InstantTicker;

    impl Ticker for InstantTicker {
        fn wait_tick(&mut self) {}
    }

    #[derive(Default)]
    struct CountingRestarter(u32);

    impl Restarter for CountingRestarter {
        fn restart(&mut self) -> anyhow::Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    fn config() -> BootConfig {
        BootConfig {
            wifi_ssid: "lab".to_string(),
            wifi_password: "secret".to_string(),
            update_url: "https://ota.local/fw.bin".to_string(),
            countdown_secs: 3,
            ..BootConfig::default()
        }
    }

    fn run(config: BootConfig, chip: FakeChip, transport: &mut FakeTransport) -> (BootReport, String, u32) {
        let mut writer = FakeWriter::default();
        let mut restarter = CountingRestarter::default();
        let mut console = Vec::new();
        let report = BootSequence::new(config)
            .run(&chip, transport, &mut writer, &mut InstantTicker, &mut restarter, &mut console)
            .unwrap();
        (report, String::from_utf8(console).unwrap(), restarter.0)
    }

    #[test]
    fn test_full_boot_prints_report_and_restarts() {
        let mut transport = FakeTransport::serving(b"image");
        let (report, out, restarts) = run(config(), FakeChip { fail_flash: false }, &mut transport);

        assert_eq!(
            out,
            "Hello world!\n\
             This is esp32 chip with 2 CPU core(s), WiFi/BT/BLE, silicon revision v1.0, \
             4MB embedded flash\n\
             Minimum free heap size: 291000 bytes\n\
             Restarting in 3 seconds...\n\
             Restarting in 2 seconds...\n\
             Restarting in 1 seconds...\n\
             Restarting in 0 seconds...\n\
             Restarting now.\n"
        );
        assert_eq!(report.gate, Some(Ok(Ready)));
        assert!(matches!(report.update, Some(Ok(_))));
        assert_eq!(report.emitted, 4);
        assert!(report.fired);
        assert_eq!(restarts, 1);
    }

    #[test]
    fn test_gate_failure_skips_update_but_restarts() {
        let mut transport = FakeTransport::serving(b"image");
        let bad = BootConfig {
            update_url: "http://ota.local/fw.bin".to_string(),
            ..config()
        };
        let (report, _, restarts) = run(bad, FakeChip { fail_flash: false }, &mut transport);

        assert_eq!(report.gate, Some(Err(GateError::InsecureOrMissingUrl)));
        assert!(report.update.is_none());
        assert!(!transport.joined);
        assert_eq!(restarts, 1);
    }

    #[test]
    fn test_disabled_update_never_touches_network() {
        let mut transport = FakeTransport::serving(b"image");
        let disabled = BootConfig {
            update_enabled: false,
            ..config()
        };
        let (report, _, _) = run(disabled, FakeChip { fail_flash: false }, &mut transport);

        assert!(report.gate.is_none());
        assert!(transport.opened.is_empty());
        assert!(report.fired);
    }

    #[test]
    fn test_flash_failure_still_counts_down() {
        let mut transport = FakeTransport::serving(b"image");
        let (report, out, restarts) = run(config(), FakeChip { fail_flash: true }, &mut transport);

        assert!(out.contains("Get flash size failed\n"));
        assert!(!out.contains("Minimum free heap size"));
        assert!(matches!(
            report.hardware_error,
            Some(HardwareQueryError::FlashSizeUnavailable(_))
        ));
        assert!(report.update.is_none());
        assert_eq!(report.emitted, 4);
        assert_eq!(restarts, 1);
    }

    /// Fails every write after the first `ok_writes` calls, or only the
    /// `fail_at`th write when set.
    struct FlakyUart {
        writes: u32,
        ok_writes: u32,
        fail_at: Option<u32>,
        accepted: Vec<u8>,
    }

    impl FlakyUart {
        fn dead_after(ok_writes: u32) -> Self {
            Self {
                writes: 0,
                ok_writes,
                fail_at: None,
                accepted: Vec::new(),
            }
        }

        fn glitch_at(write: u32) -> Self {
            Self {
                fail_at: Some(write),
                ..Self::dead_after(u32::MAX)
            }
        }
    }

    impl Write for FlakyUart {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            let failing = match self.fail_at {
                Some(at) => self.writes == at,
                None => self.writes > self.ok_writes,
            };
            if failing {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "uart"));
            }
            self.accepted.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if self.fail_at.is_none() && self.writes >= self.ok_writes {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "uart"));
            }
            Ok(())
        }
    }

    fn run_on(uart: &mut FlakyUart, transport: &mut FakeTransport) -> (BootReport, u32) {
        let mut writer = FakeWriter::default();
        let mut restarter = CountingRestarter::default();
        let report = BootSequence::new(config())
            .run(
                &FakeChip { fail_flash: false },
                transport,
                &mut writer,
                &mut InstantTicker,
                &mut restarter,
                uart,
            )
            .unwrap();
        (report, restarter.0)
    }

    #[test]
    fn test_dead_console_still_restarts_once() {
        for ok_writes in [0, 1, 4, 6] {
            let mut uart = FlakyUart::dead_after(ok_writes);
            let mut transport = FakeTransport::serving(b"image");
            let (report, restarts) = run_on(&mut uart, &mut transport);

            assert_eq!(restarts, 1, "ok_writes={ok_writes}");
            assert!(report.fired);
            assert_eq!(report.emitted, 4);
            assert!(report.console_error.is_some());
        }
    }

    #[test]
    fn test_console_glitch_does_not_block_update() {
        // Second write is the chip line
        let mut uart = FlakyUart::glitch_at(2);
        let mut transport = FakeTransport::serving(b"image");
        let (report, restarts) = run_on(&mut uart, &mut transport);

        assert!(report.hardware_error.is_none());
        assert!(report.chip.is_some());
        assert!(report.flash.is_some());
        assert!(transport.joined);
        assert!(matches!(report.update, Some(Ok(_))));
        assert!(report.console_error.is_some());
        assert_eq!(restarts, 1);
        let text = String::from_utf8(uart.accepted).unwrap();
        assert!(text.starts_with("Hello world!\n4MB embedded flash\n"));
    }

    #[test]
    fn test_healthy_console_reports_no_error() {
        let mut transport = FakeTransport::serving(b"image");
        let (report, _, _) = run(config(), FakeChip { fail_flash: false }, &mut transport);
        assert!(report.console_error.is_none());
    }
}
