/// Restart countdown as a pure state machine
///
/// The sequencer never sleeps itself: a [`Ticker`] supplies the one second
/// between emissions, so tests drive it without real time passing.
use std::io::Write;

use crate::platform::{Restarter, Ticker};

pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Counting(u32),
    /// The `n = 0` line is out; the next tick fires.
    Due,
    Fired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Emit(u32),
    Fire,
}

impl Tick {
    /// Console line for an emission; `None` for the fire step
    pub fn message(&self) -> Option<String> {
        match self {
            Tick::Emit(n) => Some(format!("Restarting in {n} seconds...\n")),
            Tick::Fire => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Countdown {
    state: State,
}

impl Countdown {
    pub fn new(start: u32) -> Self {
        Self {
            state: State::Counting(start),
        }
    }

    /// Advance one step. Returns `None` once the countdown has fired.
    pub fn tick(&mut self) -> Option<Tick> {
        match self.state {
            State::Counting(0) => {
                self.state = State::Due;
                Some(Tick::Emit(0))
            }
            State::Counting(n) => {
                self.state = State::Counting(n - 1);
                Some(Tick::Emit(n))
            }
            State::Due => {
                self.state = State::Fired;
                Some(Tick::Fire)
            }
            State::Fired => None,
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            State::Counting(n) => Some(n),
            State::Due | State::Fired => None,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.state == State::Fired
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS)
    }
}

/// Drive a countdown to completion and perform the restart.
///
/// Returns the number of emissions. Console output is best effort: a failed
/// write is logged and the countdown carries on to the restart. A failed
/// restart is logged and returned; nothing retries it.
pub fn run_countdown(
    countdown: &mut Countdown,
    ticker: &mut impl Ticker,
    console: &mut impl Write,
    restarter: &mut impl Restarter,
) -> anyhow::Result<u32> {
    let mut emitted = 0;

    while let Some(tick) = countdown.tick() {
        match tick {
            Tick::Emit(_) => {
                if let Some(line) = tick.message() {
                    if let Err(e) = console.write_all(line.as_bytes()) {
                        log::error!("Countdown line lost: {e}");
                    }
                }
                emitted += 1;
                ticker.wait_tick();
            }
            Tick::Fire => {
                if let Err(e) = console.write_all(b"Restarting now.\n").and_then(|()| console.flush()) {
                    log::error!("Restart notice lost: {e}");
                }
                if let Err(e) = restarter.restart() {
                    log::error!("Restart failed: {e:#}");
                    return Err(e);
                }
            }
        }
    }

    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Default)]
    struct CountingTicker(u32);

    impl Ticker for CountingTicker {
        fn wait_tick(&mut self) {
            self.0 += 1;
        }
    }

    #[derive(Default)]
    struct RecordingRestarter {
        calls: u32,
        fail: bool,
    }

    impl Restarter for RecordingRestarter {
        fn restart(&mut self) -> anyhow::Result<()> {
            self.calls += 1;
            if self.fail {
                anyhow::bail!("esp_restart returned");
            }
            Ok(())
        }
    }

    fn drain(countdown: &mut Countdown) -> Vec<Tick> {
        std::iter::from_fn(|| countdown.tick()).collect()
    }

    #[test]
    fn test_default_countdown_emits_eleven_messages() {
        let mut countdown = Countdown::default();
        let messages: Vec<String> = drain(&mut countdown)
            .iter()
            .filter_map(Tick::message)
            .collect();

        assert_eq!(messages.len(), 11);
        assert_eq!(messages[0], "Restarting in 10 seconds...\n");
        assert_eq!(messages[10], "Restarting in 0 seconds...\n");
        assert!(countdown.is_fired());
    }

    #[test]
    fn test_zero_countdown_emits_once_then_fires() {
        let mut countdown = Countdown::new(0);
        assert_eq!(countdown.tick(), Some(Tick::Emit(0)));
        assert_eq!(countdown.remaining(), None);
        assert_eq!(countdown.tick(), Some(Tick::Fire));
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn test_run_countdown_writes_exact_lines() {
        let mut countdown = Countdown::new(2);
        let mut ticker = CountingTicker::default();
        let mut console = Vec::new();
        let mut restarter = RecordingRestarter::default();

        let emitted = run_countdown(&mut countdown, &mut ticker, &mut console, &mut restarter).unwrap();

        assert_eq!(emitted, 3);
        assert_eq!(ticker.0, 3);
        assert_eq!(restarter.calls, 1);
        assert_eq!(
            String::from_utf8(console).unwrap(),
            "Restarting in 2 seconds...\nRestarting in 1 seconds...\nRestarting in 0 seconds...\nRestarting now.\n"
        );
    }

    #[test]
    fn test_failed_restart_is_reported_once() {
        let mut countdown = Countdown::new(1);
        let mut restarter = RecordingRestarter { calls: 0, fail: true };

        let result = run_countdown(
            &mut countdown,
            &mut CountingTicker::default(),
            &mut Vec::new(),
            &mut restarter,
        );

        assert!(result.is_err());
        assert_eq!(restarter.calls, 1);
        assert!(countdown.is_fired());
    }

    struct BrokenConsole;

    impl Write for BrokenConsole {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "uart"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "uart"))
        }
    }

    #[test]
    fn test_broken_console_still_restarts() {
        let mut countdown = Countdown::new(3);
        let mut ticker = CountingTicker::default();
        let mut restarter = RecordingRestarter::default();

        let emitted = run_countdown(&mut countdown, &mut ticker, &mut BrokenConsole, &mut restarter).unwrap();

        assert_eq!(emitted, 4);
        assert_eq!(ticker.0, 4);
        assert_eq!(restarter.calls, 1);
        assert!(countdown.is_fired());
    }

    proptest! {
        #[test]
        fn prop_emits_n_plus_one_strictly_decreasing(n in 0u32..500) {
            let mut countdown = Countdown::new(n);
            let ticks = drain(&mut countdown);

            prop_assert_eq!(ticks.len() as u32, n + 2);
            prop_assert_eq!(ticks.last(), Some(&Tick::Fire));

            let emitted: Vec<u32> = ticks
                .iter()
                .filter_map(|t| match t {
                    Tick::Emit(k) => Some(*k),
                    Tick::Fire => None,
                })
                .collect();
            let expected: Vec<u32> = (0..=n).rev().collect();
            prop_assert_eq!(emitted, expected);
        }
    }
}
