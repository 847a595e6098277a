//! Hardware seam. Digital lines are `embedded-hal` 1.0 pins (rppal on a real
//! board, `sim` in tests); the ADC, clock and delay capabilities are local
//! traits.

use embedded_hal::digital::{ErrorKind, OutputPin, PinState};
use std::future::Future;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("{pin}: {detail} ({kind:?})")]
    Pin {
        pin: String,
        kind: ErrorKind,
        detail: String,
    },
    #[error("{pin}: {source}")]
    Io {
        pin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{pin}: unexpected value {value:?}")]
    BadValue { pin: String, value: String },
    #[error("{0}: injected fault")]
    Fault(String),
}

impl HalError {
    /// Wraps the error of an embedded-hal pin.
    pub fn pin<E: embedded_hal::digital::Error>(pin: &str, e: E) -> Self {
        HalError::Pin { pin: pin.to_string(), kind: e.kind(), detail: format!("{:?}", e) }
    }
}

/// Raw ADC sample in `0..=adc_max`.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<u16, HalError>;
}

/// Output slot with nothing wired to it (optional indicator LEDs).
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconnected;

impl embedded_hal::digital::ErrorType for Unconnected {
    type Error = core::convert::Infallible;
}

impl OutputPin for Unconnected {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Time since the device came up.
pub trait Clock {
    fn uptime(&self) -> Duration;
}

/// Blocking delay between the steps of a cycle.
pub trait Pacer {
    fn pause(&mut self, d: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    boot: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self { boot: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn uptime(&self) -> Duration {
        self.boot.elapsed()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn pause(&mut self, d: Duration) {
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

// Object-safe view of any `OutputPin`, whatever its error type.
trait Drive: Send {
    fn drive(&mut self, name: &str, state: PinState) -> Result<(), HalError>;
}

impl<P: OutputPin + Send> Drive for P {
    fn drive(&mut self, name: &str, state: PinState) -> Result<(), HalError> {
        self.set_state(state).map_err(|e| HalError::pin(name, e))
    }
}

/// Output line with its electrical polarity.
pub struct OutputLine {
    name: &'static str,
    pin: Box<dyn Drive>,
    active_low: bool,
}

impl OutputLine {
    pub fn new<P: OutputPin + Send + 'static>(name: &'static str, pin: P, active_low: bool) -> Self {
        Self { name, pin: Box::new(pin), active_low }
    }

    /// Electrical level that leaves a line of this polarity switched off.
    pub fn off_state(active_low: bool) -> PinState {
        if active_low { PinState::High } else { PinState::Low }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn set(&mut self, on: bool) -> Result<(), HalError> {
        let state = if on != self.active_low { PinState::High } else { PinState::Low };
        self.pin.drive(self.name, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimOutput;

    #[test]
    fn active_low_line_inverts_level() {
        let pin = SimOutput::new();
        let mut line = OutputLine::new("relay", pin.clone(), true);
        line.set(true).unwrap();
        assert!(!pin.level());
        line.set(false).unwrap();
        assert!(pin.level());
    }

    #[test]
    fn active_high_line_passes_level() {
        let pin = SimOutput::new();
        let mut line = OutputLine::new("led", pin.clone(), false);
        line.set(true).unwrap();
        assert!(pin.level());
        assert_eq!(pin.writes(), 1);
    }

    #[test]
    fn off_state_follows_polarity() {
        assert_eq!(OutputLine::off_state(true), PinState::High);
        assert_eq!(OutputLine::off_state(false), PinState::Low);
    }

    #[test]
    fn pin_errors_keep_line_name() {
        let pin = SimOutput::new();
        pin.fail(true);
        let mut line = OutputLine::new("relay", pin, false);
        match line.set(true) {
            Err(HalError::Pin { pin, kind, .. }) => {
                assert_eq!(pin, "relay");
                assert_eq!(kind, ErrorKind::Other);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unconnected_accepts_writes() {
        let mut line = OutputLine::new("led", Unconnected, false);
        assert!(line.set(true).is_ok());
    }

    #[test]
    fn copied_clock_keeps_its_origin() {
        let clock = MonotonicClock::start();
        std::thread::sleep(Duration::from_millis(20));
        let later = clock;
        assert!(later.uptime() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn tokio_pacer_skips_zero_pause() {
        let mut p = TokioPacer;
        let t0 = Instant::now();
        p.pause(Duration::ZERO).await;
        assert!(t0.elapsed() < Duration::from_millis(50));
    }
}
