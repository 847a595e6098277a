//! In-memory board used by tests and `roomctl simulate`. Every handle is a
//! cheap clone sharing state with the copy handed to the controller.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

use crate::hal::{AnalogInput, Clock, HalError, Pacer};
use crate::report::HttpTransport;

/// Error raised by a sim pin after `fail(true)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFault;

impl embedded_hal::digital::Error for InjectedFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimInput {
    level: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

impl SimInput {
    pub fn new(level: bool) -> Self {
        let s = Self::default();
        s.set(level);
        s
    }

    pub fn set(&self, level: bool) {
        self.level.store(level, Ordering::Relaxed);
    }

    pub fn fail(&self, on: bool) {
        self.fail.store(on, Ordering::Relaxed);
    }
}

impl ErrorType for SimInput {
    type Error = InjectedFault;
}

impl InputPin for SimInput {
    fn is_high(&mut self) -> Result<bool, InjectedFault> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(InjectedFault);
        }
        Ok(self.level.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, InjectedFault> {
        self.is_high().map(|h| !h)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimOutput {
    level: Arc<AtomicBool>,
    writes: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
}

impl SimOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::Relaxed)
    }

    /// Successful writes so far.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn fail(&self, on: bool) {
        self.fail.store(on, Ordering::Relaxed);
    }
}

impl SimOutput {
    fn write(&mut self, high: bool) -> Result<(), InjectedFault> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(InjectedFault);
        }
        self.level.store(high, Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl ErrorType for SimOutput {
    type Error = InjectedFault;
}

impl OutputPin for SimOutput {
    fn set_low(&mut self) -> Result<(), InjectedFault> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), InjectedFault> {
        self.write(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimAdc {
    raw: Arc<AtomicU16>,
    fail: Arc<AtomicBool>,
}

impl SimAdc {
    pub fn new(raw: u16) -> Self {
        let s = Self::default();
        s.set(raw);
        s
    }

    pub fn set(&self, raw: u16) {
        self.raw.store(raw, Ordering::Relaxed);
    }

    pub fn fail(&self, on: bool) {
        self.fail.store(on, Ordering::Relaxed);
    }
}

impl AnalogInput for SimAdc {
    fn read_raw(&mut self) -> Result<u16, HalError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(HalError::Fault("sim adc".into()));
        }
        Ok(self.raw.load(Ordering::Relaxed))
    }
}

/// Uptime that only moves when a `VirtualPacer` pauses.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    ms: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.ms.fetch_add(d.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Clock for VirtualClock {
    fn uptime(&self) -> Duration {
        Duration::from_millis(self.ms.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone)]
pub struct VirtualPacer {
    clock: VirtualClock,
}

impl VirtualPacer {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }
}

impl Pacer for VirtualPacer {
    async fn pause(&mut self, d: Duration) {
        self.clock.advance(d);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Records posts instead of sending them.
#[derive(Debug, Clone)]
pub struct SimTransport {
    link_up: Arc<AtomicBool>,
    status: Arc<AtomicU16>,
    error: Arc<AtomicBool>,
    posts: Arc<Mutex<Vec<RecordedPost>>>,
}

impl SimTransport {
    pub fn new() -> Self {
        Self {
            link_up: Arc::new(AtomicBool::new(true)),
            status: Arc::new(AtomicU16::new(200)),
            error: Arc::new(AtomicBool::new(false)),
            posts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_link(&self, up: bool) {
        self.link_up.store(up, Ordering::Relaxed);
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::Relaxed);
    }

    pub fn set_error(&self, on: bool) {
        self.error.store(on, Ordering::Relaxed);
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for SimTransport {
    fn is_connected(&mut self) -> bool {
        self.link_up.load(Ordering::Relaxed)
    }

    async fn post(&mut self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<u16> {
        anyhow::ensure!(!self.error.load(Ordering::Relaxed), "connection refused");
        self.posts.lock().unwrap().push(RecordedPost {
            url: url.to_string(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: body.to_vec(),
        });
        Ok(self.status.load(Ordering::Relaxed))
    }
}
