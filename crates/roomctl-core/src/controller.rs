use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::actuator::PowerActuator;
use crate::hal::{Clock, Pacer};
use crate::monitor::LoadMonitor;
use crate::report::{HttpTransport, NoLoadReporter, ReportOutcome};
use crate::sampler::{LoadSample, Occupancy, Sampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause after actuating, before the load is sampled
    pub settle: Duration,
    /// Pause closing the cycle; zero skips it
    pub cycle: Duration,
}

impl Timing {
    pub const OCCUPANCY_ONLY: Self = Self { settle: Duration::from_millis(100), cycle: Duration::ZERO };
    pub const WITH_LOAD_MONITOR: Self = Self { settle: Duration::from_millis(100), cycle: Duration::from_millis(500) };
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub occupied: bool,
    pub load: Option<LoadSample>,
    pub report: ReportOutcome,
}

pub struct Controller<T, P, C> {
    occupancy: Box<dyn Sampler<Reading = Occupancy> + Send>,
    actuator: PowerActuator,
    load: Option<LoadMonitor>,
    reporter: Option<NoLoadReporter<T>>,
    timing: Timing,
    pacer: P,
    clock: C,
    cycles: u64,
}

impl<T: HttpTransport, P: Pacer, C: Clock> Controller<T, P, C> {
    pub fn new(
        occupancy: Box<dyn Sampler<Reading = Occupancy> + Send>,
        actuator: PowerActuator,
        timing: Timing,
        pacer: P,
        clock: C,
    ) -> Self {
        Self { occupancy, actuator, load: None, reporter: None, timing, pacer, clock, cycles: 0 }
    }

    pub fn with_load_monitor(mut self, monitor: LoadMonitor) -> Self {
        self.load = Some(monitor);
        self
    }

    pub fn with_reporter(mut self, reporter: NoLoadReporter<T>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn reporter(&self) -> Option<&NoLoadReporter<T>> {
        self.reporter.as_ref()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Drives every output off, as at power-up.
    pub fn start(&mut self) {
        self.actuator.apply(false);
        if let Some(m) = self.load.as_mut() {
            m.release();
        }
        info!(
            "room power controller initialized (load monitor: {}, reporting: {})",
            if self.load.is_some() { "on" } else { "off" },
            if self.reporter.is_some() { "on" } else { "off" },
        );
    }

    pub fn release(&mut self) {
        self.actuator.apply(false);
        if let Some(m) = self.load.as_mut() {
            m.release();
        }
    }

    pub async fn cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;

        let occupied = match self.occupancy.sample() {
            Ok(o) => o.is_occupied(),
            Err(e) => {
                warn!("occupancy read failed, treating room as empty: {}", e);
                false
            }
        };

        self.actuator.apply(occupied);
        if occupied {
            info!("occupancy detected: power ON");
        } else {
            info!("no occupancy: power OFF");
        }

        self.pacer.pause(self.timing.settle).await;

        let mut outcome = CycleOutcome { occupied, load: None, report: ReportOutcome::NotNeeded };

        let sample = match self.load.as_mut().map(|m| m.check()) {
            Some(Ok(s)) => Some(s),
            Some(Err(e)) => {
                warn!("current read failed, skipping load check: {}", e);
                None
            }
            None => None,
        };

        if let Some(s) = sample {
            outcome.load = Some(s);
            let qualifying = occupied && !s.load_present;
            outcome.report = match self.reporter.as_mut() {
                Some(r) => r.on_cycle(qualifying, self.clock.uptime(), s.amps).await,
                None if qualifying => ReportOutcome::Disabled,
                None => ReportOutcome::NotNeeded,
            };
        }

        self.pacer.pause(self.timing.cycle).await;
        outcome
    }

    /// Cycles until `shutdown` resolves, then switches everything off.
    pub async fn run<F: Future<Output = ()>>(&mut self, shutdown: F) {
        self.start();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = self.cycle() => {}
            }
        }
        self.release();
        info!("stopped after {} cycles; outputs off", self.cycles);
    }
}
