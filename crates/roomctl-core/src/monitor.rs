use tracing::{error, info};

use crate::hal::{HalError, OutputLine};
use crate::sampler::{LoadSample, Sampler};

/// Current sensor plus the load indicator LED.
pub struct LoadMonitor {
    sampler: Box<dyn Sampler<Reading = LoadSample> + Send>,
    indicator: OutputLine,
}

impl LoadMonitor {
    pub fn new(sampler: Box<dyn Sampler<Reading = LoadSample> + Send>, indicator: OutputLine) -> Self {
        Self { sampler, indicator }
    }

    /// Samples the load and drives the indicator. On a read error the
    /// indicator keeps its previous level.
    pub fn check(&mut self) -> Result<LoadSample, HalError> {
        let s = self.sampler.sample()?;
        if let Err(e) = self.indicator.set(s.load_present) {
            error!("{}: write failed: {}", self.indicator.name(), e);
        }
        if s.load_present {
            info!("load current: {:.2} A", s.amps);
        } else {
            info!("no significant load current ({:.2} A)", s.amps);
        }
        Ok(s)
    }

    pub fn release(&mut self) {
        if let Err(e) = self.indicator.set(false) {
            error!("{}: write failed: {}", self.indicator.name(), e);
        }
    }
}
