use embedded_hal::digital::InputPin;

use crate::calibration::CurrentCalibration;
use crate::hal::{AnalogInput, HalError};

/// A sensor that yields one typed reading per cycle.
pub trait Sampler {
    type Reading;

    fn sample(&mut self) -> Result<Self::Reading, HalError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy(pub bool);

impl Occupancy {
    pub fn is_occupied(self) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    pub raw: u16,
    pub amps: f32,
    pub load_present: bool,
}

/// Infrared occupancy sensor on a digital input.
pub struct OccupancySampler<P> {
    input: P,
    active_low: bool,
}

impl<P: InputPin> OccupancySampler<P> {
    pub fn new(input: P, active_low: bool) -> Self {
        Self { input, active_low }
    }
}

impl<P: InputPin> Sampler for OccupancySampler<P> {
    type Reading = Occupancy;

    fn sample(&mut self) -> Result<Occupancy, HalError> {
        let high = self.input.is_high().map_err(|e| HalError::pin("occupancy sensor", e))?;
        Ok(Occupancy(high != self.active_low))
    }
}

/// Hall-effect current sensor on an ADC channel.
pub struct CurrentSampler {
    input: Box<dyn AnalogInput + Send>,
    calibration: CurrentCalibration,
}

impl CurrentSampler {
    pub fn new(input: Box<dyn AnalogInput + Send>, calibration: CurrentCalibration) -> Self {
        Self { input, calibration }
    }
}

impl Sampler for CurrentSampler {
    type Reading = LoadSample;

    fn sample(&mut self) -> Result<LoadSample, HalError> {
        let raw = self.input.read_raw()?;
        let amps = self.calibration.raw_to_amps(raw);
        Ok(LoadSample { raw, amps, load_present: self.calibration.is_load(amps) })
    }
}
