//! Hall-effect current sensor calibration.
//!
//! The sensor idles at `zero_offset_v` and swings by `sensitivity_v_per_a`
//! per amp in either direction; the ADC maps `0..=adc_max` onto `0..=vcc`.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CurrentCalibration {
    /// ADC reference voltage
    pub vcc: f32,
    /// Full-scale ADC count
    pub adc_max: f32,
    /// Sensor output at zero current
    pub zero_offset_v: f32,
    /// Volts per amp
    pub sensitivity_v_per_a: f32,
    /// Currents strictly above this count as a load
    pub threshold_a: f32,
}

impl CurrentCalibration {
    /// ACS712-20A on a 10-bit, 5 V ADC.
    pub const ACS712_20A: Self = Self {
        vcc: 5.0,
        adc_max: 1023.0,
        zero_offset_v: 2.5,
        sensitivity_v_per_a: 0.100,
        threshold_a: 0.5,
    };

    #[inline]
    pub fn raw_to_volts(&self, raw: u16) -> f32 {
        (raw as f32 / self.adc_max) * self.vcc
    }

    /// Current magnitude in amps. Out-of-range samples are not clamped.
    #[inline]
    pub fn raw_to_amps(&self, raw: u16) -> f32 {
        (self.raw_to_volts(raw) - self.zero_offset_v).abs() / self.sensitivity_v_per_a
    }

    #[inline]
    pub fn is_load(&self, amps: f32) -> bool {
        amps > self.threshold_a
    }
}

impl Default for CurrentCalibration {
    fn default() -> Self {
        Self::ACS712_20A
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAL: CurrentCalibration = CurrentCalibration::ACS712_20A;

    #[test]
    fn mid_scale_is_near_zero_current() {
        let a = CAL.raw_to_amps(511);
        assert!(a < 0.03, "{}", a);
        assert!(!CAL.is_load(a));
    }

    #[test]
    fn high_sample_is_a_load() {
        let a = CAL.raw_to_amps(920);
        assert!((a - 19.966).abs() < 0.01, "{}", a);
        assert!(CAL.is_load(a));
    }

    #[test]
    fn deviation_below_offset_counts_too() {
        // 0 V is 2.5 V below the offset: 25 A
        assert!((CAL.raw_to_amps(0) - 25.0).abs() < 1e-3);
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!CAL.is_load(0.5));
        assert!(CAL.is_load(0.5001));
        assert!(!CAL.is_load(0.4999));
    }

    #[test]
    fn samples_beyond_full_scale_propagate() {
        let a = CAL.raw_to_amps(4095);
        assert!(a > 150.0, "{}", a);
    }
}
