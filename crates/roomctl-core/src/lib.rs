pub mod actuator;
pub mod calibration;
pub mod controller;
pub mod doctor;
pub mod gate;
pub mod gpio;
pub mod hal;
pub mod iio;
pub mod monitor;
pub mod report;
pub mod sampler;
pub mod sim;

use serde::Deserialize;
use std::time::Duration;

use calibration::CurrentCalibration;
use controller::Timing;
use gate::{ReportGate, ReportPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct LoadMonitorConfig {
    pub enable: bool,

    /// IIO channel file of the current sensor, e.g.
    /// "/sys/bus/iio/devices/iio:device0/in_voltage0_raw"
    pub adc_path: Option<String>,

    /// ADC reference voltage (default 5.0)
    pub vcc: Option<f32>,
    /// Full-scale ADC count (default 1023)
    pub adc_max: Option<f32>,
    /// Sensor output at zero current (default vcc/2)
    pub zero_offset_v: Option<f32>,
    /// Volts per amp (default 0.100, ACS712-20A)
    pub sensitivity_v_per_a: Option<f32>,
    /// Load threshold in amps (default 0.5)
    pub threshold_a: Option<f32>,
}

impl LoadMonitorConfig {
    pub fn calibration(&self) -> CurrentCalibration {
        let d = CurrentCalibration::ACS712_20A;
        let vcc = self.vcc.unwrap_or(d.vcc);
        CurrentCalibration {
            vcc,
            adc_max: self.adc_max.unwrap_or(d.adc_max),
            zero_offset_v: self.zero_offset_v.unwrap_or(vcc / 2.0),
            sensitivity_v_per_a: self.sensitivity_v_per_a.unwrap_or(d.sensitivity_v_per_a),
            threshold_a: self.threshold_a.unwrap_or(d.threshold_a),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimingConfig {
    pub settle_ms: Option<u64>,
    /// Defaults to 500 with the load monitor, 0 without
    pub cycle_ms: Option<u64>,
}

impl TimingConfig {
    pub fn resolve(&self, load_monitor: bool) -> Timing {
        let base = if load_monitor { Timing::WITH_LOAD_MONITOR } else { Timing::OCCUPANCY_ONLY };
        Timing {
            settle: self.settle_ms.map(Duration::from_millis).unwrap_or(base.settle),
            cycle: self.cycle_ms.map(Duration::from_millis).unwrap_or(base.cycle),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub enable: bool,
    /// Plain http:// endpoint receiving no-load events
    pub url: String,
    pub policy: Option<ReportPolicy>,
    /// Required by the rate-limited policy
    pub min_interval_ms: Option<u64>,
    /// Bound on connect + exchange; unbounded when absent
    pub timeout_ms: Option<u64>,
}

impl ReportConfig {
    pub fn gate(&self) -> ReportGate {
        ReportGate::new(
            self.policy.unwrap_or_default(),
            Duration::from_millis(self.min_interval_ms.unwrap_or(0)),
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
