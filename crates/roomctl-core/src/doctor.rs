use anyhow::Result;

use crate::calibration::CurrentCalibration;
use crate::controller::Timing;
use crate::gate::ReportPolicy;
use crate::ReportConfig;

pub fn check_calibration(cal: &CurrentCalibration) -> Result<()> {
    anyhow::ensure!(cal.vcc > 0.0 && cal.vcc <= 24.0, "load_monitor.vcc out of range: {}", cal.vcc);
    anyhow::ensure!(cal.adc_max >= 1.0, "load_monitor.adc_max must be >= 1");
    anyhow::ensure!(cal.sensitivity_v_per_a > 0.0, "load_monitor.sensitivity_v_per_a must be > 0");
    anyhow::ensure!(cal.threshold_a >= 0.0, "load_monitor.threshold_a must not be negative");
    anyhow::ensure!(
        cal.zero_offset_v >= 0.0 && cal.zero_offset_v <= cal.vcc,
        "load_monitor.zero_offset_v should be within 0..=vcc"
    );
    Ok(())
}

pub fn check_timing(t: &Timing) -> Result<()> {
    anyhow::ensure!(!(t.settle + t.cycle).is_zero(), "timing: settle_ms + cycle_ms must be > 0 (busy loop)");
    Ok(())
}

pub fn check_report(cfg: &ReportConfig) -> Result<()> {
    if cfg.policy == Some(ReportPolicy::RateLimited) {
        anyhow::ensure!(cfg.min_interval_ms.unwrap_or(0) > 0, "report.min_interval_ms required for rate-limited policy");
    }
    if let Some(t) = cfg.timeout_ms {
        anyhow::ensure!(t >= 100, "report.timeout_ms too small; set >= 100");
    }
    Ok(())
}
