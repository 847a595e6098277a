//! Linux IIO ADC channels (`in_voltageN_raw`).

use anyhow::Result;
use std::path::PathBuf;

use crate::hal::{AnalogInput, HalError};

/// One IIO voltage channel, e.g. `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`.
#[derive(Debug)]
pub struct IioAdc {
    path: PathBuf,
}

impl IioAdc {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        anyhow::ensure!(path.exists(), "adc channel missing: {}", path.display());
        Ok(Self { path })
    }
}

impl AnalogInput for IioAdc {
    fn read_raw(&mut self) -> Result<u16, HalError> {
        let pin = || self.path.display().to_string();
        let s = std::fs::read_to_string(&self.path).map_err(|source| HalError::Io { pin: pin(), source })?;
        s.trim().parse().map_err(|_| HalError::BadValue { pin: pin(), value: s.trim().to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!("roomctl-iio-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&p);
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn adc_parses_raw_count() {
        let root = scratch("adc");
        let f = root.join("in_voltage0_raw");
        std::fs::write(&f, "511\n").unwrap();
        let mut adc = IioAdc::open(&f).unwrap();
        assert_eq!(adc.read_raw().unwrap(), 511);
    }

    #[test]
    fn garbage_count_is_reported() {
        let root = scratch("bad");
        let f = root.join("in_voltage0_raw");
        std::fs::write(&f, "x\n").unwrap();
        let mut adc = IioAdc::open(&f).unwrap();
        assert!(matches!(adc.read_raw(), Err(HalError::BadValue { .. })));
    }

    #[test]
    fn missing_channel_fails_to_open() {
        let root = scratch("missing");
        assert!(IioAdc::open(root.join("in_voltage9_raw")).is_err());
    }
}
