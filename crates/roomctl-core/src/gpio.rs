//! Raspberry Pi header pins through rppal, wrapped as embedded-hal pins.

use anyhow::{Context, Result};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};
use rppal::gpio::{self, Gpio};
use std::convert::Infallible;

/// The BCM GPIO controller.
pub struct Board {
    gpio: Gpio,
}

impl Board {
    pub fn open() -> Result<Self> {
        Ok(Self { gpio: Gpio::new().context("open gpio controller")? })
    }

    pub fn input(&self, bcm: u8) -> Result<PiInput> {
        let pin = self.gpio.get(bcm).with_context(|| format!("claim gpio{}", bcm))?;
        Ok(PiInput { pin: pin.into_input() })
    }

    /// Claims `bcm` as an output already driven to `initial`. The level is
    /// kept when the pin is dropped.
    pub fn output(&self, bcm: u8, initial: PinState) -> Result<PiOutput> {
        let pin = self.gpio.get(bcm).with_context(|| format!("claim gpio{}", bcm))?;
        let mut pin = match initial {
            PinState::High => pin.into_output_high(),
            PinState::Low => pin.into_output_low(),
        };
        pin.set_reset_on_drop(false);
        Ok(PiOutput { pin })
    }
}

pub struct PiInput {
    pin: gpio::InputPin,
}

impl ErrorType for PiInput {
    type Error = Infallible;
}

impl InputPin for PiInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pin.is_low())
    }
}

pub struct PiOutput {
    pin: gpio::OutputPin,
}

impl ErrorType for PiOutput {
    type Error = Infallible;
}

impl OutputPin for PiOutput {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        Ok(())
    }
}
