//! In-memory pin driver

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use dl_core::error::DriverError;
use dl_core::traits::PinDriver;
use dl_core::{PinId, PinRole, Pull};

#[derive(Debug, Clone, Copy)]
struct SimPin {
    role: PinRole,
    pull: Pull,
    level: bool,
}

/// Pin driver that keeps levels in memory.
///
/// Used where no physical GPIO is available. Inputs idle at the level
/// implied by their pull setting until [`set_input`](Self::set_input)
/// changes them.
#[derive(Debug, Default)]
pub struct SimulatedPinDriver {
    pins: DashMap<PinId, SimPin>,
    released: AtomicBool,
}

impl SimulatedPinDriver {
    /// Create an empty driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the level seen on an input pin
    pub fn set_input(&self, pin: PinId, level: bool) -> Result<(), DriverError> {
        let mut sim = self.pins.get_mut(&pin).ok_or(DriverError::UnknownPin(pin))?;
        if sim.role != PinRole::Input {
            return Err(DriverError::Hardware {
                pin,
                message: "pin is not an input".to_string(),
            });
        }
        sim.level = level;
        Ok(())
    }

    /// Current level of a pin as held by the driver
    pub fn level(&self, pin: PinId) -> Option<bool> {
        self.pins.get(&pin).map(|sim| sim.level)
    }

    /// Whether [`PinDriver::release`] has been called
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), DriverError> {
        if self.is_released() {
            return Err(DriverError::Released);
        }
        Ok(())
    }
}

impl PinDriver for SimulatedPinDriver {
    fn configure(
        &self,
        pin: PinId,
        role: PinRole,
        pull: Pull,
        initial: bool,
    ) -> Result<(), DriverError> {
        self.ensure_active()?;
        let level = match role {
            PinRole::Output => initial,
            PinRole::Input => pull == Pull::Up,
        };
        self.pins.insert(pin, SimPin { role, pull, level });
        tracing::debug!(%pin, %role, ?pull, level, "configured simulated pin");
        Ok(())
    }

    fn write(&self, pin: PinId, level: bool) -> Result<(), DriverError> {
        self.ensure_active()?;
        let mut sim = self.pins.get_mut(&pin).ok_or(DriverError::UnknownPin(pin))?;
        if sim.role != PinRole::Output {
            return Err(DriverError::Hardware {
                pin,
                message: "pin is not an output".to_string(),
            });
        }
        sim.level = level;
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<bool, DriverError> {
        self.ensure_active()?;
        self.pins
            .get(&pin)
            .map(|sim| sim.level)
            .ok_or(DriverError::UnknownPin(pin))
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        for mut sim in self.pins.iter_mut() {
            sim.level = sim.role == PinRole::Input && sim.pull == Pull::Up;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_output() {
        let driver = SimulatedPinDriver::new();
        driver
            .configure(PinId::new(17), PinRole::Output, Pull::Off, false)
            .unwrap();

        driver.write(PinId::new(17), true).unwrap();
        assert!(driver.read(PinId::new(17)).unwrap());
    }

    #[test]
    fn test_input_follows_pull_and_stimulus() {
        let driver = SimulatedPinDriver::new();
        driver
            .configure(PinId::new(23), PinRole::Input, Pull::Down, false)
            .unwrap();
        assert!(!driver.read(PinId::new(23)).unwrap());

        driver.set_input(PinId::new(23), true).unwrap();
        assert!(driver.read(PinId::new(23)).unwrap());
        assert!(driver.write(PinId::new(23), false).is_err());
    }

    #[test]
    fn test_unknown_pin() {
        let driver = SimulatedPinDriver::new();
        assert_eq!(
            driver.read(PinId::new(4)),
            Err(DriverError::UnknownPin(PinId::new(4)))
        );
    }

    #[test]
    fn test_release_is_idempotent() {
        let driver = SimulatedPinDriver::new();
        driver
            .configure(PinId::new(17), PinRole::Output, Pull::Off, true)
            .unwrap();

        driver.release();
        driver.release();
        assert!(driver.is_released());
        assert_eq!(driver.level(PinId::new(17)), Some(false));
        assert_eq!(driver.write(PinId::new(17), true), Err(DriverError::Released));
    }
}
