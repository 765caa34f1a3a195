//! Pin driver capability

use crate::error::DriverError;
use crate::types::{PinId, PinRole, Pull};

/// Abstraction over the physical pin-control driver.
///
/// The agent only ever configures, writes, and reads pins through this
/// trait, so the protocol logic runs unchanged against real hardware or
/// an in-memory simulation.
pub trait PinDriver: Send + Sync {
    /// Set up a pin for its role. Outputs are driven to `initial`.
    fn configure(&self, pin: PinId, role: PinRole, pull: Pull, initial: bool)
        -> Result<(), DriverError>;

    /// Drive an output pin
    fn write(&self, pin: PinId, level: bool) -> Result<(), DriverError>;

    /// Read the current level of a pin
    fn read(&self, pin: PinId) -> Result<bool, DriverError>;

    /// Release every pin back to its default state.
    ///
    /// Called once at shutdown. Further calls must be harmless.
    fn release(&self);
}
