//! Pin registry, pin control, and driver lifetime

mod controller;
mod registry;
mod simulated;

pub use controller::PinController;
pub use registry::{PinEntry, PinRegistry};
pub use simulated::SimulatedPinDriver;

use std::sync::Arc;

use dl_core::traits::PinDriver;

/// Releases the pin driver when dropped.
///
/// Held by the supervisor for the lifetime of the agent so the driver is
/// released on every exit path, including unwinding.
pub struct DriverGuard {
    driver: Arc<dyn PinDriver>,
}

impl DriverGuard {
    /// Take responsibility for releasing `driver`
    pub fn new(driver: Arc<dyn PinDriver>) -> Self {
        Self { driver }
    }
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        self.driver.release();
        tracing::info!("GPIO cleanup completed");
    }
}
