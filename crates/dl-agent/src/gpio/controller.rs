//! Pin control adapter
//!
//! The boundary between protocol handlers and the pin driver. Driver
//! failures, panics included, are converted to a `false` result here and
//! never reach the caller.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dl_core::error::{DriverError, PinError};
use dl_core::traits::PinDriver;
use dl_core::{PinId, PinRole};
use dl_protocol::Outbound;

use super::registry::PinRegistry;
use crate::session::Session;

/// Executes pin writes and reads against the driver
pub struct PinController {
    registry: PinRegistry,
    driver: Arc<dyn PinDriver>,
    session: Arc<Session>,
}

impl PinController {
    /// Create a controller over the given registry and driver
    pub fn new(registry: PinRegistry, driver: Arc<dyn PinDriver>, session: Arc<Session>) -> Self {
        Self {
            registry,
            driver,
            session,
        }
    }

    /// The pin registry
    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    /// Configure every registered pin on the driver.
    ///
    /// A pin that fails to configure stays registered; later writes to it
    /// report failure through the driver.
    pub fn setup(&self) {
        for (pin, entry) in self.registry.entries() {
            let result = guarded(pin, || {
                self.driver.configure(pin, entry.role, entry.pull, entry.initial)
            });
            match result {
                Ok(()) => tracing::info!(
                    %pin,
                    name = %entry.name,
                    role = %entry.role,
                    initial = entry.initial,
                    "set up GPIO pin"
                ),
                Err(e) => tracing::error!(%pin, error = %e, "failed to set up GPIO pin"),
            }
        }
    }

    /// Drive an output pin.
    ///
    /// Returns `true` only if the pin is registered, is an output, and the
    /// driver write succeeded. On success the new level is recorded and a
    /// `gpio_state` notification is queued without waiting for it.
    pub fn set_pin(&self, pin: PinId, state: bool) -> bool {
        match self.try_set_pin(pin, state) {
            Ok(name) => {
                tracing::info!(%pin, state, "set GPIO");
                let session = Arc::clone(&self.session);
                tokio::spawn(async move {
                    if let Err(e) = session.send(Outbound::GpioState { pin, state, name }).await {
                        tracing::warn!(%pin, error = %e, "failed to publish gpio_state");
                    }
                });
                true
            }
            Err(e) => {
                tracing::error!(%pin, state, error = %e, "GPIO write failed");
                false
            }
        }
    }

    fn try_set_pin(&self, pin: PinId, state: bool) -> Result<String, PinError> {
        let entry = self.registry.get(pin).ok_or(PinError::NotConfigured(pin))?;
        if entry.role != PinRole::Output {
            return Err(PinError::NotOutput(pin));
        }

        guarded(pin, || self.driver.write(pin, state))?;
        self.registry.record(pin, state);
        Ok(entry.name)
    }

    /// Read every input pin and record the levels.
    ///
    /// Returns `(pin, name, level)` for each input that read successfully.
    pub fn refresh_inputs(&self) -> Vec<(PinId, String, bool)> {
        let mut readings = Vec::new();
        for (pin, name) in self.registry.inputs() {
            match guarded(pin, || self.driver.read(pin)) {
                Ok(level) => {
                    self.registry.record(pin, level);
                    readings.push((pin, name, level));
                }
                Err(e) => tracing::warn!(%pin, error = %e, "failed to read GPIO input"),
            }
        }
        readings
    }

    /// Current level of every pin, with inputs freshly read
    pub fn states(&self) -> BTreeMap<PinId, bool> {
        self.refresh_inputs();
        self.registry.states()
    }
}

/// Run a driver call, converting panics into [`PinError::Panicked`]
fn guarded<T>(pin: PinId, call: impl FnOnce() -> Result<T, DriverError>) -> Result<T, PinError> {
    catch_unwind(AssertUnwindSafe(call))
        .map_err(|_| PinError::Panicked(pin))?
        .map_err(PinError::from)
}
