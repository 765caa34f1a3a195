//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

pub use dl_protocol::PinId;

/// Whether a pin is read or driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinRole {
    /// Read for reporting (sensors, switches)
    Input,
    /// Driven by commands (relays, LEDs)
    Output,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinRole::Input => write!(f, "input"),
            PinRole::Output => write!(f, "output"),
        }
    }
}

/// Internal pull resistor setting for input pins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    #[default]
    Off,
    Up,
    Down,
}

/// Identity the agent presents to the coordinator.
///
/// Fixed for the lifetime of the process. The secret is passed through to
/// the coordinator and never validated locally.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Unique device ID
    pub device_id: String,
    /// Device type reported in `identify`
    pub device_type: String,
    /// Shared secret reported in `identify`
    pub secret: String,
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("device_type", &self.device_type)
            .field("secret", &"<redacted>")
            .finish()
    }
}
