//! Message definitions
//!
//! Every message on the wire is a JSON object carrying a `type` field.
//! Outbound messages are wrapped in an [`Envelope`] that stamps the device
//! id and an ISO-8601 timestamp onto the type-specific body.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pin::PinId;

/// Messages received from the coordinator
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Coordinator accepted our `identify`
    Identified,

    /// General command
    Command {
        /// Command name (`get_status`, `restart`, ...)
        command: String,
        /// Optional command parameters; `null` reads as empty
        #[serde(default, deserialize_with = "null_as_empty")]
        params: Map<String, Value>,
    },

    /// Request to drive an output pin
    GpioCommand {
        /// Target pin
        pin: PinId,
        /// Requested logical level
        #[serde(deserialize_with = "level::deserialize")]
        state: bool,
    },

    /// Configuration pushed by the coordinator (opaque to the agent)
    ConfigUpdate {
        #[serde(flatten)]
        settings: Map<String, Value>,
    },

    /// Coordinator-reported error
    Error {
        #[serde(default)]
        reason: Option<String>,
    },

    /// A message whose `type` this agent does not understand
    #[serde(skip)]
    Unknown {
        /// The unrecognized `type` value
        kind: String,
    },
}

impl Inbound {
    /// `type` values that map onto a variant
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "identified",
        "command",
        "gpio_command",
        "config_update",
        "error",
    ];

    /// The wire `type` of this message
    pub fn kind(&self) -> &str {
        match self {
            Inbound::Identified => "identified",
            Inbound::Command { .. } => "command",
            Inbound::GpioCommand { .. } => "gpio_command",
            Inbound::ConfigUpdate { .. } => "config_update",
            Inbound::Error { .. } => "error",
            Inbound::Unknown { kind } => kind,
        }
    }
}

/// Reported device status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
}

/// Type-specific body of an outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Identification handshake, sent first on every new connection
    Identify {
        #[serde(rename = "deviceType")]
        device_type: String,
        secret: String,
    },

    /// Acknowledgment of a `gpio_command`
    GpioAck {
        pin: PinId,
        requested_state: bool,
        success: bool,
    },

    /// An output pin changed level
    GpioState { pin: PinId, state: bool, name: String },

    /// Periodic or on-demand status snapshot
    Status {
        status: DeviceStatus,
        system_info: Map<String, Value>,
        gpio_states: BTreeMap<PinId, bool>,
    },

    /// Sensor readings
    Sensor { sensors: Map<String, Value> },
}

impl Outbound {
    /// The wire `type` of this message
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::Identify { .. } => "identify",
            Outbound::GpioAck { .. } => "gpio_ack",
            Outbound::GpioState { .. } => "gpio_state",
            Outbound::Status { .. } => "status",
            Outbound::Sensor { .. } => "sensor",
        }
    }
}

/// An outbound message stamped with the sender identity and time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub body: Outbound,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Wrap a body, stamping it with the current time
    pub fn new(device_id: impl Into<String>, body: Outbound) -> Self {
        Self {
            body,
            device_id: device_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// The wire `type` of the wrapped body
    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Pin levels arrive as either booleans or 0/1 integers
mod level {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b),
            Raw::Number(0) => Ok(false),
            Raw::Number(1) => Ok(true),
            Raw::Number(n) => Err(serde::de::Error::custom(format!(
                "pin state must be 0 or 1, got {}",
                n
            ))),
        }
    }
}
