//! Agent configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;
use crate::types::{DeviceIdentity, PinId, PinRole, Pull};

/// Configuration for the device agent.
///
/// Loaded once at start and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Coordinator WebSocket endpoint, including the path
    /// (e.g. `ws://172.16.3.171:3001/raspberry-ws`)
    pub endpoint: String,

    /// Unique device ID
    pub device_id: String,

    /// Device type reported during identification
    pub device_type: String,

    /// Shared secret passed through to the coordinator
    pub secret: String,

    /// Connection timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Timeout for a single socket write
    #[serde(with = "duration_secs")]
    pub send_timeout: Duration,

    /// Capacity of the outbound message queue
    pub outbound_queue: usize,

    /// Inbound messages larger than this are discarded unparsed
    pub max_inbound_bytes: usize,

    /// Pin registry
    pub pins: Vec<PinConfig>,

    /// Telemetry publishing intervals
    pub telemetry: TelemetryConfig,

    /// Backoff configuration for reconnections
    pub backoff: BackoffConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:3001/raspberry-ws".to_string(),
            device_id: "raspberry_001".to_string(),
            device_type: "raspberry_pi".to_string(),
            secret: String::new(),
            connect_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(10),
            outbound_queue: 64,
            max_inbound_bytes: dl_protocol::DEFAULT_MAX_INBOUND_BYTES,
            pins: vec![
                PinConfig::output(17, "relay_1"),
                PinConfig::output(18, "relay_2"),
                PinConfig::input(23, "motion_sensor", Pull::Down),
            ],
            telemetry: TelemetryConfig::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl AgentConfig {
    /// The identity presented to the coordinator
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            device_id: self.device_id.clone(),
            device_type: self.device_type.clone(),
            secret: self.secret.clone(),
        }
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Invalid("device_id must not be empty".into()));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Invalid("outbound_queue must be at least 1".into()));
        }
        if self.max_inbound_bytes == 0 {
            return Err(ConfigError::Invalid("max_inbound_bytes must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for pin in &self.pins {
            if !seen.insert(pin.pin) {
                return Err(ConfigError::DuplicatePin(pin.pin));
            }
        }

        self.telemetry.validate()?;
        self.backoff.validate()
    }
}

/// One entry of the pin registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    /// Pin number
    pub pin: PinId,
    /// Display name, used in `gpio_state` and as the sensor key
    pub name: String,
    /// Input or output
    pub role: PinRole,
    /// Pull resistor (inputs only)
    #[serde(default)]
    pub pull: Pull,
    /// Level driven at startup (outputs only)
    #[serde(default)]
    pub initial: bool,
}

impl PinConfig {
    /// An output pin that starts low
    pub fn output(pin: u8, name: impl Into<String>) -> Self {
        Self {
            pin: PinId::new(pin),
            name: name.into(),
            role: PinRole::Output,
            pull: Pull::Off,
            initial: false,
        }
    }

    /// An input pin with the given pull setting
    pub fn input(pin: u8, name: impl Into<String>, pull: Pull) -> Self {
        Self {
            pin: PinId::new(pin),
            name: name.into(),
            role: PinRole::Input,
            pull,
            initial: false,
        }
    }
}

/// Telemetry loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// How often sensor readings are published
    #[serde(with = "duration_secs")]
    pub sensor_interval: Duration,

    /// How often the status loop checks whether to publish
    #[serde(with = "duration_secs")]
    pub status_interval: Duration,

    /// A scheduled status is only sent when more than this has elapsed
    /// since the previous status publish
    #[serde(with = "duration_secs")]
    pub status_republish_after: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sensor_interval: Duration::from_secs(30),
            status_interval: Duration::from_secs(30),
            status_republish_after: Duration::from_secs(60),
        }
    }
}

impl TelemetryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_interval.is_zero() || self.status_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "telemetry intervals must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial (minimum) delay
    #[serde(with = "duration_secs")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_secs")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl BackoffConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial > self.max {
            return Err(ConfigError::Invalid(format!(
                "backoff.initial ({:?}) exceeds backoff.max ({:?})",
                self.initial, self.max
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "backoff.multiplier must be a finite number of at least 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid(
                "backoff.jitter must be between 0.0 and 1.0".into(),
            ));
        }
        Ok(())
    }
}
