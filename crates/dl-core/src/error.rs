//! Core error types for devlink

use dl_protocol::{PinId, ProtocolError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the devlink ecosystem
#[derive(Error, Debug)]
pub enum DlError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Pin control error
    #[error("Pin error: {0}")]
    Pin(#[from] PinError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-related errors. All of them are recoverable by reconnecting.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection attempt failed
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// Connection attempt did not complete in time
    #[error("Connection to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    /// No live session to send on
    #[error("Not connected")]
    NotConnected,

    /// Write on the socket failed
    #[error("Send failed: {0}")]
    Send(String),

    /// Write on the socket did not complete in time
    #[error("Send timed out after {0:?}")]
    SendTimeout(Duration),

    /// Receive side failed
    #[error("Receive failed: {0}")]
    Receive(String),

    /// Peer closed the connection
    #[error("Connection closed: {0}")]
    Closed(String),
}

/// Errors reported by a pin driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver does not know this pin
    #[error("Pin {0} is not set up on the driver")]
    UnknownPin(PinId),

    /// Hardware access failed
    #[error("Hardware error on pin {pin}: {message}")]
    Hardware { pin: PinId, message: String },

    /// The driver has been released
    #[error("Pin driver has been released")]
    Released,
}

/// Errors from the pin control boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    /// Pin is not in the registry
    #[error("GPIO pin {0} not configured")]
    NotConfigured(PinId),

    /// Pin exists but is not an output
    #[error("GPIO pin {0} is not configured as output")]
    NotOutput(PinId),

    /// Underlying driver failed
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Driver panicked while handling the pin
    #[error("Driver panicked while controlling pin {0}")]
    Panicked(PinId),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The same pin is declared twice
    #[error("Pin {0} is declared more than once")]
    DuplicatePin(PinId),
}
