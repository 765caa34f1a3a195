//! dl-core: Core abstractions and configuration for devlink
//!
//! This crate provides the configuration surface, error taxonomy, domain
//! types, and the capability traits through which the agent reaches the
//! pin driver and system metrics.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::DlError;
pub use types::{DeviceIdentity, PinId, PinRole, Pull};
