//! dl-protocol: Wire protocol for devlink device agents
//!
//! This crate defines the typed JSON envelopes exchanged between a device
//! agent and its coordinator over a WebSocket, plus the codec that turns
//! them into text frames and back.

pub mod codec;
pub mod error;
pub mod message;
pub mod pin;

pub use codec::{JsonCodec, DEFAULT_MAX_INBOUND_BYTES};
pub use error::ProtocolError;
pub use message::{DeviceStatus, Envelope, Inbound, Outbound};
pub use pin::PinId;
