//! dl-agent: Device agent for devlink
//!
//! The agent keeps a single WebSocket session open to the coordinator,
//! identifies itself on every new connection, executes inbound pin
//! commands, and publishes sensor and status telemetry while identified.

pub mod dispatch;
pub mod gpio;
pub mod metrics;
pub mod session;
pub mod supervisor;
pub mod telemetry;
pub mod tunnel;

pub use dispatch::CommandDispatcher;
pub use session::Session;
pub use supervisor::Agent;
