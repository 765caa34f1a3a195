//! Connection management for the coordinator link

mod connector;
mod reconnect;

pub use connector::{ActiveTunnel, TunnelConnector, TunnelEvent};
pub use reconnect::{ExponentialBackoff, Reconnector};
