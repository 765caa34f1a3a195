//! Periodic telemetry publishers
//!
//! Both publishers run for the whole process lifetime and gate themselves
//! on the session's identified flag instead of being started and stopped
//! per connection.

mod sensor;
mod status;

pub use sensor::SensorPublisher;
pub use status::StatusPublisher;

use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Ticker whose first tick fires immediately and which does not burst
/// after a stall
fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
