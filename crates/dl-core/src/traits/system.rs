//! System information capability

use serde_json::{Map, Value};

/// Source of the opaque host snapshots reported in telemetry
pub trait SystemInfoProvider: Send + Sync {
    /// Snapshot reported as `system_info` in `status` messages.
    ///
    /// Collection failures yield an empty or partial map, never an error.
    fn system_info(&self) -> Map<String, Value>;

    /// CPU temperature in degrees Celsius, if available
    fn temperature(&self) -> Option<f64>;
}
