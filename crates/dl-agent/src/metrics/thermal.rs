//! Kernel thermal zone reader

use std::path::{Path, PathBuf};

/// Default SoC thermal zone on Raspberry Pi and most ARM boards
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// A sysfs temperature file holding millidegrees Celsius
#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Current temperature in degrees Celsius, or `None` if unreadable
    pub fn read_celsius(&self) -> Option<f64> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::trace!(path = %self.path.display(), error = %e, "thermal zone unavailable");
                return None;
            }
        };
        let millidegrees: f64 = raw.trim().parse().ok()?;
        Some(millidegrees / 1000.0)
    }
}

impl Default for ThermalZone {
    fn default() -> Self {
        Self::new(DEFAULT_THERMAL_ZONE)
    }
}
