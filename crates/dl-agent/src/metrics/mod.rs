//! Host metrics collection
//!
//! [`HostSystemInfo`] is the production [`SystemInfoProvider`]: host
//! identity, CPU, memory, disk, and uptime via `sysinfo`, plus the SoC
//! temperature from the kernel thermal zone.

mod thermal;

pub use thermal::ThermalZone;

use std::net::UdpSocket;
use std::sync::Mutex;

use serde_json::{json, Map, Value};
use sysinfo::{Disks, System};

use dl_core::traits::SystemInfoProvider;

/// Address used to discover the outbound interface. Nothing is sent.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Reported when no routable interface is found
const FALLBACK_IP: &str = "127.0.0.1";

/// System information read from the running host
pub struct HostSystemInfo {
    /// Kept across calls so CPU usage is measured between snapshots
    system: Mutex<System>,
    thermal: ThermalZone,
}

impl HostSystemInfo {
    /// Create a collector reading temperature from the default thermal zone
    pub fn new() -> Self {
        Self::with_thermal_zone(ThermalZone::default())
    }

    /// Create a collector reading temperature from a specific thermal zone
    pub fn with_thermal_zone(thermal: ThermalZone) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
            thermal,
        }
    }

    fn hostname() -> String {
        gethostname::gethostname().to_string_lossy().into_owned()
    }

    fn ip_address() -> String {
        UdpSocket::bind("0.0.0.0:0")
            .and_then(|socket| {
                socket.connect(ROUTE_PROBE_ADDR)?;
                socket.local_addr()
            })
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|_| FALLBACK_IP.to_string())
    }

    fn disk() -> Value {
        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == std::path::Path::new("/"));

        match root {
            Some(disk) => {
                let total = disk.total_space();
                let free = disk.available_space();
                let used = total.saturating_sub(free);
                json!({
                    "total": total,
                    "free": free,
                    "used": used,
                    "percent": percent(used, total),
                })
            }
            None => Value::Null,
        }
    }
}

impl Default for HostSystemInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInfoProvider for HostSystemInfo {
    fn system_info(&self) -> Map<String, Value> {
        let mut info = Map::new();
        info.insert("hostname".into(), Value::from(Self::hostname()));
        info.insert("ip_address".into(), Value::from(Self::ip_address()));

        {
            let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
            system.refresh_cpu_usage();
            system.refresh_memory();

            info.insert(
                "cpu_percent".into(),
                Value::from(round1(f64::from(system.global_cpu_usage()))),
            );

            let total = system.total_memory();
            let available = system.available_memory();
            let used = system.used_memory();
            info.insert(
                "memory".into(),
                json!({
                    "total": total,
                    "available": available,
                    "used": used,
                    "percent": percent(used, total),
                }),
            );
        }

        info.insert("disk".into(), Self::disk());
        info.insert(
            "temperature".into(),
            self.temperature().map_or(Value::Null, Value::from),
        );
        info.insert("uptime".into(), Value::from(System::uptime()));
        info
    }

    fn temperature(&self) -> Option<f64> {
        self.thermal.read_celsius()
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
