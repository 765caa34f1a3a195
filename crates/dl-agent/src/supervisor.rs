//! Top-level agent lifecycle
//!
//! Wires the session, pin controller, telemetry loops, and reconnect loop
//! together and runs them until shutdown. The pin driver is released on
//! every exit path.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use dl_core::config::AgentConfig;
use dl_core::traits::{PinDriver, SystemInfoProvider};

use crate::dispatch::CommandDispatcher;
use crate::gpio::{DriverGuard, PinController, PinRegistry};
use crate::session::Session;
use crate::telemetry::{SensorPublisher, StatusPublisher};
use crate::tunnel::{ExponentialBackoff, Reconnector, TunnelConnector};

/// The device agent
pub struct Agent {
    config: AgentConfig,
    driver: Arc<dyn PinDriver>,
    system: Arc<dyn SystemInfoProvider>,
}

impl Agent {
    /// Create an agent over the given pin driver and system info source
    pub fn new(
        config: AgentConfig,
        driver: Arc<dyn PinDriver>,
        system: Arc<dyn SystemInfoProvider>,
    ) -> Self {
        Self {
            config,
            driver,
            system,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Returns an error only if a telemetry loop exits on its own.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let _guard = DriverGuard::new(Arc::clone(&self.driver));

        let session = Arc::new(Session::new(self.config.device_id.clone()));
        let pins = Arc::new(PinController::new(
            PinRegistry::from_config(&self.config.pins),
            Arc::clone(&self.driver),
            Arc::clone(&session),
        ));
        pins.setup();

        let telemetry = &self.config.telemetry;
        let status = Arc::new(StatusPublisher::new(
            Arc::clone(&session),
            Arc::clone(&pins),
            Arc::clone(&self.system),
            telemetry.status_republish_after,
        ));
        let sensor = SensorPublisher::new(
            Arc::clone(&session),
            Arc::clone(&pins),
            Arc::clone(&self.system),
        );

        let loops = shutdown.child_token();
        let mut sensor_task = tokio::spawn(sensor.run(telemetry.sensor_interval, loops.clone()));
        let mut status_task = tokio::spawn(
            Arc::clone(&status).run(telemetry.status_interval, loops.clone()),
        );

        let dispatcher = CommandDispatcher::new(Arc::clone(&session), pins, status);
        let mut reconnector = Reconnector::new(
            TunnelConnector::new(&self.config),
            ExponentialBackoff::from_config(&self.config.backoff),
            Arc::clone(&session),
        );

        tracing::info!(
            device_id = %self.config.device_id,
            endpoint = %self.config.endpoint,
            pins = self.config.pins.len(),
            "agent started"
        );

        let result = tokio::select! {
            _ = reconnector.run(&dispatcher) => Ok(()),
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown requested");
                Ok(())
            }
            res = &mut sensor_task => {
                tracing::error!(result = ?res, "sensor loop exited unexpectedly");
                Err(anyhow::anyhow!("sensor loop exited"))
            }
            res = &mut status_task => {
                tracing::error!(result = ?res, "status loop exited unexpectedly");
                Err(anyhow::anyhow!("status loop exited"))
            }
        };

        loops.cancel();
        sensor_task.abort();
        status_task.abort();
        session.detach().await;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::SimulatedPinDriver;
    use serde_json::{Map, Value};
    use std::time::Duration;

    struct NoSystemInfo;

    impl SystemInfoProvider for NoSystemInfo {
        fn system_info(&self) -> Map<String, Value> {
            Map::new()
        }

        fn temperature(&self) -> Option<f64> {
            None
        }
    }

    #[tokio::test]
    async fn test_shutdown_releases_driver() {
        let mut config = AgentConfig::default();
        // Nothing listens here; the reconnect loop keeps backing off
        config.endpoint = "ws://127.0.0.1:9/raspberry-ws".to_string();
        config.backoff.initial = Duration::from_millis(10);
        config.backoff.max = Duration::from_millis(20);

        let driver = Arc::new(SimulatedPinDriver::new());
        let agent = Agent::new(config, driver.clone(), Arc::new(NoSystemInfo));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(agent.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!driver.is_released());
        assert_eq!(driver.level(dl_core::PinId::new(17)), Some(false));

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(driver.is_released());
    }
}
