//! Sensor reading publisher

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use dl_core::traits::SystemInfoProvider;
use dl_protocol::Outbound;

use crate::gpio::PinController;
use crate::session::Session;

/// Publishes `sensor` envelopes with input pin levels and temperature
pub struct SensorPublisher {
    session: Arc<Session>,
    pins: Arc<PinController>,
    system: Arc<dyn SystemInfoProvider>,
}

impl SensorPublisher {
    /// Create a sensor publisher
    pub fn new(
        session: Arc<Session>,
        pins: Arc<PinController>,
        system: Arc<dyn SystemInfoProvider>,
    ) -> Self {
        Self {
            session,
            pins,
            system,
        }
    }

    /// Current readings keyed by sensor name
    pub fn readings(&self) -> Map<String, Value> {
        let mut sensors = Map::new();
        for (_, name, level) in self.pins.refresh_inputs() {
            sensors.insert(name, Value::Bool(level));
        }
        sensors.insert(
            "cpu_temperature".to_string(),
            self.system.temperature().map_or(Value::Null, Value::from),
        );
        sensors
    }

    /// Read and publish once. Does nothing while not identified.
    pub async fn publish_once(&self) -> bool {
        if !self.session.is_identified() {
            return false;
        }

        let sensors = self.readings();
        tracing::debug!(count = sensors.len(), "publishing sensor data");
        match self.session.send(Outbound::Sensor { sensors }).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to publish sensor data");
                false
            }
        }
    }

    /// Publish every `period` until cancelled.
    ///
    /// A failed publish waits for the next tick; there is no immediate retry.
    pub async fn run(self, period: Duration, cancel: CancellationToken) {
        let mut ticker = super::ticker(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => break,
            }
            self.publish_once().await;
        }
        tracing::debug!("sensor loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{PinRegistry, SimulatedPinDriver};
    use dl_core::config::AgentConfig;
    use dl_core::PinId;
    use tokio::sync::mpsc;

    struct NoThermal;

    impl SystemInfoProvider for NoThermal {
        fn system_info(&self) -> Map<String, Value> {
            Map::new()
        }

        fn temperature(&self) -> Option<f64> {
            None
        }
    }

    #[tokio::test]
    async fn test_sensor_payload() {
        let session = Arc::new(Session::new("raspberry_001"));
        let (tx, mut rx) = mpsc::channel(4);
        session.attach(tx).await;

        let driver = Arc::new(SimulatedPinDriver::new());
        let pins = Arc::new(PinController::new(
            PinRegistry::from_config(&AgentConfig::default().pins),
            driver.clone(),
            session.clone(),
        ));
        pins.setup();
        driver.set_input(PinId::new(23), true).unwrap();

        let publisher = SensorPublisher::new(session.clone(), pins, Arc::new(NoThermal));
        assert!(!publisher.publish_once().await);

        session.mark_identified();
        assert!(publisher.publish_once().await);

        let envelope = rx.recv().await.unwrap();
        match envelope.body {
            Outbound::Sensor { sensors } => {
                assert_eq!(sensors["motion_sensor"], Value::Bool(true));
                assert_eq!(sensors["cpu_temperature"], Value::Null);
                assert!(!sensors.contains_key("relay_1"));
            }
            other => panic!("expected sensor, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let session = Arc::new(Session::new("raspberry_001"));
        session.mark_identified();

        let pins = Arc::new(PinController::new(
            PinRegistry::from_config(&AgentConfig::default().pins),
            Arc::new(SimulatedPinDriver::new()),
            session.clone(),
        ));
        let publisher = SensorPublisher::new(session, pins, Arc::new(NoThermal));

        assert!(!publisher.publish_once().await);
        assert!(!publisher.publish_once().await);
    }
}
