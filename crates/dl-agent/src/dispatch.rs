//! Inbound command dispatch
//!
//! Maps each inbound message to its handler. Nothing here is fatal:
//! unknown types and unknown commands are logged and dropped.

use std::sync::Arc;

use serde_json::{Map, Value};

use dl_protocol::{Inbound, Outbound, PinId};

use crate::gpio::PinController;
use crate::session::Session;
use crate::telemetry::StatusPublisher;

/// Routes inbound messages to handlers
pub struct CommandDispatcher {
    session: Arc<Session>,
    pins: Arc<PinController>,
    status: Arc<StatusPublisher>,
}

impl CommandDispatcher {
    /// Create a dispatcher
    pub fn new(session: Arc<Session>, pins: Arc<PinController>, status: Arc<StatusPublisher>) -> Self {
        Self {
            session,
            pins,
            status,
        }
    }

    /// Handle one inbound message
    pub async fn dispatch(&self, message: Inbound) {
        tracing::debug!(kind = message.kind(), "received message");

        match message {
            Inbound::Identified => {
                self.session.mark_identified();
                tracing::info!("device identified successfully");
                self.status.publish_now().await;
            }

            Inbound::Command { command, params } => self.handle_command(&command, &params).await,

            Inbound::GpioCommand { pin, state } => self.handle_gpio_command(pin, state).await,

            Inbound::ConfigUpdate { settings } => self.handle_config_update(&settings),

            Inbound::Error { reason } => {
                tracing::error!(
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "coordinator reported an error"
                );
            }

            Inbound::Unknown { kind } => {
                tracing::warn!(kind = %kind, "ignoring message of unknown type");
            }
        }
    }

    async fn handle_command(&self, command: &str, params: &Map<String, Value>) {
        match command {
            "get_status" => {
                self.status.publish_now().await;
            }
            "restart" => {
                // Extension point: restarting the host is not handled by the agent
                tracing::info!(params = params.len(), "restart command received");
            }
            "update_config" => {
                self.handle_config_update(params);
            }
            other => {
                tracing::warn!(command = %other, "unknown command");
            }
        }
    }

    async fn handle_gpio_command(&self, pin: PinId, state: bool) {
        let success = self.pins.set_pin(pin, state);

        let ack = Outbound::GpioAck {
            pin,
            requested_state: state,
            success,
        };
        if let Err(e) = self.session.send(ack).await {
            tracing::warn!(%pin, error = %e, "failed to send gpio_ack");
        }
    }

    /// Extension point: configuration is fixed at startup, so updates are
    /// only logged
    fn handle_config_update(&self, settings: &Map<String, Value>) {
        let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
        tracing::info!(keys = ?keys, "configuration update received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{PinRegistry, SimulatedPinDriver};
    use dl_core::config::AgentConfig;
    use dl_core::traits::SystemInfoProvider;
    use dl_protocol::Envelope;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct EmptySystemInfo;

    impl SystemInfoProvider for EmptySystemInfo {
        fn system_info(&self) -> Map<String, Value> {
            Map::new()
        }

        fn temperature(&self) -> Option<f64> {
            None
        }
    }

    async fn dispatcher() -> (CommandDispatcher, Arc<Session>, mpsc::Receiver<Envelope>) {
        let session = Arc::new(Session::new("raspberry_001"));
        let (tx, rx) = mpsc::channel(32);
        session.attach(tx).await;

        let pins = Arc::new(PinController::new(
            PinRegistry::from_config(&AgentConfig::default().pins),
            Arc::new(SimulatedPinDriver::new()),
            session.clone(),
        ));
        pins.setup();

        let status = Arc::new(StatusPublisher::new(
            session.clone(),
            pins.clone(),
            Arc::new(EmptySystemInfo),
            Duration::from_secs(60),
        ));

        (CommandDispatcher::new(session.clone(), pins, status), session, rx)
    }

    /// Collect everything queued so far, letting spawned notifications run
    async fn drain(rx: &mut mpsc::Receiver<Envelope>) -> Vec<Envelope> {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(envelope);
        }
        out
    }

    fn command(name: &str) -> Inbound {
        Inbound::Command {
            command: name.to_string(),
            params: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_identified_triggers_status() {
        let (dispatcher, session, mut rx) = dispatcher().await;

        dispatcher.dispatch(Inbound::Identified).await;

        assert!(session.is_identified());
        let sent = drain(&mut rx).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind(), "status");
    }

    #[tokio::test]
    async fn test_unknown_type_is_silent() {
        let (dispatcher, session, mut rx) = dispatcher().await;

        dispatcher
            .dispatch(Inbound::Unknown {
                kind: "firmware_blob".to_string(),
            })
            .await;
        assert!(!session.is_identified());

        session.mark_identified();
        dispatcher
            .dispatch(Inbound::Unknown {
                kind: "firmware_blob".to_string(),
            })
            .await;
        assert!(session.is_identified());
        assert!(drain(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_status_bypasses_gate() {
        let (dispatcher, _session, mut rx) = dispatcher().await;

        dispatcher.dispatch(Inbound::Identified).await;
        dispatcher.dispatch(command("get_status")).await;
        dispatcher.dispatch(command("get_status")).await;

        let sent = drain(&mut rx).await;
        assert_eq!(sent.iter().filter(|e| e.kind() == "status").count(), 3);
    }

    #[tokio::test]
    async fn test_get_status_before_identified_is_noop() {
        let (dispatcher, _session, mut rx) = dispatcher().await;
        dispatcher.dispatch(command("get_status")).await;
        assert!(drain(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_placeholder_commands_send_nothing() {
        let (dispatcher, session, mut rx) = dispatcher().await;
        session.mark_identified();

        dispatcher.dispatch(command("restart")).await;
        dispatcher.dispatch(command("update_config")).await;
        dispatcher.dispatch(command("self_destruct")).await;
        dispatcher
            .dispatch(Inbound::ConfigUpdate {
                settings: Map::new(),
            })
            .await;
        dispatcher
            .dispatch(Inbound::Error {
                reason: Some("bad secret".to_string()),
            })
            .await;

        assert!(drain(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_gpio_command_acks_once() {
        let (dispatcher, _session, mut rx) = dispatcher().await;

        for (pin, expected) in [(17, true), (23, false), (99, false)] {
            dispatcher
                .dispatch(Inbound::GpioCommand {
                    pin: PinId::new(pin),
                    state: true,
                })
                .await;

            let sent = drain(&mut rx).await;
            let acks: Vec<_> = sent
                .iter()
                .filter_map(|e| match &e.body {
                    Outbound::GpioAck { pin, success, .. } => Some((*pin, *success)),
                    _ => None,
                })
                .collect();
            assert_eq!(acks, vec![(PinId::new(pin), expected)]);

            let notified = sent.iter().any(|e| e.kind() == "gpio_state");
            assert_eq!(notified, expected);
        }
    }

    #[tokio::test]
    async fn test_gpio_command_repeated() {
        let (dispatcher, _session, mut rx) = dispatcher().await;
        let message = Inbound::GpioCommand {
            pin: PinId::new(18),
            state: true,
        };

        dispatcher.dispatch(message.clone()).await;
        dispatcher.dispatch(message).await;

        let sent = drain(&mut rx).await;
        let successes: Vec<bool> = sent
            .iter()
            .filter_map(|e| match &e.body {
                Outbound::GpioAck { success, .. } => Some(*success),
                _ => None,
            })
            .collect();
        assert_eq!(successes, vec![true, true]);
        assert!(dispatcher.pins.registry().get(PinId::new(18)).unwrap().state);
    }
}
