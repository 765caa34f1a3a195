//! Status snapshot publisher

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dl_core::traits::SystemInfoProvider;
use dl_protocol::{DeviceStatus, Outbound};

use crate::gpio::PinController;
use crate::session::Session;

/// Publishes `status` envelopes on demand and on a gated schedule
pub struct StatusPublisher {
    session: Arc<Session>,
    pins: Arc<PinController>,
    system: Arc<dyn SystemInfoProvider>,
    /// Scheduled publishes are skipped until this much time has passed
    /// since the previous publish
    republish_after: Duration,
}

impl StatusPublisher {
    /// Create a status publisher
    pub fn new(
        session: Arc<Session>,
        pins: Arc<PinController>,
        system: Arc<dyn SystemInfoProvider>,
        republish_after: Duration,
    ) -> Self {
        Self {
            session,
            pins,
            system,
            republish_after,
        }
    }

    /// Publish a status right away, ignoring the republish gate.
    ///
    /// Returns whether a status was queued. Does nothing while not identified.
    pub async fn publish_now(&self) -> bool {
        if !self.session.is_identified() {
            tracing::debug!("not identified, skipping status publish");
            return false;
        }

        let body = Outbound::Status {
            status: DeviceStatus::Online,
            system_info: self.system.system_info(),
            gpio_states: self.pins.states(),
        };

        match self.session.send(body).await {
            Ok(()) => {
                self.session.record_status().await;
                tracing::info!("published status update");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to publish status");
                false
            }
        }
    }

    /// Publish a status if more than the republish threshold has elapsed
    /// since the last one
    pub async fn publish_if_due(&self) -> bool {
        if !self.session.is_identified() {
            return false;
        }

        if let Some(last) = self.session.last_status().await {
            if last.elapsed() <= self.republish_after {
                tracing::trace!(
                    elapsed_ms = last.elapsed().as_millis() as u64,
                    "status published recently, skipping"
                );
                return false;
            }
        }

        self.publish_now().await
    }

    /// Check every `period` whether a scheduled status is due
    pub async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = super::ticker(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => break,
            }
            self.publish_if_due().await;
        }
        tracing::debug!("status loop stopped");
    }
}
