//! Shared session state
//!
//! One [`Session`] lives for the whole process. Each successful connection
//! attaches its outbound queue to it; disconnection detaches the queue and
//! clears the identified flag. Publishers and handlers only ever see the
//! session, never the socket.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::Instant;

use dl_core::error::TransportError;
use dl_protocol::{Envelope, Outbound};

/// Identification state and outbound path of the live connection
pub struct Session {
    /// Device ID stamped on every outbound envelope
    device_id: String,
    /// Whether the coordinator has acknowledged `identify`
    identified: AtomicBool,
    /// Queue drained by the current connection's writer task
    outbound: RwLock<Option<mpsc::Sender<Envelope>>>,
    /// When the last status was published
    last_status: Mutex<Option<Instant>>,
}

impl Session {
    /// Create a disconnected session
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            identified: AtomicBool::new(false),
            outbound: RwLock::new(None),
            last_status: Mutex::new(None),
        }
    }

    /// Device ID used on outbound envelopes
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Whether telemetry may flow
    pub fn is_identified(&self) -> bool {
        self.identified.load(Ordering::SeqCst)
    }

    /// Record the coordinator's `identified` acknowledgment
    pub fn mark_identified(&self) {
        self.identified.store(true, Ordering::SeqCst);
    }

    /// Whether a connection is currently attached
    pub async fn is_connected(&self) -> bool {
        self.outbound
            .read()
            .await
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Attach the outbound queue of a freshly connected tunnel
    pub async fn attach(&self, outbound: mpsc::Sender<Envelope>) {
        self.identified.store(false, Ordering::SeqCst);
        *self.outbound.write().await = Some(outbound);
    }

    /// Drop the current connection's queue and reset identification
    pub async fn detach(&self) {
        self.identified.store(false, Ordering::SeqCst);
        self.outbound.write().await.take();
    }

    /// Stamp a body with the device ID and queue it for sending.
    ///
    /// Returns once the envelope is queued, not once it is on the wire.
    pub async fn send(&self, body: Outbound) -> Result<(), TransportError> {
        let tx = self
            .outbound
            .read()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let kind = body.kind();
        tx.send(Envelope::new(self.device_id.clone(), body))
            .await
            .map_err(|_| TransportError::Closed("outbound queue closed".to_string()))?;

        tracing::trace!(kind, "queued outbound message");
        Ok(())
    }

    /// Time of the last status publish
    pub async fn last_status(&self) -> Option<Instant> {
        *self.last_status.lock().await
    }

    /// Record that a status was just published
    pub async fn record_status(&self) {
        *self.last_status.lock().await = Some(Instant::now());
    }
}
