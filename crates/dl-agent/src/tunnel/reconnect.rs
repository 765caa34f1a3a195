//! Exponential backoff and the reconnect loop

use std::sync::Arc;
use std::time::Duration;

use dl_core::config::BackoffConfig;

use super::connector::{ActiveTunnel, TunnelConnector, TunnelEvent};
use crate::dispatch::CommandDispatcher;
use crate::session::Session;

/// Exponential backoff with optional jitter for reconnection attempts
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Current delay
    current: Duration,
    /// Minimum delay, restored on reset
    initial: Duration,
    /// Maximum delay
    max: Duration,
    /// Multiplier
    multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new backoff from configuration
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial, config.max, config.multiplier, config.jitter)
    }

    /// Create a new backoff with custom parameters
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        let initial = std::cmp::min(initial, max);
        Self {
            current: initial,
            initial,
            max,
            multiplier,
            jitter,
        }
    }

    /// Get the next delay and advance the backoff.
    ///
    /// The returned delay, jitter included, never exceeds the maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;

        self.current = self.scaled(self.current, self.multiplier);

        let jitter = self.scaled(delay, self.jitter * rand::random::<f64>());
        std::cmp::min(delay.saturating_add(jitter), self.max)
    }

    /// `delay * factor`, saturating at the maximum
    fn scaled(&self, delay: Duration, factor: f64) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
            .map_or(self.max, |scaled| std::cmp::min(scaled, self.max))
    }

    /// Delay that the next call to [`next_delay`](Self::next_delay) is based on
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Reset the backoff to its minimum delay
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Drives connect, identify, receive, and backoff forever.
///
/// Connect failures and mid-session failures are treated the same way:
/// the identified flag is cleared, the loop sleeps for the current backoff
/// delay, and tries again. There is no retry limit.
pub struct Reconnector {
    connector: TunnelConnector,
    backoff: ExponentialBackoff,
    session: Arc<Session>,
}

impl Reconnector {
    /// Create a reconnector
    pub fn new(connector: TunnelConnector, backoff: ExponentialBackoff, session: Arc<Session>) -> Self {
        Self {
            connector,
            backoff,
            session,
        }
    }

    /// Run the connection lifecycle. Only returns if the future is dropped.
    pub async fn run(&mut self, dispatcher: &CommandDispatcher) {
        loop {
            tracing::info!(endpoint = %self.connector.endpoint(), "connecting to coordinator");

            match self.connector.connect().await {
                Ok(mut tunnel) => {
                    self.backoff.reset();
                    tracing::info!(
                        endpoint = %self.connector.endpoint(),
                        "connected to coordinator, identification sent"
                    );

                    self.session.attach(tunnel.outbound()).await;
                    let reason = Self::receive_loop(&mut tunnel, dispatcher).await;
                    self.session.detach().await;
                    tunnel.close().await;

                    tracing::warn!(reason = %reason, "disconnected from coordinator");
                }
                Err(e) => {
                    self.session.detach().await;
                    tracing::warn!(error = %e, "connection attempt failed");
                }
            }

            let delay = self.backoff.next_delay();
            tracing::info!(delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
            tokio::time::sleep(delay).await;
        }
    }

    /// Dispatch inbound messages in arrival order until the tunnel drops
    async fn receive_loop(tunnel: &mut ActiveTunnel, dispatcher: &CommandDispatcher) -> String {
        loop {
            match tunnel.recv_event().await {
                TunnelEvent::Message(message) => dispatcher.dispatch(message).await,
                TunnelEvent::Disconnected(reason) => return reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_increases() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
            0.0, // No jitter for deterministic test
        );

        let d1 = backoff.next_delay();
        let d2 = backoff.next_delay();
        let d3 = backoff.next_delay();

        assert_eq!(d1, Duration::from_secs(1));
        assert_eq!(d2, Duration::from_secs(2));
        assert_eq!(d3, Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_max() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(20), Duration::from_secs(30), 2.0, 0.0);

        let d1 = backoff.next_delay();
        let d2 = backoff.next_delay();
        let d3 = backoff.next_delay();

        assert_eq!(d1, Duration::from_secs(20));
        assert_eq!(d2, Duration::from_secs(30)); // Capped at max
        assert_eq!(d3, Duration::from_secs(30)); // Still capped
    }

    #[test]
    fn test_backoff_reset_returns_to_minimum() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30), 2.0, 0.0);

        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.current(), Duration::from_secs(30));

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_never_exceeds_max() {
        let max = Duration::from_secs(8);
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), max, 2.0, 1.0);

        for _ in 0..50 {
            assert!(backoff.next_delay() <= max);
        }
    }

    #[test]
    fn test_huge_multiplier_saturates() {
        let max = Duration::from_secs(30);
        for multiplier in [1e20, f64::MAX, f64::INFINITY] {
            let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), max, multiplier, 1.0);
            assert!(backoff.next_delay() <= max);
            assert_eq!(backoff.current(), max);
            assert_eq!(backoff.next_delay(), max);
        }
    }

    #[test]
    fn test_huge_max_does_not_overflow() {
        let max = Duration::from_secs(u64::MAX);
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(u64::MAX / 2), max, 4.0, 1.0);
        for _ in 0..3 {
            assert!(backoff.next_delay() <= max);
        }
    }

    #[test]
    fn test_from_config() {
        let config = BackoffConfig::default();
        let mut backoff = ExponentialBackoff::from_config(&config);
        assert_eq!(backoff.next_delay(), config.initial);
    }
}
