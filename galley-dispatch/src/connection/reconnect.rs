//! Heartbeat and reconnection controller
//!
//! Background tasks hold a [`Weak`] reference to the connection so a dropped
//! connection is never kept alive by its own timers. Every task carries the
//! generation it was started for and does nothing once that has moved on.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::Inner;
use crate::bridge::{CloseSignal, TransportEvent};
use crate::status::ConnectionStatus;

/// Growth factor between consecutive reconnect delays
pub const BACKOFF_FACTOR: f64 = 1.5;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Delay before automatic attempt `attempt` (counted from 0)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * BACKOFF_FACTOR.powi(attempt as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn is_exhausted(&self, attempts_used: u32) -> bool {
        attempts_used >= self.max_attempts
    }
}

/// Sleep for `delay`, then try again unless superseded
pub(super) fn spawn_retry(inner: Weak<Inner>, generation: u64, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(inner) = inner.upgrade() {
            Inner::retry(&inner, generation).await;
        }
    })
}

/// Report the link as lost when the transport signals its end
pub(super) fn spawn_close_watcher(
    inner: Weak<Inner>,
    generation: u64,
    signal: CloseSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // A dropped sender is an orderly close
        let event = signal.await.unwrap_or(TransportEvent::Closed);
        debug!(?event, generation, "Close signal received");

        let Some(inner) = inner.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Closed => {
                Inner::link_lost(&inner, generation, ConnectionStatus::Disconnected, "closed by bridge")
            }
            TransportEvent::Failed(reason) => {
                Inner::link_lost(&inner, generation, ConnectionStatus::Error, &reason)
            }
        }
    })
}

/// Periodic liveness check; a zero interval disables it
pub(super) fn spawn_heartbeat(
    inner: Weak<Inner>,
    generation: u64,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if !inner.transport.is_active() {
                info!(generation, "Heartbeat found the link inactive");
                Inner::link_lost(
                    &inner,
                    generation,
                    ConnectionStatus::Disconnected,
                    "heartbeat: link inactive",
                );
                return;
            }
        }
    }))
}
