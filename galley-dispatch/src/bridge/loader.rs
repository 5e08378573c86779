//! Bridge capability loader
//!
//! Answers "is the bridge agent there?" and, if not, waits a bounded time for
//! it to appear. The wait is a cancellable future: it ends early on
//! [`BridgeLoader::announce`] (host knows the agent just started), on the
//! cancellation token, or when a periodic probe succeeds.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::BridgeTransport;

#[derive(Debug, Clone)]
pub struct BridgeLoader {
    transport: Arc<dyn BridgeTransport>,
    max_wait: Duration,
    poll_interval: Duration,
    announced: Arc<Notify>,
}

impl BridgeLoader {
    pub fn new(
        transport: Arc<dyn BridgeTransport>,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            max_wait,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            announced: Arc::new(Notify::new()),
        }
    }

    /// Signal that the bridge agent has just become available
    pub fn announce(&self) {
        self.announced.notify_one();
    }

    /// Make sure the bridge is present, waiting up to the configured bound
    ///
    /// Returns `false` if the wait expired or was cancelled.
    #[instrument(skip(self, cancel), fields(max_wait_ms = self.max_wait.as_millis() as u64))]
    pub async fn ensure_available(&self, cancel: &CancellationToken) -> bool {
        if self.transport.probe().await {
            return true;
        }

        info!("Bridge not detected, waiting for it to start");

        let wait = async {
            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.announced.notified() => debug!("Bridge announced"),
                }
                if self.transport.probe().await {
                    return true;
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Bridge wait cancelled");
                false
            }
            found = tokio::time::timeout(self.max_wait, wait) => match found {
                Ok(found) => {
                    info!("Bridge detected");
                    found
                }
                Err(_) => {
                    warn!("Bridge did not appear within the wait bound");
                    false
                }
            },
        }
    }
}
