//! Fixed-interval pacing for polite, sequential request streams

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Spaces consecutive calls to [`Pacer::wait`] at least `interval` apart.
///
/// Owned by a single sequential loop (careful batches, circle sampling), so
/// it needs no locking. The first call returns at once.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    next_slot: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Sleep until the next slot, then book the one after it
    pub async fn wait(&mut self) {
        if let Some(slot) = self.next_slot {
            if slot > Instant::now() {
                trace!("Pacing for {:?}", slot - Instant::now());
                sleep_until(slot).await;
            }
        }
        self.next_slot = Some(Instant::now() + self.interval);
    }
}
