//! Request pacing within a scraping cycle.
//!
//! Two deliberate delays keep the scraper below anti-bot thresholds: a batch
//! pause after every `batch_size`-th accepted article (counted across the whole
//! cycle, not per source) and a shorter pause between consecutive sources.
//! Tests build an instant controller and assert on the pause counters.

use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PaceController {
    batch_size: usize,
    batch_pause: Duration,
    source_pause: Duration,
    accepted: usize,
    batch_pauses: usize,
    source_pauses: usize,
}

impl PaceController {
    /// Create a controller with zeroed counters.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Pause after every `batch_size`-th accepted article; clamped to at least 1
    /// * `batch_pause` - Length of each batch pause
    /// * `source_pause` - Length of the pause between two sources
    pub fn new(batch_size: usize, batch_pause: Duration, source_pause: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_pause,
            source_pause,
            accepted: 0,
            batch_pauses: 0,
            source_pauses: 0,
        }
    }

    /// Same counting rules with zero-length pauses.
    #[cfg(test)]
    pub fn instant(batch_size: usize) -> Self {
        Self::new(batch_size, Duration::ZERO, Duration::ZERO)
    }

    /// Record one accepted article, pausing when it completes a batch.
    pub async fn article_accepted(&mut self) {
        self.accepted += 1;
        if self.accepted % self.batch_size == 0 {
            self.batch_pauses += 1;
            info!(
                accepted = self.accepted,
                pause = ?self.batch_pause,
                "Batch of relevant articles reached; pausing"
            );
            pause(self.batch_pause).await;
        }
    }

    /// Pause between two sources.
    pub async fn between_sources(&mut self) {
        self.source_pauses += 1;
        pause(self.source_pause).await;
    }

    /// Clear the counters at the start of a new cycle.
    pub fn reset(&mut self) {
        self.accepted = 0;
        self.batch_pauses = 0;
        self.source_pauses = 0;
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn batch_pauses(&self) -> usize {
        self.batch_pauses
    }

    pub fn source_pauses(&self) -> usize {
        self.source_pauses
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
