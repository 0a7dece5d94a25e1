// plain log lines instead of a progress bar, so progress shows up outside of a tty too
use {
    std::time::{Duration, Instant},
    tokio::sync::mpsc::UnboundedReceiver,
    tracing::info,
    review_sentiment_core::collector::{ProgressUpdate, Stage},
};

const REPORT_INTERVAL: Duration = Duration::from_secs(10);

pub struct Progress {
    message: String,
    started_at: Instant,
    reported_at: Instant,
    total_processed: u64,
}

impl Progress {
    pub fn new(message: String) -> Self {
        Self {
            message,
            started_at: Instant::now(),
            reported_at: Instant::now(),
            total_processed: 0,
        }
    }

    pub fn update(&mut self) -> bool {
        self.total_processed += 1;

        let now = Instant::now();
        if now - self.reported_at >= REPORT_INTERVAL {
            self.reported_at = now;
            info!("{}: {} total ({:.2}/second)", self.message, self.total_processed, self.rate(now));
            true
        } else {
            false
        }
    }

    /// Logs a collection update, at most once per interval unless the session completed.
    pub fn report(&mut self, update: &ProgressUpdate) -> bool {
        self.total_processed = update.processed_count as u64;

        let now = Instant::now();
        if update.stage == Stage::Completed || now - self.reported_at >= REPORT_INTERVAL {
            self.reported_at = now;
            info!(
                "{}: {} processed, {} accepted ({:.1}%, {:.2} reviews/second)",
                self.message, update.processed_count, update.accepted_count, update.percent, self.rate(now),
            );
            true
        } else {
            false
        }
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    fn rate(&self, now: Instant) -> f32 {
        let elapsed = (now - self.started_at).as_secs_f32();
        if elapsed > 0.0 {
            self.total_processed as f32 / elapsed
        } else {
            0.0
        }
    }
}

pub async fn report_progress(message: String, mut updates: UnboundedReceiver<ProgressUpdate>) {
    let mut progress = Progress::new(message);
    while let Some(update) = updates.recv().await {
        progress.report(&update);
    }
}
