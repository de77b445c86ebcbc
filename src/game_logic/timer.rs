use std::time::Duration;
use tokio::time::Instant;

/// Elapsed-time clock for a play-through.
///
/// Elapsed time is always `now - started_at` on a monotonic clock, never a count of
/// ticks, so a late or skipped display tick cannot make it drift.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    started_at: Option<Instant>,
    frozen: Option<Duration>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from zero, discarding any previous run.
    pub fn start_at(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.frozen = None;
    }

    /// Freezes the elapsed value. Stopping a stopped timer keeps the first value.
    pub fn stop_at(&mut self, now: Instant) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed_at(now));
        }
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match (self.started_at, self.frozen) {
            (_, Some(frozen)) => frozen,
            (Some(started_at), None) => now.saturating_duration_since(started_at),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.frozen.is_none()
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_at(Instant::now()).as_secs()
    }
}

/// Renders whole seconds as zero-padded `MM:SS`. Minutes do not roll over into hours.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
