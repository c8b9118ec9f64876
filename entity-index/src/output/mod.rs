//! Progress reporting for long-running population runs.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

/// Receives progress of a full reindex.
pub trait ProgressSink: Send + Sync {
    /// A free-form status message.
    fn log(&self, message: &str);

    /// A new type starts; `max` entities will be processed.
    fn progress_start(&self, max: u64);

    /// `current` entities of the current type have been processed.
    fn set_progress(&self, current: u64);

    /// The current type is done.
    fn progress_finish(&self);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn log(&self, _message: &str) {}

    fn progress_start(&self, _max: u64) {}

    fn set_progress(&self, _current: u64) {}

    fn progress_finish(&self) {}
}

/// Reports progress through `tracing` events.
#[derive(Debug, Default)]
pub struct TracingProgress {
    max: AtomicU64,
    current: AtomicU64,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TracingProgress {
    fn log(&self, message: &str) {
        info!("{}", message);
    }

    fn progress_start(&self, max: u64) {
        self.max.store(max, Ordering::Relaxed);
        self.current.store(0, Ordering::Relaxed);
        debug!(max = max, "Progress started");
    }

    fn set_progress(&self, current: u64) {
        self.current.store(current, Ordering::Relaxed);
        info!(
            current = current,
            max = self.max.load(Ordering::Relaxed),
            "Population progress"
        );
    }

    fn progress_finish(&self) {
        info!(
            processed = self.current.load(Ordering::Relaxed),
            max = self.max.load(Ordering::Relaxed),
            "Progress finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_progress_tracks_position() {
        let progress = TracingProgress::new();
        progress.progress_start(1000);
        progress.set_progress(200);
        assert_eq!(progress.max.load(Ordering::Relaxed), 1000);
        assert_eq!(progress.current.load(Ordering::Relaxed), 200);

        progress.progress_start(5);
        assert_eq!(progress.current.load(Ordering::Relaxed), 0);
    }
}
