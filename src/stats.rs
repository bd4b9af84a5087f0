//! Per-participant pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by all stages of one participant's pipeline.
///
/// `displayed` / `dropped` / `corrupted` follow frames, `wire_errors` follows
/// packets, `max_frame_size` feeds receive-buffer sizing.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub displayed: AtomicU64,
    pub dropped: AtomicU64,
    pub corrupted: AtomicU64,
    pub wire_errors: AtomicU64,
    pub max_frame_size: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump_displayed(&self) -> u64 {
        self.displayed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn bump_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bump_corrupted(&self) {
        self.corrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bump_wire_errors(&self) {
        self.wire_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_frame_size(&self, size: u64) {
        self.max_frame_size.fetch_max(size, Ordering::Relaxed);
    }

    pub fn max_frame_size(&self) -> u64 {
        self.max_frame_size.load(Ordering::Relaxed)
    }

    /// One log-ready line, used for the periodic report and at teardown.
    pub fn summary(&self) -> String {
        format!(
            "{} displayed frames / {} frames dropped ({} corrupted)",
            self.displayed.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
            self.corrupted.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::PipelineStats;

    #[test]
    fn max_frame_size_is_monotonic() {
        let stats = PipelineStats::new();
        stats.observe_frame_size(100);
        stats.observe_frame_size(50);
        assert_eq!(stats.max_frame_size(), 100);
        stats.observe_frame_size(200);
        assert_eq!(stats.max_frame_size(), 200);
    }

    #[test]
    fn summary_reads_counters() {
        let stats = PipelineStats::new();
        stats.bump_displayed();
        stats.bump_dropped();
        stats.bump_corrupted();
        assert_eq!(stats.summary(), "1 displayed frames / 1 frames dropped (1 corrupted)");
    }
}
