//! Injectable configuration for the recording engine.
//!
//! Every timing constant that spec §9 calls out as needing to be
//! deterministic in tests ("the chunk cadence, countdown, and backoff
//! constants should all be injectable") lives here rather than as a literal
//! scattered through `recorder.rs`/`upload.rs`, mirroring
//! `thaumic-core::state::{Config, StreamingConfig}`.

use std::time::Duration;

/// Tunable constants for a single recording attempt.
///
/// Constructed once per session and threaded through `ChunkedRecorder`,
/// `UploadManager`, and `RecordingController`. `Default` reproduces the
/// spec's defaults exactly; tests typically start from `Default::default()`
/// and override only the fields a scenario cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Target time between `chunk-available` events (spec §4.3, default 45s).
    pub chunk_cadence: Duration,

    /// Fixed countdown before recording starts (spec §4.8, default 3s).
    pub countdown_duration: Duration,

    /// Hard wall-clock recording cap (spec §4.3/§6, default 15 minutes).
    pub max_duration: Duration,

    /// Window before `max_duration` in which `duration-warning` fires
    /// exactly once (spec §4.3, default 60s).
    pub duration_warning_window: Duration,

    /// Maximum concurrent in-flight chunk uploads (spec §4.4, default 3).
    pub upload_concurrency: usize,

    /// Per-chunk retry delays, walked in order on each failed attempt
    /// (spec §4.4, default `[1s, 2s, 4s]`). The chunk is marked
    /// `UploadFatal` once this table is exhausted.
    pub retry_backoff: Vec<Duration>,

    /// Interval at which `reportProgress` writes are throttled
    /// (spec §4.5, default 1s).
    pub progress_report_interval: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_cadence: Duration::from_secs(45),
            countdown_duration: Duration::from_secs(3),
            max_duration: Duration::from_secs(900),
            duration_warning_window: Duration::from_secs(60),
            upload_concurrency: 3,
            retry_backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            progress_report_interval: Duration::from_secs(1),
        }
    }
}

impl RecorderConfig {
    /// Number of retry attempts available for a single chunk, i.e. the
    /// length of [`Self::retry_backoff`].
    #[must_use]
    pub fn max_retry_attempts(&self) -> usize {
        self.retry_backoff.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let config = RecorderConfig::default();
        assert_eq!(config.chunk_cadence, Duration::from_secs(45));
        assert_eq!(config.countdown_duration, Duration::from_secs(3));
        assert_eq!(config.max_duration, Duration::from_secs(900));
        assert_eq!(config.upload_concurrency, 3);
        assert_eq!(config.max_retry_attempts(), 3);
    }
}
