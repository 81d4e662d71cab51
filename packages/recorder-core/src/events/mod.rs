//! Event system for surfacing controller progress to a UI.
//!
//! This module provides [`EventEmitter`] so the controller (C8) can report
//! phase transitions, chunk/upload progress, and terminal outcomes without
//! knowing whether it is being driven from a native test harness or from the
//! browser tab (where the wasm entry point bridges these events to a
//! JS-callable callback - see `recorder-web::js_emitter`).

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::error::RecorderError;
use crate::model::Phase;

/// Events emitted by the recording controller over its lifetime.
///
/// Each variant corresponds to an observable change in [`Phase`] or in the
/// upload pipeline's progress, plus the terminal outcomes a UI needs to
/// render a message for (spec §7, "Terminal messages").
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControllerEvent {
    /// The local phase advanced. Mirrors but may briefly lead the remote
    /// `status` field on the session document (spec §3, RecorderRuntimeState).
    PhaseChanged {
        phase: Phase,
        #[serde(rename = "timestampMs")]
        timestamp_ms: u64,
    },

    /// The countdown before recording starts ticked down by one second.
    CountdownTick { remaining_seconds: u32 },

    /// Elapsed recording time advanced, for a live timer display.
    ElapsedTick {
        elapsed_seconds: u32,
        #[serde(rename = "remainingSeconds")]
        remaining_seconds: u32,
    },

    /// A chunk finished recording locally and was handed to the upload
    /// manager.
    ChunkReady { chunk_index: u64, size_bytes: u64 },

    /// A chunk finished uploading successfully.
    ChunkUploaded {
        chunk_index: u64,
        #[serde(rename = "chunksCount")]
        chunks_count: u64,
    },

    /// Aggregate upload progress changed (spec §4.5, throttled progress
    /// writes): `uploadProgress` is an estimate in `[0, 100]`.
    UploadProgress { upload_progress: u8 },

    /// The recording paused, with the reason distinguished so the UI can
    /// show the right affordance (spec §4.3).
    Paused { cause: PauseCause },

    /// The recording resumed after a pause.
    Resumed,

    /// A non-fatal error was observed and retried or absorbed locally (for
    /// example a single transient upload attempt failure).
    Warning {
        code: &'static str,
        message: String,
    },

    /// The controller reached a terminal state. `message` is the
    /// human-readable terminal message from spec §7's table.
    Terminal {
        phase: Phase,
        message: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<&'static str>,
    },
}

/// Why a recording paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseCause {
    /// The tab became hidden (spec §4.3, `visibilitychange`).
    Visibility,
    /// The user explicitly paused.
    User,
}

impl ControllerEvent {
    /// Builds a `Terminal` event from a [`RecorderError`], picking the
    /// spec §7 message for the error's code where one is defined, and
    /// falling back to a generic message otherwise.
    #[must_use]
    pub fn terminal_from_error(phase: Phase, err: &RecorderError) -> Self {
        use crate::error::ErrorCode;
        Self::Terminal {
            phase,
            message: terminal_message_for(err.code()),
            error_code: Some(err.code()),
        }
    }
}

/// Maps an error code to the terminal message from spec §7's table. Unknown
/// codes fall back to a generic failure message; this keeps the mapping
/// total without requiring every new error variant to be enumerated here.
fn terminal_message_for(code: &'static str) -> &'static str {
    match code {
        "session_expired" => "this recording link has expired",
        "session_already_recorded" => "already recorded",
        "session_removed" => "prompt removed by owner",
        "session_not_found" => "this recording link is no longer valid",
        "permission_denied" => "microphone/camera access was denied",
        "no_device" => "no microphone or camera is available",
        "device_in_use" => "the requested device is already in use",
        "media_unsupported" => "this browser does not support recording",
        "unsupported_codec" => "this browser does not support any supported recording format",
        "upload_fatal" => "upload failed, please try again",
        _ => "recording failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_message_falls_back_for_unknown_code() {
        assert_eq!(terminal_message_for("something_new"), "recording failed");
    }

    #[test]
    fn terminal_from_error_carries_code() {
        let err = RecorderError::from(crate::error::SessionError::Expired);
        let event = ControllerEvent::terminal_from_error(Phase::Failed, &err);
        match event {
            ControllerEvent::Terminal {
                message,
                error_code,
                ..
            } => {
                assert_eq!(message, "this recording link has expired");
                assert_eq!(error_code, Some("session_expired"));
            }
            _ => panic!("expected Terminal variant"),
        }
    }
}
