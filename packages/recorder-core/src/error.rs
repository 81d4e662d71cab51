//! Centralized error types for the recording engine core.
//!
//! Each concern (link parsing, media acquisition, chunked recording, upload,
//! session access) gets its own `thiserror` enum with a machine-readable
//! `.code()`, and [`RecorderError`] aggregates them for the controller (C8),
//! which is the only component allowed to turn an error into a user-visible
//! terminal state (see spec §7, "Propagation policy").

use thiserror::Error;

/// Trait for error types that provide a machine-readable error code.
///
/// Implemented per concern so every error surfaced to the controller carries
/// a stable string identifier regardless of which layer produced it.
pub trait ErrorCode {
    /// Returns a machine-readable error code, stable across versions.
    fn code(&self) -> &'static str;
}

/// Errors from the Session Link Parser (C7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The URL contained no recognizable session identifier in either the
    /// path or the `session` query parameter.
    #[error("no session identifier found in link")]
    MissingIdentifier,

    /// The identifier did not split into exactly five non-empty segments.
    #[error("session identifier has {found} segment(s), expected 5")]
    WrongSegmentCount { found: usize },

    /// One of the five segments was empty.
    #[error("session identifier segment {index} is empty")]
    EmptySegment { index: usize },

    /// The final segment did not parse as an integer unix timestamp.
    #[error("session identifier's timestamp segment is not a valid integer")]
    InvalidTimestamp,
}

impl ErrorCode for LinkError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingIdentifier => "link_missing_identifier",
            Self::WrongSegmentCount { .. } => "link_wrong_segment_count",
            Self::EmptySegment { .. } => "link_empty_segment",
            Self::InvalidTimestamp => "link_invalid_timestamp",
        }
    }
}

/// Errors from the Media Acquirer (C2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("microphone/camera permission was denied")]
    PermissionDenied,

    #[error("no matching media device is available")]
    NoDevice,

    #[error("the requested device is already in use")]
    DeviceInUse,

    #[error("the runtime does not support the requested media kind")]
    Unsupported,
}

impl ErrorCode for MediaError {
    fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::NoDevice => "no_device",
            Self::DeviceInUse => "device_in_use",
            Self::Unsupported => "media_unsupported",
        }
    }
}

/// Errors from the Codec Selector (C1).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("no supported container/codec descriptor was found, including the runtime default")]
    UnsupportedCodec,
}

impl ErrorCode for CodecError {
    fn code(&self) -> &'static str {
        "unsupported_codec"
    }
}

/// Errors from the Chunked Recorder (C3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderDriverError {
    #[error("underlying media recorder reported an error: {0}")]
    DeviceDropped(String),

    /// The upload manager's in-flight set stayed full across two chunk
    /// boundaries - see spec §5, "Backpressure".
    #[error("chunk backpressure overflow: uploader could not keep up")]
    BackpressureOverflow,
}

impl ErrorCode for RecorderDriverError {
    fn code(&self) -> &'static str {
        match self {
            Self::DeviceDropped(_) => "device_dropped",
            Self::BackpressureOverflow => "backpressure_overflow",
        }
    }
}

/// Errors from the Upload Manager (C4).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// A single attempt failed but retries remain; never surfaced past C4.
    #[error("chunk {index} upload attempt failed: {reason}")]
    Transient { index: u64, reason: String },

    /// The retry budget for a chunk was exhausted.
    #[error("chunk {index} upload failed after exhausting retries: {reason}")]
    Fatal { index: u64, reason: String },
}

impl UploadError {
    #[must_use]
    pub fn index(&self) -> u64 {
        match self {
            Self::Transient { index, .. } | Self::Fatal { index, .. } => *index,
        }
    }
}

impl ErrorCode for UploadError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "upload_transient",
            Self::Fatal { .. } => "upload_fatal",
        }
    }
}

/// Errors from the Session Client (C5) and Session Watcher (C6).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session document does not exist")]
    NotFound,

    #[error("session has expired")]
    Expired,

    #[error("session has already been recorded")]
    AlreadyRecorded,

    #[error("session prompt was removed")]
    Removed,

    #[error("session identifier does not match the document's identity fields")]
    IdentityMismatch,

    #[error("session is not in a recordable state")]
    NotRecordable,

    /// A conditional transition's pre-image check failed - another tab (or a
    /// previous attempt) already moved the remote status. See spec §4.5/§4.8.
    #[error("conditional transition lost the race: remote status was not {expected}")]
    ConcurrentTransition { expected: String },

    #[error("transport error talking to the session document store: {0}")]
    Transport(String),
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "session_not_found",
            Self::Expired => "session_expired",
            Self::AlreadyRecorded => "session_already_recorded",
            Self::Removed => "session_removed",
            Self::IdentityMismatch => "session_identity_mismatch",
            Self::NotRecordable => "session_not_recordable",
            Self::ConcurrentTransition { .. } => "concurrent_transition",
            Self::Transport(_) => "session_transport_error",
        }
    }
}

/// Aggregate error type for the recording engine. The controller (C8) is the
/// only component that converts one of these into a terminal UI state and an
/// `error` write on the session document (spec §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Driver(#[from] RecorderDriverError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ErrorCode for RecorderError {
    fn code(&self) -> &'static str {
        match self {
            Self::Link(e) => e.code(),
            Self::Media(e) => e.code(),
            Self::Codec(e) => e.code(),
            Self::Driver(e) => e.code(),
            Self::Upload(e) => e.code(),
            Self::Session(e) => e.code(),
        }
    }
}

impl RecorderError {
    /// Whether this error is fatal (drives the controller to `failed`) as
    /// opposed to recoverable-locally or reported-but-non-fatal. See spec
    /// §4.8 "Failure classification".
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Link(_) => true,
            Self::Codec(_) => true,
            Self::Driver(RecorderDriverError::BackpressureOverflow) => true,
            Self::Driver(RecorderDriverError::DeviceDropped(_)) => true,
            Self::Upload(UploadError::Fatal { .. }) => true,
            Self::Upload(UploadError::Transient { .. }) => false,
            Self::Session(SessionError::NotFound | SessionError::Expired | SessionError::Removed) => {
                true
            }
            Self::Session(_) => false,
            Self::Media(_) => false,
        }
    }
}

/// Convenient Result alias for core operations.
pub type RecorderResult<T> = Result<T, RecorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_fatal_is_fatal() {
        let err = RecorderError::from(UploadError::Fatal {
            index: 3,
            reason: "network down".into(),
        });
        assert!(err.is_fatal());
        assert_eq!(err.code(), "upload_fatal");
    }

    #[test]
    fn upload_transient_is_not_fatal() {
        let err = RecorderError::from(UploadError::Transient {
            index: 1,
            reason: "timeout".into(),
        });
        assert!(!err.is_fatal());
    }

    #[test]
    fn concurrent_transition_is_not_fatal_on_its_own() {
        let err = RecorderError::from(SessionError::ConcurrentTransition {
            expected: "recording".into(),
        });
        assert!(!err.is_fatal());
        assert_eq!(err.code(), "concurrent_transition");
    }
}
