//! Core data model (spec §3).
//!
//! `SessionId` parsing lives in [`crate::link`]; everything else that
//! describes the shape of a session, a chunk, or the controller's local
//! runtime state lives here.

use serde::{Deserialize, Serialize};

/// The opaque, five-segment session identifier minted externally and only
/// ever consumed by the core (spec §3, "SessionId").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    pub random_prefix: String,
    pub prompt_id: String,
    pub user_id: String,
    pub storyteller_id: String,
    pub unix_seconds: i64,
}

impl SessionId {
    /// Re-joins the five segments into the opaque wire form.
    #[must_use]
    pub fn as_opaque_string(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.random_prefix, self.prompt_id, self.user_id, self.storyteller_id, self.unix_seconds
        )
    }
}

/// `status` values a session document may hold (spec §3, "lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Pending,
    Active,
    Recording,
    Uploading,
    Processing,
    Completed,
    Failed,
    Expired,
    Removed,
}

impl SessionStatus {
    /// Recordable states per spec §4.5 `validate`.
    #[must_use]
    pub fn is_recordable(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Whether this status is terminal from the core's perspective - it
    /// will never legally transition again (spec §4.8).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Expired | Self::Removed
        )
    }
}

/// Recording-progress sub-document (spec §3, "progress").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_count: Option<u64>,
    pub upload_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_uploaded: Option<u64>,
}

/// Derived object-store paths recorded on the session (spec §3,
/// "ChunkObjectPath"/"FinalObjectPath").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_video: Option<String>,
}

/// The session document's error sub-document (spec §3, "error").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionErrorRecord {
    pub code: String,
    pub message: String,
    pub timestamp: u64,
    pub retryable: bool,
    pub retry_count: u32,
}

/// A session document as read from and written to the remote store
/// (spec §3, "Session").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub prompt_id: String,
    pub storyteller_id: String,

    pub prompt_text: String,
    pub storyteller_name: String,
    pub couple_names: String,

    pub max_duration_seconds: u32,
    pub allow_audio: bool,
    pub allow_video: bool,

    pub status: SessionStatus,
    pub created_at: u64,
    pub expires_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_completed_at: Option<u64>,

    #[serde(default)]
    pub recording_data: RecordingData,
    #[serde(default)]
    pub storage_paths: StoragePaths,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionErrorRecord>,
}

impl Session {
    /// Checks the identity fields embedded in `sessionId` against this
    /// document's own identity fields (spec §4.5 `validate`,
    /// "`sessionId`'s embedded `userId`/`promptId` match the document").
    #[must_use]
    pub fn identity_matches(&self, id: &crate::model::SessionId) -> bool {
        self.user_id == id.user_id && self.prompt_id == id.prompt_id
    }
}

/// Recording mode selected by the user before `countdown` (spec §6,
/// "mutually exclusive per attempt").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Upload lifecycle of a single in-process chunk (spec §3, "Chunk").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Queued,
    Uploading,
    Succeeded,
    Failed { retries_left: u32 },
}

/// A short, independently-uploaded slice of a recording (spec §3, "Chunk").
///
/// Owned exclusively by the Upload Manager once enqueued; the Chunked
/// Recorder must drop its own reference immediately on enqueue.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: u64,
    pub data: bytes::Bytes,
    pub mime_type: String,
    pub byte_size: u64,
    pub capture_timestamp: u64,
    pub upload_state: UploadState,
}

impl Chunk {
    #[must_use]
    pub fn new(index: u64, data: bytes::Bytes, mime_type: String, capture_timestamp: u64) -> Self {
        let byte_size = data.len() as u64;
        Self {
            index,
            data,
            mime_type,
            byte_size,
            capture_timestamp,
            upload_state: UploadState::Queued,
        }
    }
}

/// The controller's local, eager view of the recording state machine
/// (spec §4.8, §9 "Session state leading the document"). Mirrors but may
/// lead `SessionStatus` by at most one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Loading,
    Prompt,
    Preparing,
    Countdown,
    Recording,
    Paused,
    Reviewing,
    Uploading,
    Processing,
    Completed,
    Failed,
    Error,
}

impl Phase {
    /// Whether this phase is terminal from the controller's perspective
    /// (spec §4.8: "`failed` ... is terminal from the core's perspective").
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }
}

/// Why a chunk cadence/duration computation paused (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseCause {
    User,
    Visibility,
}

/// In-process controller runtime state (spec §3, "RecorderRuntimeState").
///
/// Deliberately excludes live handles (`mediaStream`, `recorder`) - those
/// are owned by `recorder-capture`'s platform adapters, not by this
/// portable struct; the controller holds them separately behind trait
/// objects so this type stays `Clone`-able for snapshotting across await
/// points (spec §5: "no suspension point may observe or publish
/// `RecorderRuntimeState` without first copying the fields it needs").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderRuntimeState {
    pub phase: Phase,
    pub chunk_index: u64,
    pub elapsed_ms: u64,
    pub paused_accumulated_ms: u64,
    pub last_pause_at_ms: Option<u64>,
    pub terminal: bool,
}

impl RecorderRuntimeState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            chunk_index: 0,
            elapsed_ms: 0,
            paused_accumulated_ms: 0,
            last_pause_at_ms: None,
            terminal: false,
        }
    }
}

impl Default for RecorderRuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_recordable_states() {
        assert!(SessionStatus::Pending.is_recordable());
        assert!(SessionStatus::Active.is_recordable());
        assert!(!SessionStatus::Recording.is_recordable());
        assert!(!SessionStatus::Completed.is_recordable());
    }

    #[test]
    fn phase_terminal_set_matches_spec() {
        assert!(Phase::Completed.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(Phase::Error.is_terminal());
        assert!(!Phase::Reviewing.is_terminal());
        assert!(!Phase::Uploading.is_terminal());
    }

    #[test]
    fn session_id_round_trips_through_opaque_string() {
        let id = SessionId {
            random_prefix: "abc123".into(),
            prompt_id: "prompt1".into(),
            user_id: "user1".into(),
            storyteller_id: "teller1".into(),
            unix_seconds: 1_700_000_000,
        };
        assert_eq!(id.as_opaque_string(), "abc123-prompt1-user1-teller1-1700000000");
    }
}
