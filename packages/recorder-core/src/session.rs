//! Session Client (C5, spec §4.5).
//!
//! `DocumentStore` is this crate's analogue of
//! `thaumic-core::services::playback_session_store`'s trait-backed access
//! to shared state: both mediate all reads/writes to a single externally
//! durable record and make conditional updates the seam where races are
//! resolved, rather than a client-side lock.

use async_trait::async_trait;

use crate::error::SessionError;
use crate::model::{Session, SessionId, SessionStatus};

/// A patch applied atomically alongside a conditional status transition
/// (spec §4.5 `transition`). Only the fields named in spec §6 "Session
/// document contract (writes)" may ever be set here; nothing else is a
/// legal write for the core to make.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPatch {
    pub recording_started_at: Option<u64>,
    pub recording_completed_at: Option<u64>,
    pub chunks_folder: Option<String>,
    pub upload_progress: Option<u8>,
    pub last_chunk_uploaded: Option<u64>,
    pub duration: Option<u64>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub chunks_count: Option<u64>,
}

/// Platform contract for the external session document store. Implemented
/// in `apps/web/src-wasm::http_store` via `reqwest` against the external
/// platform's document-store REST facade.
#[async_trait(?Send)]
pub trait DocumentStore {
    /// Fetches the session document exactly once (spec §4.5 `load`).
    async fn load(&self, session_id: &SessionId) -> Result<Session, SessionError>;

    /// Applies `patch` and moves `status` to `to`, but only if the remote
    /// document's current status equals `from_expected` (spec §4.5
    /// `transition`). Fails with `ConcurrentTransition` - never retried
    /// blindly - if the pre-image does not match.
    async fn transition(
        &self,
        session_id: &SessionId,
        from_expected: SessionStatus,
        to: SessionStatus,
        patch: TransitionPatch,
    ) -> Result<(), SessionError>;

    /// Throttled progress write with no conditional check, since progress
    /// is monotonic by construction (spec §4.5 `reportProgress`).
    async fn report_progress(
        &self,
        session_id: &SessionId,
        upload_progress: u8,
        last_chunk_uploaded: u64,
    ) -> Result<(), SessionError>;

    /// Writes the error sub-document and moves status to `failed` (spec
    /// §4.5 `reportError`).
    async fn report_error(
        &self,
        session_id: &SessionId,
        code: &str,
        message: &str,
        retryable: bool,
    ) -> Result<(), SessionError>;
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    Expired,
    NotRecordable(SessionStatus),
    IdentityMismatch,
}

/// Checks the loaded document against the four conditions in spec §4.5
/// `validate` (existence is the caller's concern - this takes an already
/// loaded `Session`): not expired, in a recordable status, and identity
/// fields matching the parsed link.
pub fn validate(session: &Session, id: &SessionId, now_unix_seconds: u64) -> Result<(), ValidationFailure> {
    if now_unix_seconds > session.expires_at {
        return Err(ValidationFailure::Expired);
    }
    if !session.status.is_recordable() {
        return Err(ValidationFailure::NotRecordable(session.status));
    }
    if !session.identity_matches(id) {
        return Err(ValidationFailure::IdentityMismatch);
    }
    Ok(())
}

/// Thin wrapper pairing a [`DocumentStore`] with the pure [`validate`]
/// policy, so C8 has a single call surface for "load and check this
/// session is usable."
pub struct SessionClient<S> {
    store: S,
}

impl<S: DocumentStore> SessionClient<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load_and_validate(
        &self,
        id: &SessionId,
        now_unix_seconds: u64,
    ) -> Result<Session, SessionError> {
        let session = self.store.load(id).await?;
        match validate(&session, id, now_unix_seconds) {
            Ok(()) => Ok(session),
            Err(ValidationFailure::Expired) => Err(SessionError::Expired),
            Err(ValidationFailure::IdentityMismatch) => Err(SessionError::IdentityMismatch),
            Err(ValidationFailure::NotRecordable(SessionStatus::Completed)) => {
                Err(SessionError::AlreadyRecorded)
            }
            Err(ValidationFailure::NotRecordable(SessionStatus::Removed)) => {
                Err(SessionError::Removed)
            }
            Err(ValidationFailure::NotRecordable(_)) => Err(SessionError::NotRecordable),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id() -> SessionId {
        SessionId {
            random_prefix: "abc".into(),
            prompt_id: "prompt1".into(),
            user_id: "user1".into(),
            storyteller_id: "teller1".into(),
            unix_seconds: 1_700_000_000,
        }
    }

    fn sample_session(status: SessionStatus) -> Session {
        Session {
            session_id: "abc-prompt1-user1-teller1-1700000000".into(),
            user_id: "user1".into(),
            prompt_id: "prompt1".into(),
            storyteller_id: "teller1".into(),
            prompt_text: "Tell us a story".into(),
            storyteller_name: "Grandma".into(),
            couple_names: "A & B".into(),
            max_duration_seconds: 900,
            allow_audio: true,
            allow_video: true,
            status,
            created_at: 1_700_000_000,
            expires_at: 1_800_000_000,
            recording_started_at: None,
            recording_completed_at: None,
            recording_data: Default::default(),
            storage_paths: Default::default(),
            error: None,
        }
    }

    #[test]
    fn validate_accepts_pending_session_within_expiry() {
        let session = sample_session(SessionStatus::Pending);
        let id = sample_id();
        assert!(validate(&session, &id, 1_700_000_100).is_ok());
    }

    #[test]
    fn validate_rejects_expired_session() {
        let session = sample_session(SessionStatus::Pending);
        let id = sample_id();
        assert_eq!(
            validate(&session, &id, 1_900_000_000),
            Err(ValidationFailure::Expired)
        );
    }

    #[test]
    fn validate_rejects_non_recordable_status() {
        let session = sample_session(SessionStatus::Completed);
        let id = sample_id();
        assert_eq!(
            validate(&session, &id, 1_700_000_100),
            Err(ValidationFailure::NotRecordable(SessionStatus::Completed))
        );
    }

    #[test]
    fn validate_rejects_identity_mismatch() {
        let session = sample_session(SessionStatus::Pending);
        let mut id = sample_id();
        id.user_id = "someone-else".into();
        assert_eq!(
            validate(&session, &id, 1_700_000_100),
            Err(ValidationFailure::IdentityMismatch)
        );
    }
}
