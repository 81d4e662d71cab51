//! In-memory fakes for the trait-based collaborators, shared across this
//! crate's test modules. Grounded on `thaumic-core::sonos::test_fixtures`
//! (shared fixtures reused by multiple test modules) and
//! `thaumic-core::sonos::traits` (the trait-based DI that makes fakes like
//! these possible in the first place).

use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{SessionError, UploadError};
use crate::model::{Chunk, Session, SessionId, SessionStatus};
use crate::session::{DocumentStore, TransitionPatch};
use crate::upload::ObjectStore;
use crate::watcher::{SessionSubscription, WatchEvent};

/// In-memory `DocumentStore` keyed by the opaque session id string.
/// Pre-seed with [`Self::seed`] before exercising `load`/`validate` paths;
/// an empty store makes every `load` return `SessionError::NotFound`,
/// which is itself a useful fixture for error-path tests.
pub struct InMemoryDocumentStore {
    sessions: RefCell<HashMap<String, Session>>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RefCell::new(HashMap::new()),
        }
    }

    pub fn seed(&self, session: Session) {
        self.sessions
            .borrow_mut()
            .insert(session.session_id.clone(), session);
    }

    #[must_use]
    pub fn snapshot(&self, session_id: &str) -> Option<Session> {
        self.sessions.borrow().get(session_id).cloned()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        self.sessions
            .borrow()
            .get(&session_id.as_opaque_string())
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    async fn transition(
        &self,
        session_id: &SessionId,
        from_expected: SessionStatus,
        to: SessionStatus,
        patch: TransitionPatch,
    ) -> Result<(), SessionError> {
        let key = session_id.as_opaque_string();
        let mut sessions = self.sessions.borrow_mut();
        let session = sessions.get_mut(&key).ok_or(SessionError::NotFound)?;
        if session.status != from_expected {
            return Err(SessionError::ConcurrentTransition {
                expected: format!("{from_expected:?}"),
            });
        }
        session.status = to;
        if let Some(v) = patch.recording_started_at {
            session.recording_started_at = Some(v);
        }
        if let Some(v) = patch.recording_completed_at {
            session.recording_completed_at = Some(v);
        }
        if let Some(v) = patch.chunks_folder {
            session.storage_paths.chunks_folder = Some(v);
        }
        if let Some(v) = patch.upload_progress {
            session.recording_data.upload_progress = v;
        }
        if let Some(v) = patch.last_chunk_uploaded {
            session.recording_data.last_chunk_uploaded = Some(v);
        }
        if let Some(v) = patch.duration {
            session.recording_data.duration = Some(v);
        }
        if let Some(v) = patch.file_size {
            session.recording_data.file_size = Some(v);
        }
        if let Some(v) = patch.mime_type {
            session.recording_data.mime_type = Some(v);
        }
        if let Some(v) = patch.chunks_count {
            session.recording_data.chunks_count = Some(v);
        }
        Ok(())
    }

    async fn report_progress(
        &self,
        session_id: &SessionId,
        upload_progress: u8,
        last_chunk_uploaded: u64,
    ) -> Result<(), SessionError> {
        let key = session_id.as_opaque_string();
        let mut sessions = self.sessions.borrow_mut();
        let session = sessions.get_mut(&key).ok_or(SessionError::NotFound)?;
        session.recording_data.upload_progress = upload_progress;
        session.recording_data.last_chunk_uploaded = Some(last_chunk_uploaded);
        Ok(())
    }

    async fn report_error(
        &self,
        session_id: &SessionId,
        code: &str,
        message: &str,
        retryable: bool,
    ) -> Result<(), SessionError> {
        let key = session_id.as_opaque_string();
        let mut sessions = self.sessions.borrow_mut();
        let session = sessions.get_mut(&key).ok_or(SessionError::NotFound)?;
        session.status = SessionStatus::Failed;
        session.error = Some(crate::model::SessionErrorRecord {
            code: code.to_string(),
            message: message.to_string(),
            timestamp: 0,
            retryable,
            retry_count: 0,
        });
        Ok(())
    }
}

/// In-memory `ObjectStore`, recording every chunk written so tests can
/// assert on exactly which indices landed (spec §8 invariant 1).
pub struct InMemoryObjectStore {
    pub written: RefCell<Vec<(String, u64)>>,
    pub fail_indices: RefCell<HashMap<u64, u32>>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            written: RefCell::new(Vec::new()),
            fail_indices: RefCell::new(HashMap::new()),
        }
    }

    /// Makes uploads of `index` fail transiently `times` times before
    /// succeeding, for exercising the retry path (spec §8 scenario 4).
    pub fn fail_next(&self, index: u64, times: u32) {
        self.fail_indices.borrow_mut().insert(index, times);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl ObjectStore for InMemoryObjectStore {
    async fn put_chunk(
        &self,
        user_id: &str,
        session_id: &str,
        chunk: &Chunk,
        extension: &str,
        _total_expected: Option<u64>,
    ) -> Result<(), UploadError> {
        let mut remaining = self.fail_indices.borrow_mut();
        if let Some(count) = remaining.get_mut(&chunk.index) {
            if *count > 0 {
                *count -= 1;
                return Err(UploadError::Transient {
                    index: chunk.index,
                    reason: "simulated transient failure".into(),
                });
            }
        }
        let path = format!("users/{user_id}/recordings/{session_id}/chunks/chunk_{}.{extension}", chunk.index);
        self.written.borrow_mut().push((path, chunk.index));
        Ok(())
    }
}

/// `SessionSubscription` fake that yields a scripted, pre-loaded sequence
/// of events from `futures::stream::iter`.
pub struct ScriptedSubscription {
    events: Vec<Result<WatchEvent, SessionError>>,
}

impl ScriptedSubscription {
    #[must_use]
    pub fn new(events: Vec<Result<WatchEvent, SessionError>>) -> Self {
        Self { events }
    }
}

#[async_trait(?Send)]
impl SessionSubscription for ScriptedSubscription {
    type Stream = futures::stream::Iter<std::vec::IntoIter<Result<WatchEvent, SessionError>>>;

    async fn watch(&self, _session_id: &SessionId) -> Result<Self::Stream, SessionError> {
        Ok(futures::stream::iter(self.events.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sample_id() -> SessionId {
        SessionId {
            random_prefix: "abc".into(),
            prompt_id: "prompt1".into(),
            user_id: "user1".into(),
            storyteller_id: "teller1".into(),
            unix_seconds: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn in_memory_document_store_enforces_conditional_transition() {
        let store = InMemoryDocumentStore::new();
        let id = sample_id();
        store.seed(Session {
            session_id: id.as_opaque_string(),
            user_id: "user1".into(),
            prompt_id: "prompt1".into(),
            storyteller_id: "teller1".into(),
            prompt_text: String::new(),
            storyteller_name: String::new(),
            couple_names: String::new(),
            max_duration_seconds: 900,
            allow_audio: true,
            allow_video: true,
            status: SessionStatus::Pending,
            created_at: 0,
            expires_at: 1_000_000_000,
            recording_started_at: None,
            recording_completed_at: None,
            recording_data: Default::default(),
            storage_paths: Default::default(),
            error: None,
        });

        store
            .transition(&id, SessionStatus::Pending, SessionStatus::Recording, TransitionPatch::default())
            .await
            .unwrap();

        let err = store
            .transition(&id, SessionStatus::Pending, SessionStatus::Recording, TransitionPatch::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::ConcurrentTransition {
                expected: "Pending".into()
            }
        );
    }

    #[tokio::test]
    async fn in_memory_object_store_records_chunk_paths() {
        let store = InMemoryObjectStore::new();
        let chunk = Chunk::new(0, vec![1, 2, 3].into(), "audio/webm".into(), 0);
        store
            .put_chunk("user1", "sess1", &chunk, "webm", Some(1))
            .await
            .unwrap();
        assert_eq!(store.written.borrow().len(), 1);
        assert_eq!(
            store.written.borrow()[0].0,
            "users/user1/recordings/sess1/chunks/chunk_0.webm"
        );
    }

    #[tokio::test]
    async fn scripted_subscription_yields_events_in_order() {
        let sub = ScriptedSubscription::new(vec![Ok(WatchEvent::SessionRemoved)]);
        let mut stream = sub.watch(&sample_id()).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, WatchEvent::SessionRemoved);
    }
}
