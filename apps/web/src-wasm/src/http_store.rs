//! HTTP-backed `DocumentStore`/`ObjectStore`/`SessionSubscription`.
//!
//! Reaches the external platform's session-document and object-store REST
//! facades via `reqwest`, which targets `web_sys` fetch automatically under
//! `wasm32`. Endpoint shapes are this adapter's own convention (the spec
//! treats the external platform as an opaque collaborator, §1/§6) -
//! documented as an open question resolution in the workspace root
//! `DESIGN.md`.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use recorder_core::error::{SessionError, UploadError};
use recorder_core::model::{Chunk, Session, SessionId, SessionStatus};
use recorder_core::session::{DocumentStore, TransitionPatch};
use recorder_core::upload::ObjectStore;
use recorder_core::watcher::{SessionSubscription, WatchEvent};
use serde::Serialize;

/// Base URL of the external platform's API (e.g.
/// `https://api.example.com`). Constructed once at wasm module init from a
/// value the host page passes in (see `bootstrap::init`).
#[derive(Clone)]
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn session_url(&self, session_id: &SessionId) -> String {
        format!("{}/sessions/{}", self.base_url, session_id.as_opaque_string())
    }
}

#[derive(Serialize)]
struct TransitionBody<'a> {
    from_expected: &'a str,
    to: &'a str,
    #[serde(flatten)]
    patch: PatchBody,
}

#[derive(Serialize, Default)]
struct PatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_completed_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upload_progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_chunk_uploaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks_count: Option<u64>,
}

impl From<TransitionPatch> for PatchBody {
    fn from(p: TransitionPatch) -> Self {
        Self {
            recording_started_at: p.recording_started_at,
            recording_completed_at: p.recording_completed_at,
            chunks_folder: p.chunks_folder,
            upload_progress: p.upload_progress,
            last_chunk_uploaded: p.last_chunk_uploaded,
            duration: p.duration,
            file_size: p.file_size,
            mime_type: p.mime_type,
            chunks_count: p.chunks_count,
        }
    }
}

fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Pending => "pending",
        SessionStatus::Active => "active",
        SessionStatus::Recording => "recording",
        SessionStatus::Uploading => "uploading",
        SessionStatus::Processing => "processing",
        SessionStatus::Completed => "completed",
        SessionStatus::Failed => "failed",
        SessionStatus::Expired => "expired",
        SessionStatus::Removed => "removed",
    }
}

fn transport_err(err: reqwest::Error) -> SessionError {
    SessionError::Transport(err.to_string())
}

#[async_trait(?Send)]
impl DocumentStore for HttpApiClient {
    async fn load(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        let response = self
            .client
            .get(self.session_url(session_id))
            .send()
            .await
            .map_err(transport_err)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SessionError::NotFound);
        }
        if !response.status().is_success() {
            return Err(SessionError::Transport(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response.json::<Session>().await.map_err(transport_err)
    }

    async fn transition(
        &self,
        session_id: &SessionId,
        from_expected: SessionStatus,
        to: SessionStatus,
        patch: TransitionPatch,
    ) -> Result<(), SessionError> {
        let body = TransitionBody {
            from_expected: status_label(from_expected),
            to: status_label(to),
            patch: patch.into(),
        };

        let response = self
            .client
            .patch(format!("{}/status", self.session_url(session_id)))
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(SessionError::ConcurrentTransition {
                expected: status_label(from_expected).to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(SessionError::Transport(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn report_progress(
        &self,
        session_id: &SessionId,
        upload_progress: u8,
        last_chunk_uploaded: u64,
    ) -> Result<(), SessionError> {
        let body = PatchBody {
            upload_progress: Some(upload_progress),
            last_chunk_uploaded: Some(last_chunk_uploaded),
            ..Default::default()
        };
        self.client
            .patch(format!("{}/progress", self.session_url(session_id)))
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;
        Ok(())
    }

    async fn report_error(
        &self,
        session_id: &SessionId,
        code: &str,
        message: &str,
        retryable: bool,
    ) -> Result<(), SessionError> {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            code: &'a str,
            message: &'a str,
            retryable: bool,
        }
        self.client
            .patch(format!("{}/error", self.session_url(session_id)))
            .json(&ErrorBody {
                code,
                message,
                retryable,
            })
            .send()
            .await
            .map_err(transport_err)?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl ObjectStore for HttpApiClient {
    async fn put_chunk(
        &self,
        user_id: &str,
        session_id: &str,
        chunk: &Chunk,
        extension: &str,
        total_expected: Option<u64>,
    ) -> Result<(), UploadError> {
        let path = format!(
            "users/{user_id}/recordings/{session_id}/chunks/chunk_{}.{extension}",
            chunk.index
        );

        let response = self
            .client
            .put(format!("{}/objects/{}", self.base_url, path))
            .header("content-type", chunk.mime_type.clone())
            .header("x-session-id", session_id.to_string())
            .header("x-chunk-index", chunk.index.to_string())
            .header(
                "x-total-expected",
                total_expected.map(|v| v.to_string()).unwrap_or_default(),
            )
            .body(chunk.data.clone())
            .send()
            .await
            .map_err(|e| UploadError::Transient {
                index: chunk.index,
                reason: e.to_string(),
            })?;

        if response.status().is_server_error() || response.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(UploadError::Transient {
                index: chunk.index,
                reason: format!("server returned {}", response.status()),
            });
        }
        if !response.status().is_success() {
            return Err(UploadError::Fatal {
                index: chunk.index,
                reason: format!("server rejected upload: {}", response.status()),
            });
        }
        Ok(())
    }
}

/// Polls [`DocumentStore::load`] on a fixed interval and diffs the status
/// against the last-observed value to synthesize [`WatchEvent`]s, since the
/// external platform's realtime primitive is not specified (spec §1 treats
/// it as an opaque external collaborator). `gloo_timers` provides the
/// delay between polls, consistent with the rest of the wasm target using
/// no OS reactor.
#[async_trait(?Send)]
impl SessionSubscription for HttpApiClient {
    type Stream = std::pin::Pin<Box<dyn Stream<Item = Result<WatchEvent, SessionError>>>>;

    async fn watch(&self, session_id: &SessionId) -> Result<Self::Stream, SessionError> {
        let client = self.clone();
        let id = session_id.clone();
        let poll_interval = Duration::from_secs(5);

        let s = stream::unfold((client, id, None::<SessionStatus>), move |state| {
            let poll_interval = poll_interval;
            async move {
                let (client, id, mut last_status) = state;
                loop {
                    gloo_timers::future::TimeoutFuture::new(poll_interval.as_millis() as u32).await;

                    match client.load(&id).await {
                        Ok(session) => {
                            let now_seconds = (js_sys::Date::now() / 1000.0) as u64;
                            if now_seconds > session.expires_at {
                                return Some((Ok(WatchEvent::SessionExpired), (client, id, last_status)));
                            }
                            if last_status == Some(session.status) {
                                continue;
                            }
                            last_status = Some(session.status);
                            let event = WatchEvent::StatusExternalChange(session.status);
                            return Some((Ok(event), (client, id, last_status)));
                        }
                        Err(SessionError::NotFound) => {
                            return Some((Ok(WatchEvent::SessionRemoved), (client, id, last_status)));
                        }
                        Err(err) => return Some((Err(err), (client, id, last_status))),
                    }
                }
            }
        });

        Ok(Box::pin(s))
    }
}
