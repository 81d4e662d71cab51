//! Recording Controller (C8, spec §4.8).
//!
//! The top-level coordinator: owns [`Phase`], wires C1-C7 together, and is
//! the only component allowed to turn an error into a terminal UI state and
//! an `error` write on the session document (spec §7 "Propagation
//! policy"). Modeled on how `thaumic-core`'s services hold `Arc<dyn
//! EventEmitter>`/`Arc<dyn Lifecycle>` collaborators and drive a state
//! machine through them rather than reaching into platform APIs directly.

use std::rc::Rc;

use crate::config::RecorderConfig;
use crate::error::{RecorderError, SessionError};
use crate::events::{ControllerEvent, EventEmitter};
use crate::model::{Phase, SessionId, SessionStatus};
use crate::session::{DocumentStore, SessionClient, TransitionPatch};
use crate::watcher::{requires_abort, WatchEvent};

/// Whether moving from `from` to `to` is a legal phase transition, per the
/// graph in spec §4.8. Kept as a pure function so the rule set itself is
/// unit-testable independent of any controller instance.
#[must_use]
pub fn is_legal_transition(from: Phase, to: Phase) -> bool {
    use Phase::*;
    if from.is_terminal() {
        return false;
    }
    match (from, to) {
        (Loading, Prompt) | (Loading, Error) => true,
        (Prompt, Preparing) | (Prompt, Error) => true,
        (Preparing, Countdown) | (Preparing, Failed) => true,
        (Countdown, Recording) => true,
        (Recording, Paused) | (Paused, Recording) => true,
        (Recording, Reviewing) => true,
        (Reviewing, Preparing) | (Reviewing, Uploading) => true,
        (Uploading, Processing) => true,
        (Processing, Completed) => true,
        // Any non-terminal phase may fail (spec: "Any state may go to
        // `failed` on a fatal upload or device error").
        (_, Failed) => true,
        _ => false,
    }
}

/// Maps [`Phase`] to the remote [`SessionStatus`] it mirrors, for building
/// conditional-transition patches. `Loading`/`Prompt`/`Countdown`/`Error`
/// have no remote counterpart - they are purely local, pre-`active`
/// states - so this returns `None` for them.
#[must_use]
pub fn mirrored_status(phase: Phase) -> Option<SessionStatus> {
    match phase {
        Phase::Preparing => Some(SessionStatus::Active),
        Phase::Recording | Phase::Paused => Some(SessionStatus::Recording),
        Phase::Reviewing => Some(SessionStatus::Recording),
        Phase::Uploading => Some(SessionStatus::Uploading),
        Phase::Processing => Some(SessionStatus::Processing),
        Phase::Completed => Some(SessionStatus::Completed),
        Phase::Failed => Some(SessionStatus::Failed),
        Phase::Loading | Phase::Prompt | Phase::Countdown | Phase::Error => None,
    }
}

/// Owns the controller's local phase and the loaded session, and mediates
/// every remote write through conditional transitions. Generic over the
/// document store so tests substitute an in-memory fake
/// ([`crate::test_support`]) for the real HTTP-backed one.
pub struct RecordingController<S> {
    phase: Phase,
    id: SessionId,
    session_status: SessionStatus,
    config: RecorderConfig,
    client: SessionClient<S>,
    emitter: Rc<dyn EventEmitter>,
}

impl<S: DocumentStore> RecordingController<S> {
    #[must_use]
    pub fn new(
        id: SessionId,
        config: RecorderConfig,
        store: S,
        emitter: Rc<dyn EventEmitter>,
    ) -> Self {
        Self {
            phase: Phase::Loading,
            id,
            session_status: SessionStatus::Pending,
            config,
            client: SessionClient::new(store),
            emitter,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    fn set_phase(&mut self, to: Phase, now_millis: u64) -> bool {
        if !is_legal_transition(self.phase, to) {
            return false;
        }
        self.phase = to;
        self.emitter.emit(ControllerEvent::PhaseChanged {
            phase: to,
            timestamp_ms: now_millis,
        });
        true
    }

    /// Loads and validates the session (spec §4.5), advancing to `prompt`
    /// on success or `error` on any failure - the terminal, non-retryable
    /// state for a bad link or unusable session (spec §7).
    pub async fn load(&mut self, now_unix_seconds: u64, now_millis: u64) -> Result<(), RecorderError> {
        match self.client.load_and_validate(&self.id, now_unix_seconds).await {
            Ok(session) => {
                self.session_status = session.status;
                self.set_phase(Phase::Prompt, now_millis);
                Ok(())
            }
            Err(err) => {
                self.set_phase(Phase::Error, now_millis);
                let recorder_err = RecorderError::from(err);
                self.emitter
                    .emit(ControllerEvent::terminal_from_error(Phase::Error, &recorder_err));
                Err(recorder_err)
            }
        }
    }

    /// Enters `preparing` after the user picks a mode (spec §4.8:
    /// "`preparing -> countdown` happens only after C1+C2 succeed"; this
    /// method is the entry into that phase, before C1/C2 run), publishing
    /// the `pending -> active` transition so the remote document's status
    /// leads the local `preparing` phase exactly as spec §4.5/C5 describes
    /// ("pending -> active -> recording -> uploading -> processing/failed").
    pub async fn begin_preparing(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let from_expected = self.session_status;
        let result = self
            .client
            .store()
            .transition(
                &self.id,
                from_expected,
                SessionStatus::Active,
                TransitionPatch::default(),
            )
            .await;

        if let Err(err) = result {
            return self.reconcile_transition_failure(err, now_millis).await;
        }

        self.session_status = SessionStatus::Active;
        self.set_phase(Phase::Preparing, now_millis);
        Ok(())
    }

    /// Attempts the conditional `active -> recording` transition that both
    /// claims the session for this tab and starts the countdown (spec §4.8,
    /// §8 scenario 6 "Two tabs, same link"). On `ConcurrentTransition`,
    /// reloads the document and reconciles to whatever state actually won
    /// the race instead of blindly failing (spec §7 "C8 reloads session and
    /// reconciles; if the remote state is terminal, follow it").
    pub async fn claim_and_start_countdown(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let from_expected = self.session_status;
        let result = self
            .client
            .store()
            .transition(
                &self.id,
                from_expected,
                SessionStatus::Recording,
                TransitionPatch {
                    recording_started_at: Some(now_millis),
                    ..Default::default()
                },
            )
            .await;

        if let Err(err) = result {
            return self.reconcile_transition_failure(err, now_millis).await;
        }

        self.session_status = SessionStatus::Recording;
        self.set_phase(Phase::Countdown, now_millis);
        Ok(())
    }

    /// Common handling for a failed conditional transition (spec §7: "C8
    /// reloads session and reconciles; if the remote state is terminal,
    /// follow it"; spec §8 scenario 6, the losing tab of a two-tab race).
    /// A `ConcurrentTransition` means another tab (or a previous attempt)
    /// already moved the remote status, so reload the document and adopt
    /// whatever state it actually landed in rather than assuming the worst;
    /// any other transport/not-found error goes straight to `failed`.
    async fn reconcile_transition_failure(
        &mut self,
        err: SessionError,
        now_millis: u64,
    ) -> Result<(), RecorderError> {
        if !matches!(err, SessionError::ConcurrentTransition { .. }) {
            self.set_phase(Phase::Failed, now_millis);
            return Err(RecorderError::from(err));
        }

        match self.client.store().load(&self.id).await {
            Ok(session) => {
                self.session_status = session.status;
                let (message, code) = match session.status {
                    SessionStatus::Completed => ("already recorded", "session_already_recorded"),
                    SessionStatus::Recording
                    | SessionStatus::Uploading
                    | SessionStatus::Processing => (
                        "recording in progress on another device",
                        "session_recording_elsewhere",
                    ),
                    _ => ("prompt removed by owner", "session_removed"),
                };
                self.set_phase(Phase::Failed, now_millis);
                self.emitter.emit(ControllerEvent::Terminal {
                    phase: Phase::Failed,
                    message,
                    error_code: Some(code),
                });
            }
            Err(load_err) => {
                self.set_phase(Phase::Failed, now_millis);
                return Err(RecorderError::from(load_err));
            }
        }
        Err(RecorderError::from(err))
    }

    /// Advances the countdown by one tick, emitting `CountdownTick` and
    /// transitioning to `recording` once it reaches zero (spec §4.8:
    /// "fixed-duration (3s default) and not user-interruptible").
    pub fn tick_countdown(&mut self, remaining_seconds: u32, now_millis: u64) {
        if remaining_seconds == 0 {
            self.set_phase(Phase::Recording, now_millis);
        } else {
            self.emitter
                .emit(ControllerEvent::CountdownTick { remaining_seconds });
        }
    }

    /// Explicit stop or automatic `duration-reached` (spec §4.8:
    /// "`recording -> reviewing` on explicit stop, or automatically on
    /// `duration-reached`").
    pub fn stop_to_reviewing(&mut self, now_millis: u64) -> bool {
        self.set_phase(Phase::Reviewing, now_millis)
    }

    /// `reviewing -> preparing`, "start over" (spec §4.8): the caller is
    /// responsible for (a) aborting the in-memory recorder and (b)
    /// clearing the upload manager's counter before calling this; this
    /// method performs (c), the conditional reset of session progress
    /// fields.
    pub async fn start_over(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let from_expected = self.session_status;
        self.client
            .store()
            .transition(
                &self.id,
                from_expected,
                SessionStatus::Active,
                TransitionPatch {
                    upload_progress: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(RecorderError::from)?;
        self.session_status = SessionStatus::Active;
        self.set_phase(Phase::Preparing, now_millis);
        Ok(())
    }

    /// `reviewing -> uploading`: conditional on `fromExpected = recording`
    /// (spec §4.8). The controller stops accepting new chunks at this
    /// point; the caller drains the upload manager's outstanding set
    /// before calling [`Self::finish_uploading`].
    pub async fn begin_uploading(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        self.client
            .store()
            .transition(
                &self.id,
                SessionStatus::Recording,
                SessionStatus::Uploading,
                TransitionPatch::default(),
            )
            .await
            .map_err(RecorderError::from)?;
        self.session_status = SessionStatus::Uploading;
        self.set_phase(Phase::Uploading, now_millis);
        Ok(())
    }

    /// `uploading -> processing`: conditional on `fromExpected =
    /// uploading` (spec §4.8), once the upload manager's outstanding set
    /// has fully drained.
    pub async fn finish_uploading(
        &mut self,
        chunks_count: u64,
        final_upload_progress: u8,
        mime_type: String,
        chunks_folder: String,
        now_millis: u64,
    ) -> Result<(), RecorderError> {
        self.client
            .store()
            .transition(
                &self.id,
                SessionStatus::Uploading,
                SessionStatus::Processing,
                TransitionPatch {
                    recording_completed_at: Some(now_millis),
                    chunks_count: Some(chunks_count),
                    upload_progress: Some(final_upload_progress),
                    last_chunk_uploaded: Some(chunks_count.saturating_sub(1)),
                    mime_type: Some(mime_type),
                    chunks_folder: Some(chunks_folder),
                    ..Default::default()
                },
            )
            .await
            .map_err(RecorderError::from)?;
        self.session_status = SessionStatus::Processing;
        self.set_phase(Phase::Processing, now_millis);
        self.set_phase(Phase::Completed, now_millis);
        Ok(())
    }

    /// Reacts to a fatal [`RecorderError`] from any collaborator (spec
    /// §4.8 "Failure classification", §7 "Propagation policy"): writes the
    /// error sub-document and moves to `failed`. Non-fatal errors must not
    /// be passed here - callers check [`RecorderError::is_fatal`] first.
    pub async fn fail(&mut self, err: &RecorderError, now_millis: u64) {
        debug_assert!(err.is_fatal(), "fail() called with a non-fatal error");
        use crate::error::ErrorCode;
        let _ = self
            .client
            .store()
            .report_error(&self.id, err.code(), &err.to_string(), false)
            .await;
        self.set_phase(Phase::Failed, now_millis);
        self.emitter
            .emit(ControllerEvent::terminal_from_error(Phase::Failed, err));
    }

    /// Reacts to a [`WatchEvent`] from C6. Per spec §4.6, `session-removed`
    /// / `session-expired` / an external `completed`-or-`removed` status
    /// change all abort any in-progress work; everything else is ignored
    /// (the watcher's `recording` observation on the losing tab of a
    /// two-tab race is handled by the caller, which should stop retrying
    /// its own `claim_and_start_countdown` attempt instead of calling this
    /// with every status change).
    pub fn handle_watch_event(&mut self, event: &WatchEvent, now_millis: u64) {
        if !requires_abort(event) {
            return;
        }
        let (message, code) = match event {
            WatchEvent::SessionRemoved => ("prompt removed by owner", "session_removed"),
            WatchEvent::SessionExpired => ("this recording link has expired", "session_expired"),
            WatchEvent::StatusExternalChange(SessionStatus::Completed) => {
                ("already recorded", "session_already_recorded")
            }
            WatchEvent::StatusExternalChange(_) => ("prompt removed by owner", "session_removed"),
        };
        self.set_phase(Phase::Failed, now_millis);
        self.emitter.emit(ControllerEvent::Terminal {
            phase: Phase::Failed,
            message,
            error_code: Some(code),
        });
    }

    /// Cascading abort (spec §5 "Cancellation semantics"): idempotent, so
    /// calling this on an already-terminal controller is a no-op.
    pub fn abort(&mut self, now_millis: u64) {
        if self.phase.is_terminal() {
            return;
        }
        self.set_phase(Phase::Failed, now_millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::events::NoopEventEmitter;
    use crate::test_support::InMemoryDocumentStore;

    fn sample_id() -> SessionId {
        SessionId {
            random_prefix: "abc".into(),
            prompt_id: "prompt1".into(),
            user_id: "user1".into(),
            storyteller_id: "teller1".into(),
            unix_seconds: 1_700_000_000,
        }
    }

    fn seeded_store(id: &SessionId, status: SessionStatus) -> InMemoryDocumentStore {
        let store = InMemoryDocumentStore::new();
        store.seed(crate::model::Session {
            session_id: id.as_opaque_string(),
            user_id: id.user_id.clone(),
            prompt_id: id.prompt_id.clone(),
            storyteller_id: id.storyteller_id.clone(),
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
        });
        store
    }

    #[test]
    fn legal_transition_graph_matches_spec() {
        assert!(is_legal_transition(Phase::Loading, Phase::Prompt));
        assert!(is_legal_transition(Phase::Preparing, Phase::Countdown));
        assert!(is_legal_transition(Phase::Countdown, Phase::Recording));
        assert!(is_legal_transition(Phase::Recording, Phase::Paused));
        assert!(is_legal_transition(Phase::Paused, Phase::Recording));
        assert!(is_legal_transition(Phase::Recording, Phase::Reviewing));
        assert!(is_legal_transition(Phase::Reviewing, Phase::Preparing));
        assert!(is_legal_transition(Phase::Reviewing, Phase::Uploading));
        assert!(is_legal_transition(Phase::Uploading, Phase::Processing));
        assert!(is_legal_transition(Phase::Processing, Phase::Completed));
    }

    #[test]
    fn any_nonterminal_phase_may_fail() {
        assert!(is_legal_transition(Phase::Countdown, Phase::Failed));
        assert!(is_legal_transition(Phase::Uploading, Phase::Failed));
    }

    #[test]
    fn terminal_phases_accept_no_further_transitions() {
        assert!(!is_legal_transition(Phase::Completed, Phase::Preparing));
        assert!(!is_legal_transition(Phase::Failed, Phase::Recording));
        assert!(!is_legal_transition(Phase::Error, Phase::Prompt));
    }

    #[test]
    fn illegal_skip_is_rejected() {
        assert!(!is_legal_transition(Phase::Loading, Phase::Recording));
        assert!(!is_legal_transition(Phase::Preparing, Phase::Uploading));
    }

    #[tokio::test]
    async fn abort_is_idempotent() {
        let id = sample_id();
        let store = seeded_store(&id, SessionStatus::Pending);
        let mut controller = RecordingController::new(
            id,
            RecorderConfig::default(),
            store,
            Rc::new(NoopEventEmitter),
        );
        controller.begin_preparing(0).await.unwrap();
        controller.abort(0);
        assert_eq!(controller.phase(), Phase::Failed);
        controller.abort(1);
        assert_eq!(controller.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn handle_watch_event_ignores_non_abort_events() {
        let id = sample_id();
        let store = seeded_store(&id, SessionStatus::Pending);
        let mut controller = RecordingController::new(
            id,
            RecorderConfig::default(),
            store,
            Rc::new(NoopEventEmitter),
        );
        controller.begin_preparing(0).await.unwrap();
        controller.handle_watch_event(
            &WatchEvent::StatusExternalChange(SessionStatus::Recording),
            0,
        );
        assert_eq!(controller.phase(), Phase::Preparing);
    }

    #[tokio::test]
    async fn handle_watch_event_aborts_on_removal() {
        let id = sample_id();
        let store = seeded_store(&id, SessionStatus::Pending);
        let mut controller = RecordingController::new(
            id,
            RecorderConfig::default(),
            store,
            Rc::new(NoopEventEmitter),
        );
        controller.begin_preparing(0).await.unwrap();
        controller.handle_watch_event(&WatchEvent::SessionRemoved, 0);
        assert_eq!(controller.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn begin_preparing_writes_active_status() {
        let id = sample_id();
        let store = seeded_store(&id, SessionStatus::Pending);
        let mut controller = RecordingController::new(
            id.clone(),
            RecorderConfig::default(),
            store,
            Rc::new(NoopEventEmitter),
        );
        controller.begin_preparing(0).await.unwrap();
        assert_eq!(controller.phase(), Phase::Preparing);
        assert_eq!(
            controller.client.store().snapshot(&id.as_opaque_string()).unwrap().status,
            SessionStatus::Active
        );
    }

    #[tokio::test]
    async fn claim_and_start_countdown_writes_recording_after_active() {
        let id = sample_id();
        let store = seeded_store(&id, SessionStatus::Pending);
        let mut controller = RecordingController::new(
            id.clone(),
            RecorderConfig::default(),
            store,
            Rc::new(NoopEventEmitter),
        );
        controller.begin_preparing(0).await.unwrap();
        controller.claim_and_start_countdown(10).await.unwrap();
        assert_eq!(controller.phase(), Phase::Countdown);
        assert_eq!(
            controller.client.store().snapshot(&id.as_opaque_string()).unwrap().status,
            SessionStatus::Recording
        );
    }

    #[tokio::test]
    async fn concurrent_transition_reconciles_to_remote_status_instead_of_blind_failure() {
        let id = sample_id();
        let store = seeded_store(&id, SessionStatus::Pending);
        let mut controller = RecordingController::new(
            id.clone(),
            RecorderConfig::default(),
            store,
            Rc::new(NoopEventEmitter),
        );
        controller.begin_preparing(0).await.unwrap();

        // Simulate a second tab winning the `active -> recording` race
        // directly against the store, then this controller loses it.
        controller
            .client
            .store()
            .transition(
                &id,
                SessionStatus::Active,
                SessionStatus::Recording,
                TransitionPatch::default(),
            )
            .await
            .unwrap();

        let err = controller.claim_and_start_countdown(10).await.unwrap_err();
        assert_eq!(err.code(), "concurrent_transition");
        assert_eq!(controller.phase(), Phase::Failed);
        assert_eq!(controller.session_status, SessionStatus::Recording);
    }
}
