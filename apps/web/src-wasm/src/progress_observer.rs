//! Throttled session-progress reporting (spec §4.5 `reportProgress`,
//! "throttled to at most one write per 1s").
//!
//! Implements `recorder_core::upload::UploadObserver` against an injected
//! [`Clock`] so the throttle window is deterministic under test, spawning
//! each write onto [`WasmSpawner`] exactly like
//! `recorder_core::upload::UploadManager::enqueue` spawns its own retry
//! loop, so a slow `reportProgress` call never blocks the next chunk
//! outcome from being observed.

use std::cell::Cell;
use std::rc::Rc;

use recorder_core::model::SessionId;
use recorder_core::runtime::{Clock, TaskSpawner};
use recorder_core::session::DocumentStore;
use recorder_core::upload::UploadObserver;

pub struct ThrottledProgressObserver<S, C, Sp> {
    store: Rc<S>,
    id: SessionId,
    clock: C,
    spawner: Sp,
    throttle_ms: u64,
    last_reported_at_ms: Cell<Option<u64>>,
    max_chunk_uploaded: Cell<Option<u64>>,
}

impl<S, C, Sp> ThrottledProgressObserver<S, C, Sp>
where
    S: DocumentStore + 'static,
    C: Clock + 'static,
    Sp: TaskSpawner + 'static,
{
    #[must_use]
    pub fn new(store: Rc<S>, id: SessionId, clock: C, spawner: Sp, throttle_ms: u64) -> Self {
        Self {
            store,
            id,
            clock,
            spawner,
            throttle_ms,
            last_reported_at_ms: Cell::new(None),
            max_chunk_uploaded: Cell::new(None),
        }
    }
}

impl<S, C, Sp> UploadObserver for ThrottledProgressObserver<S, C, Sp>
where
    S: DocumentStore + 'static,
    C: Clock + 'static,
    Sp: TaskSpawner + 'static,
{
    fn on_chunk_succeeded(&self, index: u64, succeeded_count: u64, expected: Option<u64>) {
        // Uploads complete out of order (spec §5 "Ordering guarantees":
        // "Completion order is not guaranteed to match dispatch order"), so
        // `lastChunkUploaded` must track the highest index seen so far, not
        // just-completed `index` - otherwise a later-dispatched, earlier-
        // finishing chunk could regress the session's monotonic field (spec
        // §3 invariant 5).
        let last_chunk_uploaded = match self.max_chunk_uploaded.get() {
            Some(current) if current >= index => current,
            _ => {
                self.max_chunk_uploaded.set(Some(index));
                index
            }
        };

        let now = self.clock.now_millis();
        if let Some(last) = self.last_reported_at_ms.get() {
            if now.saturating_sub(last) < self.throttle_ms {
                return;
            }
        }
        self.last_reported_at_ms.set(Some(now));

        let progress = match expected {
            Some(total) if total > 0 => {
                ((succeeded_count as f64 / total as f64) * 100.0).min(100.0) as u8
            }
            _ => 0,
        };

        let store = self.store.clone();
        let id = self.id.clone();
        self.spawner.spawn(async move {
            if let Err(err) = store.report_progress(&id, progress, last_chunk_uploaded).await {
                log::warn!("progress report for chunk {index} failed: {err}");
            }
        });
    }

    fn on_chunk_failed_fatal(&self, index: u64, reason: String) {
        log::error!("chunk {index} failed fatally: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recorder_core::error::SessionError;
    use recorder_core::model::Session;
    use recorder_core::session::{DocumentStore, TransitionPatch};
    use std::cell::{Cell as StdCell, RefCell};
    use std::future::Future;
    use std::pin::Pin;
    use std::task::Context;

    #[derive(Default)]
    struct RecordingStore {
        calls: RefCell<Vec<(u8, u64)>>,
    }

    #[async_trait(?Send)]
    impl DocumentStore for RecordingStore {
        async fn load(&self, _session_id: &SessionId) -> Result<Session, SessionError> {
            Err(SessionError::NotFound)
        }

        async fn transition(
            &self,
            _session_id: &SessionId,
            _from_expected: recorder_core::model::SessionStatus,
            _to: recorder_core::model::SessionStatus,
            _patch: TransitionPatch,
        ) -> Result<(), SessionError> {
            Ok(())
        }

        async fn report_progress(
            &self,
            _session_id: &SessionId,
            upload_progress: u8,
            last_chunk_uploaded: u64,
        ) -> Result<(), SessionError> {
            self.calls
                .borrow_mut()
                .push((upload_progress, last_chunk_uploaded));
            Ok(())
        }

        async fn report_error(
            &self,
            _session_id: &SessionId,
            _code: &str,
            _message: &str,
            _retryable: bool,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeClock {
        now: Rc<StdCell<u64>>,
    }

    #[async_trait(?Send)]
    impl Clock for FakeClock {
        async fn sleep(&self, _dur: std::time::Duration) {}

        fn now_millis(&self) -> u64 {
            self.now.get()
        }
    }

    #[derive(Clone, Default)]
    struct InlineSpawner;

    impl TaskSpawner for InlineSpawner {
        fn spawn<F>(&self, future: F)
        where
            F: Future<Output = ()> + 'static,
        {
            let mut future = Box::pin(future);
            let waker = futures::task::noop_waker();
            let mut cx = Context::from_waker(&waker);
            let _ = Pin::new(&mut future).poll(&mut cx);
        }
    }

    fn sample_id() -> SessionId {
        SessionId {
            random_prefix: "abc".into(),
            prompt_id: "prompt1".into(),
            user_id: "user1".into(),
            storyteller_id: "teller1".into(),
            unix_seconds: 1_700_000_000,
        }
    }

    #[test]
    fn reports_progress_on_first_chunk() {
        let store = Rc::new(RecordingStore::default());
        let clock = FakeClock::default();
        let observer =
            ThrottledProgressObserver::new(store.clone(), sample_id(), clock, InlineSpawner, 1_000);

        observer.on_chunk_succeeded(0, 1, Some(4));

        assert_eq!(store.calls.borrow().as_slice(), &[(25, 0)]);
    }

    #[test]
    fn throttles_reports_within_the_window() {
        let store = Rc::new(RecordingStore::default());
        let clock = FakeClock::default();
        let observer = ThrottledProgressObserver::new(
            store.clone(),
            sample_id(),
            clock.clone(),
            InlineSpawner,
            1_000,
        );

        observer.on_chunk_succeeded(0, 1, Some(4));
        clock.now.set(500);
        observer.on_chunk_succeeded(1, 2, Some(4));
        assert_eq!(store.calls.borrow().len(), 1);

        clock.now.set(1_000);
        observer.on_chunk_succeeded(2, 3, Some(4));
        assert_eq!(store.calls.borrow().len(), 2);
        assert_eq!(store.calls.borrow()[1], (75, 2));
    }

    #[test]
    fn out_of_order_completion_never_regresses_last_chunk_uploaded() {
        let store = Rc::new(RecordingStore::default());
        let clock = FakeClock::default();
        let observer = ThrottledProgressObserver::new(
            store.clone(),
            sample_id(),
            clock.clone(),
            InlineSpawner,
            1_000,
        );

        // chunk 2 finishes before chunk 1 (concurrent dispatch, independent
        // completion order - spec §5 "Ordering guarantees").
        observer.on_chunk_succeeded(2, 1, Some(4));
        clock.now.set(1_000);
        observer.on_chunk_succeeded(1, 2, Some(4));

        let calls = store.calls.borrow();
        assert_eq!(calls[0].1, 2);
        assert_eq!(calls[1].1, 2, "lastChunkUploaded must not regress to 1");
    }
}
