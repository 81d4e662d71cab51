//! Upload Manager (C4, spec §4.4).
//!
//! Bounded concurrency uses `tokio::sync::Semaphore`, which needs no OS
//! reactor and so behaves identically under a native Tokio runtime or
//! `wasm-bindgen-futures` - the same reasoning that let `recorder-core`
//! depend on `tokio`'s `sync` feature alone. Retry backoff follows the
//! fixed-delay-table shape of `thaumic-core::sonos::retry::with_retry`,
//! generalized to walk [`crate::config::RecorderConfig::retry_backoff`]
//! instead of a hard-coded SOAP-specific table.

use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::config::RecorderConfig;
use crate::error::UploadError;
use crate::model::Chunk;
use crate::runtime::{Clock, TaskSpawner};

/// Platform contract for writing a chunk to the object store. Implemented
/// in `apps/web/src-wasm::http_store` via `reqwest` against the external
/// platform's object-store REST facade.
#[async_trait(?Send)]
pub trait ObjectStore {
    /// Uploads `chunk`'s bytes to the deterministic path derived from
    /// `user_id`/`session_id`/`chunk.index` (spec §3 "ChunkObjectPath",
    /// §4.4 "Upload path"), attaching `{sessionId, chunkIndex,
    /// totalExpected}` metadata.
    async fn put_chunk(
        &self,
        user_id: &str,
        session_id: &str,
        chunk: &Chunk,
        extension: &str,
        total_expected: Option<u64>,
    ) -> Result<(), UploadError>;
}

/// Observer invoked on every chunk outcome, used by the controller to
/// drive `recordingData.{lastChunkUploaded, uploadProgress}` writes (spec
/// §4.4 "On success of chunk i") without the upload manager depending on
/// `crate::session` directly.
pub trait UploadObserver {
    fn on_chunk_succeeded(&self, index: u64, succeeded_count: u64, expected: Option<u64>);
    fn on_chunk_failed_fatal(&self, index: u64, reason: String);
}

/// Accepts chunks via [`Self::enqueue`] and uploads them with bounded
/// concurrency, FIFO dispatch order, and per-chunk retry with backoff
/// (spec §4.4).
///
/// Resume semantics (spec §4.4 "Resume contract") are not this manager's
/// concern at all: chunks already uploaded before a resume must simply
/// never be constructed by C3 in the first place, via
/// [`crate::recorder::ChunkedRecorder::new`]'s `starting_chunk_index`
/// parameter, so `Self::new` takes no resume-point argument and the
/// manager itself has no re-upload logic to suppress.
pub struct UploadManager<S, C> {
    store: Rc<S>,
    clock: Rc<C>,
    config: RecorderConfig,
    semaphore: Rc<Semaphore>,
    succeeded_count: Rc<std::cell::Cell<u64>>,
}

impl<S, C> UploadManager<S, C>
where
    S: ObjectStore + 'static,
    C: Clock + 'static,
{
    #[must_use]
    pub fn new(store: S, clock: C, config: RecorderConfig) -> Self {
        let concurrency = config.upload_concurrency;
        Self {
            store: Rc::new(store),
            clock: Rc::new(clock),
            config,
            semaphore: Rc::new(Semaphore::new(concurrency)),
            succeeded_count: Rc::new(std::cell::Cell::new(0)),
        }
    }

    #[must_use]
    pub fn succeeded_count(&self) -> u64 {
        self.succeeded_count.get()
    }

    /// Spawns the upload task for `chunk` onto `spawner`, acquiring a
    /// semaphore permit first so at most
    /// [`RecorderConfig::upload_concurrency`] uploads run at once (spec
    /// §4.4 "Up to N in-flight uploads concurrently"). Returns immediately;
    /// the caller observes outcomes through `observer`.
    ///
    /// Blocking here (holding the caller's task until a permit frees)
    /// would be the backpressure signal into C3 described in spec §5; this
    /// method does not itself block, since C8 decides how many chunks it
    /// is willing to buffer before raising `backpressure-overflow` - see
    /// [`Self::try_acquire_permit`].
    pub fn enqueue<Sp>(
        &self,
        chunk: Chunk,
        user_id: String,
        session_id: String,
        extension: String,
        total_expected: Option<u64>,
        observer: Rc<dyn UploadObserver>,
        spawner: &Sp,
    ) where
        Sp: TaskSpawner,
    {
        let store = self.store.clone();
        let clock = self.clock.clone();
        let backoff = self.config.retry_backoff.clone();
        let semaphore = self.semaphore.clone();
        let succeeded_count = self.succeeded_count.clone();

        spawner.spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            let index = chunk.index;

            let mut attempt = 0usize;
            loop {
                match store
                    .put_chunk(&user_id, &session_id, &chunk, &extension, total_expected)
                    .await
                {
                    Ok(()) => {
                        let count = succeeded_count.get() + 1;
                        succeeded_count.set(count);
                        observer.on_chunk_succeeded(index, count, total_expected);
                        return;
                    }
                    Err(UploadError::Fatal { reason, .. }) => {
                        observer.on_chunk_failed_fatal(index, reason);
                        return;
                    }
                    Err(UploadError::Transient { reason, .. }) => {
                        if attempt >= backoff.len() {
                            observer.on_chunk_failed_fatal(
                                index,
                                format!("exhausted retries: {reason}"),
                            );
                            return;
                        }
                        log::warn!(
                            "chunk {index} upload attempt {attempt} failed transiently: {reason}"
                        );
                        clock.sleep(backoff[attempt]).await;
                        attempt += 1;
                    }
                }
            }
        });
    }

    /// Reports whether an additional chunk can be buffered without
    /// exceeding the in-flight-plus-one memory bound (spec §4.4 "Memory
    /// bound"): the manager holds at most `N + 1` chunks at any instant.
    #[must_use]
    pub fn has_backpressure_room(&self) -> bool {
        self.semaphore.available_permits() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::test_support::{InlineSpawner, InstantClock};
    use std::cell::RefCell;

    struct FlakyStore {
        fail_count: std::cell::Cell<u32>,
    }

    #[async_trait(?Send)]
    impl ObjectStore for FlakyStore {
        async fn put_chunk(
            &self,
            _user_id: &str,
            _session_id: &str,
            _chunk: &Chunk,
            _extension: &str,
            _total_expected: Option<u64>,
        ) -> Result<(), UploadError> {
            let remaining = self.fail_count.get();
            if remaining > 0 {
                self.fail_count.set(remaining - 1);
                return Err(UploadError::Transient {
                    index: 0,
                    reason: "timeout".into(),
                });
            }
            Ok(())
        }
    }

    struct RecordingObserver {
        succeeded: RefCell<Vec<u64>>,
        failed: RefCell<Vec<u64>>,
    }

    impl RecordingObserver {
        fn new() -> Self {
            Self {
                succeeded: RefCell::new(Vec::new()),
                failed: RefCell::new(Vec::new()),
            }
        }
    }

    impl UploadObserver for RecordingObserver {
        fn on_chunk_succeeded(&self, index: u64, _succeeded_count: u64, _expected: Option<u64>) {
            self.succeeded.borrow_mut().push(index);
        }

        fn on_chunk_failed_fatal(&self, index: u64, _reason: String) {
            self.failed.borrow_mut().push(index);
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn flaky_chunk_eventually_succeeds_once() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let manager = UploadManager::new(
                    FlakyStore {
                        fail_count: std::cell::Cell::new(2),
                    },
                    InstantClock::new(),
                    RecorderConfig::default(),
                );
                let observer = Rc::new(RecordingObserver::new());
                let chunk = Chunk::new(0, vec![1, 2, 3].into(), "audio/webm".into(), 0);
                manager.enqueue(
                    chunk,
                    "user1".into(),
                    "sess1".into(),
                    "webm".into(),
                    Some(1),
                    observer.clone(),
                    &InlineSpawner,
                );

                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;

                assert_eq!(*observer.succeeded.borrow(), vec![0]);
                assert!(observer.failed.borrow().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn backpressure_room_reflects_available_permits() {
        let mut config = RecorderConfig::default();
        config.upload_concurrency = 1;
        let manager = UploadManager::new(
            FlakyStore {
                fail_count: std::cell::Cell::new(0),
            },
            InstantClock::new(),
            config,
        );
        assert!(manager.has_backpressure_room());
    }
}
