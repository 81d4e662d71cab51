//! Runtime-independence abstractions.
//!
//! This module provides [`TaskSpawner`] and [`Clock`] traits so the core
//! state machine can run unmodified under a real Tokio runtime (native
//! tests) or under `wasm-bindgen-futures` (the browser tab), and so tests
//! can drive time-dependent scenarios without waiting on a real clock - see
//! spec §9, "Determinism in tests".

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// Abstraction for spawning background tasks.
///
/// Allows core services to spawn asynchronous work without knowing the
/// underlying executor. Implementations should ensure tasks are properly
/// tracked and can complete even if the spawner is dropped.
pub trait TaskSpawner {
    /// Spawns a future as a background task.
    ///
    /// The task runs independently of the caller and will continue until
    /// completion. The spawner does not provide a way to cancel or join the
    /// spawned task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static;
}

/// Tokio-based spawner for native builds and tests.
///
/// Spawns onto the current `tokio::task::LocalSet` via `spawn_local`, since
/// [`TaskSpawner::spawn`] takes a non-`Send` future (the controller and its
/// collaborators run single-threaded, matching the wasm target). Callers
/// must construct and drive a `LocalSet` around any code that uses this
/// spawner. Not available under `wasm32` - the browser entry point supplies
/// a `wasm-bindgen-futures` based spawner instead (see
/// `recorder-web::bootstrap`).
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Copy, Default)]
pub struct TokioSpawner;

#[cfg(not(target_arch = "wasm32"))]
impl TokioSpawner {
    #[must_use]
    pub fn current() -> Self {
        Self
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        tokio::task::spawn_local(future);
    }
}

/// Abstraction over wall-clock time and sleeping.
///
/// The chunk cadence, countdown duration, and upload backoff delays are all
/// expressed as [`Clock::sleep`] calls, so tests can inject a [`Clock`] that
/// resolves instantly (or on command) instead of waiting on real time.
#[async_trait(?Send)]
pub trait Clock {
    /// Suspends until `dur` has elapsed.
    async fn sleep(&self, dur: Duration);

    /// Returns milliseconds since the Unix epoch, for local bookkeeping only
    /// (durable timestamps always come from the document store's
    /// server-assigned clock - see spec §4.5).
    fn now_millis(&self) -> u64;
}

/// `Clock` backed by real wall-clock time. Used by the browser entry point
/// (via `wasm-bindgen-futures`/`gloo-timers`) and, for native tests, by
/// Tokio's timer.
#[cfg(not(target_arch = "wasm32"))]
pub struct TokioClock;

#[cfg(not(target_arch = "wasm32"))]
#[async_trait(?Send)]
impl Clock for TokioClock {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }

    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
pub mod test_support {
    use super::{Clock, TaskSpawner};
    use async_trait::async_trait;
    use std::cell::Cell;
    use std::future::Future;
    use std::rc::Rc;
    use std::time::Duration;

    /// A clock that never actually sleeps - `sleep` resolves immediately but
    /// still advances a logical clock, so tests can assert on elapsed time
    /// without waiting on it.
    #[derive(Clone, Default)]
    pub struct InstantClock {
        elapsed_ms: Rc<Cell<u64>>,
    }

    impl InstantClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn elapsed_ms(&self) -> u64 {
            self.elapsed_ms.get()
        }
    }

    #[async_trait(?Send)]
    impl Clock for InstantClock {
        async fn sleep(&self, dur: Duration) {
            self.elapsed_ms.set(self.elapsed_ms.get() + dur.as_millis() as u64);
        }

        fn now_millis(&self) -> u64 {
            self.elapsed_ms.get()
        }
    }

    /// Spawner that runs futures to completion inline via `tokio::spawn` on
    /// the current multi-threaded test runtime. Good enough for unit tests
    /// that don't care about true background concurrency.
    #[derive(Clone, Default)]
    pub struct InlineSpawner;

    impl TaskSpawner for InlineSpawner {
        fn spawn<F>(&self, future: F)
        where
            F: Future<Output = ()> + 'static,
        {
            tokio::task::spawn_local(future);
        }
    }
}
