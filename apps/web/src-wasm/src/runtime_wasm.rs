//! Browser-native [`Clock`]/[`TaskSpawner`] implementations.
//!
//! `recorder-core::runtime` gates its own `TokioClock`/`TokioSpawner` behind
//! `not(target_arch = "wasm32")`, since neither Tokio's timer nor its
//! executor exist in a browser tab; this module supplies the wasm-side
//! equivalents, backed by `gloo_timers`/`wasm_bindgen_futures` instead of a
//! Tokio runtime, the same split `thaumic-core` draws between its native
//! Tokio collaborators and a platform-specific adapter.

use std::time::Duration;

use async_trait::async_trait;
use recorder_core::runtime::{Clock, TaskSpawner};

/// `Clock` backed by `gloo_timers`' `TimeoutFuture` and `js_sys::Date`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmClock;

#[async_trait(?Send)]
impl Clock for WasmClock {
    async fn sleep(&self, dur: Duration) {
        let millis = u32::try_from(dur.as_millis()).unwrap_or(u32::MAX);
        gloo_timers::future::TimeoutFuture::new(millis).await;
    }

    fn now_millis(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// `TaskSpawner` backed by `wasm_bindgen_futures::spawn_local`, the browser
/// tab's single-threaded microtask queue - no `LocalSet` is needed since the
/// wasm module itself never runs more than one task at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct WasmSpawner;

impl TaskSpawner for WasmSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + 'static,
    {
        wasm_bindgen_futures::spawn_local(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn now_millis_is_a_plausible_unix_timestamp() {
        let clock = WasmClock;
        assert!(clock.now_millis() > 1_700_000_000_000);
    }

    #[wasm_bindgen_test]
    async fn sleep_resolves() {
        WasmClock.sleep(Duration::from_millis(1)).await;
    }

    #[wasm_bindgen_test]
    async fn spawn_runs_the_future() {
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        WasmSpawner.spawn(async move {
            flag.set(true);
        });

        // Let the spawned microtask run before asserting.
        gloo_timers::future::TimeoutFuture::new(0).await;
        assert!(ran.get());
    }
}
