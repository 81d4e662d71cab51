//! recorder-web - `wasm-bindgen` entry point for the in-browser recording
//! tab.
//!
//! Loaded as a `cdylib` into the recording tab; wires `recorder-core` and
//! `recorder-capture` together and exposes a small JS-callable surface.
//! Corresponds to `apps/desktop/src-tauri`, the Tauri adapter that wired
//! `thaumic-core` to a desktop shell; here the "frontend" is the hosting
//! web page and events are delivered via a JS callback instead of a Tauri
//! `AppHandle`.

mod bootstrap;
mod error;
mod http_store;
mod js_emitter;
mod progress_observer;
mod runtime_wasm;

use std::cell::RefCell;
use std::rc::Rc;

use futures::StreamExt;
use recorder_capture::VisibilityWatcher;
use recorder_core::model::{MediaKind, Phase};
use recorder_core::watcher::SessionSubscription;
use wasm_bindgen::prelude::*;

use crate::error::to_js_error;

/// JS-facing handle for one recording attempt. Constructed via
/// [`RecorderApp::new`] from the current page URL; every further
/// interaction goes through this object's methods.
#[wasm_bindgen]
pub struct RecorderApp {
    inner: Rc<RefCell<bootstrap::RecordingSession>>,
}

#[wasm_bindgen]
impl RecorderApp {
    /// Parses `url` for a session identifier and prepares a controller
    /// pointed at `api_base_url` for the session-document and
    /// object-store REST facades.
    #[wasm_bindgen(constructor)]
    pub fn new(url: &str, api_base_url: String) -> Result<RecorderApp, JsValue> {
        let session = bootstrap::init(url, api_base_url).map_err(|e| JsValue::from_str(&e))?;
        Ok(Self {
            inner: Rc::new(RefCell::new(session)),
        })
    }

    /// Registers the JS callback invoked on every controller event. The
    /// callback receives a single JSON-serialized event object (see
    /// `recorder_core::events::ControllerEvent`).
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: js_sys::Function) {
        self.inner.borrow().emitter.set_callback(callback);
    }

    /// Loads and validates the session, advancing to the `prompt` phase on
    /// success (spec §4.5, §4.8).
    pub fn load(&self, now_unix_seconds: u64, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let mut session = inner.borrow_mut();
            session
                .controller
                .load(now_unix_seconds, now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Returns the controller's current local phase as a lowercase string
    /// (spec §4.8, `RecorderRuntimeState.phase`).
    pub fn phase(&self) -> String {
        phase_label(self.inner.borrow().controller.phase()).to_string()
    }

    /// Enters `preparing` and runs codec selection (C1) plus media
    /// acquisition (C2); on success, installs the tab-visibility listener
    /// that drives auto-pause (spec §4.3).
    pub fn prepare(&self, kind: String, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            let media_kind = parse_kind(&kind)?;
            inner
                .borrow_mut()
                .prepare(media_kind, now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;

            let watcher_target = inner.clone();
            let watcher = VisibilityWatcher::install(move || {
                let now = js_sys::Date::now() as u64;
                watcher_target.borrow_mut().handle_visibility_hidden(now);
            })
            .map_err(|_| JsValue::from_str("failed to install visibility watcher"))?;
            inner.borrow_mut().visibility_watcher = Some(watcher);

            Ok(JsValue::NULL)
        })
    }

    /// Claims the session and begins the fixed countdown (spec §4.8, §8
    /// scenario 6 "Two tabs, same link").
    #[wasm_bindgen(js_name = startCountdown)]
    pub fn start_countdown(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .start_countdown(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Advances the countdown by one tick (spec §4.8).
    #[wasm_bindgen(js_name = tickCountdown)]
    pub fn tick_countdown(&self, remaining_seconds: u32, now_millis: u64) {
        self.inner
            .borrow_mut()
            .tick_countdown(remaining_seconds, now_millis);
    }

    /// Advances the duration clock by one tick (spec §4.3), auto-finishing
    /// the recording if the hard duration cap is reached.
    pub fn tick(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .tick(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Flushes the current buffer as a mid-recording chunk at the chunk
    /// cadence (spec §4.3 `chunk-available`).
    #[wasm_bindgen(js_name = requestChunk)]
    pub fn request_chunk(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .request_chunk(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Explicit stop: flushes the final chunk and moves to `reviewing`.
    pub fn stop(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .stop(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Explicit user pause (spec §4.3).
    pub fn pause(&self, now_millis: u64) {
        self.inner.borrow_mut().pause(now_millis);
    }

    /// Explicit user resume; always requires user action, never automatic
    /// (spec §4.3, §6).
    pub fn resume(&self, now_millis: u64) {
        self.inner.borrow_mut().resume(now_millis);
    }

    /// `reviewing -> preparing`: discards the current attempt's in-memory
    /// recorder/upload state and resets the session document's progress
    /// fields (spec §4.8 "start over").
    #[wasm_bindgen(js_name = startOver)]
    pub fn start_over(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .start_over(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// `reviewing -> uploading` (spec §4.8).
    #[wasm_bindgen(js_name = beginUploading)]
    pub fn begin_uploading(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .begin_uploading(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Whether every enqueued chunk has resolved (succeeded or failed
    /// fatally). The host page polls this before calling
    /// [`Self::finish_uploading`].
    #[wasm_bindgen(js_name = isUploadDrained)]
    pub fn is_upload_drained(&self) -> bool {
        self.inner.borrow().is_upload_drained()
    }

    /// `uploading -> processing -> completed` (spec §4.8), once the upload
    /// manager has fully drained.
    #[wasm_bindgen(js_name = finishUploading)]
    pub fn finish_uploading(&self, now_millis: u64) -> js_sys::Promise {
        let inner = self.inner.clone();
        wasm_bindgen_futures::future_to_promise(async move {
            inner
                .borrow_mut()
                .finish_uploading(now_millis)
                .await
                .map_err(|e| to_js_error(&e))?;
            Ok(JsValue::NULL)
        })
    }

    /// Cascading abort (spec §5 "Cancellation semantics"). Idempotent.
    pub fn abort(&self, now_millis: u64) {
        self.inner.borrow_mut().abort(now_millis);
    }

    /// Starts polling the session document for external changes (spec
    /// §4.6): session removal, expiry, or another tab completing the
    /// recording all abort this attempt. Runs for the lifetime of the page;
    /// stops on its own once the controller reaches a terminal phase.
    #[wasm_bindgen(js_name = watchSession)]
    pub fn watch_session(&self) {
        let inner = self.inner.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let (store, id) = {
                let session = inner.borrow();
                (session.store.clone(), session.id.clone())
            };

            let mut stream = match store.watch(&id).await {
                Ok(stream) => stream,
                Err(err) => {
                    log::warn!("failed to start session watch: {err}");
                    return;
                }
            };

            while let Some(item) = stream.next().await {
                let mut session = inner.borrow_mut();
                if session.controller.phase().is_terminal() {
                    break;
                }
                match item {
                    Ok(event) => {
                        let now = js_sys::Date::now() as u64;
                        session.controller.handle_watch_event(&event, now);
                    }
                    Err(err) => {
                        log::warn!("session watch stream error: {err}");
                        break;
                    }
                }
            }
        });
    }
}

fn parse_kind(kind: &str) -> Result<MediaKind, JsValue> {
    match kind {
        "audio" => Ok(MediaKind::Audio),
        "video" => Ok(MediaKind::Video),
        other => Err(JsValue::from_str(&format!("unknown media kind: {other}"))),
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Loading => "loading",
        Phase::Prompt => "prompt",
        Phase::Preparing => "preparing",
        Phase::Countdown => "countdown",
        Phase::Recording => "recording",
        Phase::Paused => "paused",
        Phase::Reviewing => "reviewing",
        Phase::Uploading => "uploading",
        Phase::Processing => "processing",
        Phase::Completed => "completed",
        Phase::Failed => "failed",
        Phase::Error => "error",
    }
}
