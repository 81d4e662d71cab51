//! Wires `recorder-core` and `recorder-capture` together behind the
//! `wasm-bindgen` surface in `lib.rs`.
//!
//! Mirrors `apps/desktop/src-tauri::bootstrap`, which constructed the
//! concrete `TaskSpawner`/`EventEmitter`/store implementations and handed
//! them to `thaumic-core`'s services; here the wiring happens once per
//! recording tab rather than once per desktop app launch, and the business
//! logic each `RecorderApp` method in `lib.rs` drives lives here rather
//! than in the `#[wasm_bindgen]` surface itself, so it stays plain,
//! testable Rust.

use std::rc::Rc;

use recorder_capture::{VisibilityWatcher, WebCodecProbe, WebMediaAcquirer, WebRecorderDriver};
use recorder_core::codec::{first_supported, CodecDescriptor};
use recorder_core::config::RecorderConfig;
use recorder_core::controller::RecordingController;
use recorder_core::error::RecorderError;
use recorder_core::events::ControllerEvent;
use recorder_core::link::parse_session_link;
use recorder_core::media::{MediaAcquirer, MediaConstraints};
use recorder_core::model::{MediaKind, PauseCause, SessionId};
use recorder_core::recorder::{ChunkedRecorder, RecorderNotice};
use recorder_core::upload::UploadManager;

use crate::http_store::HttpApiClient;
use crate::js_emitter::JsEventEmitter;
use crate::progress_observer::ThrottledProgressObserver;
use crate::runtime_wasm::{WasmClock, WasmSpawner};

/// Everything the wasm entry point needs to drive one recording attempt.
///
/// `recorder`/`upload_manager`/`progress_observer` only exist from
/// `preparing` onward - [`Self::prepare`] constructs them once C1+C2
/// succeed, and [`Self::start_over`]/[`Self::abort`] tear them down.
pub struct RecordingSession {
    pub controller: RecordingController<HttpApiClient>,
    pub emitter: Rc<JsEventEmitter>,
    pub id: SessionId,
    pub store: Rc<HttpApiClient>,

    pub codec: Option<CodecDescriptor>,
    pub recorder: Option<ChunkedRecorder<WebRecorderDriver, WasmClock>>,
    pub upload_manager: Option<UploadManager<HttpApiClient, WasmClock>>,
    pub progress_observer: Option<Rc<ThrottledProgressObserver<HttpApiClient, WasmClock, WasmSpawner>>>,
    pub visibility_watcher: Option<VisibilityWatcher>,

    pub pause_started_at_ms: Option<u64>,
    pub chunks_enqueued: u64,
}

impl RecordingSession {
    /// Deterministic chunk storage prefix for this attempt (spec §3
    /// "ChunkObjectPath").
    #[must_use]
    pub fn chunks_folder(&self) -> String {
        format!(
            "users/{}/recordings/{}/chunks",
            self.id.user_id,
            self.id.as_opaque_string()
        )
    }

    /// Runs C1 (codec selection) and C2 (media acquisition), then
    /// constructs the C3/C4 pair for this attempt (spec §4.8 `preparing`).
    /// A [`recorder_core::error::MediaError`] leaves the controller in
    /// `preparing` so the host page can retry; any other failure is fatal
    /// and moves the controller to `failed`.
    pub async fn prepare(&mut self, kind: MediaKind, now_millis: u64) -> Result<(), RecorderError> {
        self.controller.begin_preparing(now_millis).await?;

        match self.try_prepare(kind, now_millis).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.is_fatal() {
                    self.controller.fail(&err, now_millis).await;
                }
                Err(err)
            }
        }
    }

    async fn try_prepare(&mut self, kind: MediaKind, now_millis: u64) -> Result<(), RecorderError> {
        let descriptor = first_supported(kind, &WebCodecProbe)?;

        let constraints = MediaConstraints::for_kind(kind);
        let stream = WebMediaAcquirer.acquire(&constraints).await?;

        let driver = WebRecorderDriver::new(stream, descriptor.mime_type.clone())?;

        let config = self.controller.config().clone();
        let recorder = ChunkedRecorder::new(
            driver,
            WasmClock,
            kind,
            config.chunk_cadence.as_millis() as u64,
            config.max_duration.as_millis() as u64,
            config.duration_warning_window.as_millis() as u64,
            0,
        );

        let upload_manager = UploadManager::new((*self.store).clone(), WasmClock, config.clone());
        let observer = Rc::new(ThrottledProgressObserver::new(
            self.store.clone(),
            self.id.clone(),
            WasmClock,
            WasmSpawner,
            config.progress_report_interval.as_millis() as u64,
        ));

        let _ = now_millis;
        self.codec = Some(descriptor);
        self.recorder = Some(recorder);
        self.upload_manager = Some(upload_manager);
        self.progress_observer = Some(observer);
        Ok(())
    }

    /// Claims the session and starts the countdown (spec §4.8), then
    /// starts the underlying recorder so it is already capturing once the
    /// countdown reaches zero.
    pub async fn start_countdown(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        self.controller.claim_and_start_countdown(now_millis).await?;
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.start().await?;
        }
        Ok(())
    }

    pub fn tick_countdown(&mut self, remaining_seconds: u32, now_millis: u64) {
        self.controller.tick_countdown(remaining_seconds, now_millis);
    }

    /// Advances the duration clock by one tick (spec §4.3), forwarding the
    /// resulting notices as events and, on `DurationReached`, running the
    /// same finish sequence as an explicit stop.
    pub async fn tick(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let notices = match self.recorder.as_mut() {
            Some(recorder) => recorder.tick(now_millis),
            None => return Ok(()),
        };

        let max_duration_secs = self.controller.config().max_duration.as_secs() as u32;
        let mut duration_reached = false;
        for notice in notices {
            match notice {
                RecorderNotice::DurationTick { elapsed_seconds } => {
                    self.emitter.emit(ControllerEvent::ElapsedTick {
                        elapsed_seconds,
                        remaining_seconds: max_duration_secs.saturating_sub(elapsed_seconds),
                    });
                }
                RecorderNotice::DurationWarning { seconds_remaining } => {
                    self.emitter.emit(ControllerEvent::Warning {
                        code: "duration_warning",
                        message: format!("{seconds_remaining} seconds remaining"),
                    });
                }
                RecorderNotice::DurationReached => duration_reached = true,
                _ => {}
            }
        }

        if duration_reached {
            self.finish_recording(now_millis).await?;
        }
        Ok(())
    }

    /// Flushes a mid-recording chunk at the chunk cadence and hands it to
    /// the upload manager (spec §4.3 `chunk-available`, §4.4 "Upload path").
    pub async fn request_chunk(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        let chunk = recorder.flush_chunk(now_millis).await?;
        self.enqueue_chunk(chunk);
        Ok(())
    }

    /// Explicit stop: flushes the final chunk and moves to `reviewing`
    /// (spec §4.8 "`recording -> reviewing` on explicit stop").
    pub async fn stop(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        self.finish_recording(now_millis).await
    }

    async fn finish_recording(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        let chunk = recorder.stop(now_millis).await?;
        self.enqueue_chunk(chunk);
        self.controller.stop_to_reviewing(now_millis);
        Ok(())
    }

    fn enqueue_chunk(&mut self, chunk: recorder_core::model::Chunk) {
        let (Some(upload_manager), Some(observer)) =
            (self.upload_manager.as_ref(), self.progress_observer.clone())
        else {
            return;
        };
        let extension = self
            .codec
            .as_ref()
            .map(|c| c.extension.to_string())
            .unwrap_or_else(|| "webm".to_string());

        self.emitter.emit(ControllerEvent::ChunkReady {
            chunk_index: chunk.index,
            size_bytes: chunk.byte_size,
        });
        self.chunks_enqueued += 1;
        upload_manager.enqueue(
            chunk,
            self.id.user_id.clone(),
            self.id.as_opaque_string(),
            extension,
            None,
            observer,
            &WasmSpawner,
        );
    }

    pub fn pause(&mut self, now_millis: u64) {
        let Self {
            recorder,
            emitter,
            pause_started_at_ms,
            ..
        } = self;
        if let Some(recorder) = recorder.as_mut() {
            *pause_started_at_ms = Some(now_millis);
            recorder.pause(PauseCause::User, emitter.as_ref());
        }
    }

    pub fn resume(&mut self, now_millis: u64) {
        let Self {
            recorder,
            emitter,
            pause_started_at_ms,
            ..
        } = self;
        if let Some(recorder) = recorder.as_mut() {
            let paused_ms = pause_started_at_ms
                .take()
                .map(|start| now_millis.saturating_sub(start))
                .unwrap_or(0);
            recorder.resume(paused_ms, emitter.as_ref());
        }
    }

    /// Invoked by the `visibilitychange` listener installed in `lib.rs`
    /// (spec §4.3 "Tab-visibility auto-pause is always on"). A no-op if
    /// already paused, so an explicit user pause is never silently
    /// reclassified as a visibility pause.
    pub fn handle_visibility_hidden(&mut self, now_millis: u64) {
        let Self {
            recorder,
            emitter,
            pause_started_at_ms,
            ..
        } = self;
        if let Some(recorder) = recorder.as_mut() {
            if !recorder.is_paused() {
                *pause_started_at_ms = Some(now_millis);
                recorder.pause(PauseCause::Visibility, emitter.as_ref());
            }
        }
    }

    pub async fn start_over(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.abort();
        }
        self.recorder = None;
        self.upload_manager = None;
        self.progress_observer = None;
        self.visibility_watcher = None;
        self.chunks_enqueued = 0;
        self.pause_started_at_ms = None;
        self.controller.start_over(now_millis).await
    }

    pub async fn begin_uploading(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        self.controller.begin_uploading(now_millis).await
    }

    /// Whether every enqueued chunk has either succeeded or failed fatally
    /// - the condition the host page polls before calling
    /// [`Self::finish_uploading`] (spec §4.8 "once the upload manager's
    /// outstanding set has fully drained").
    #[must_use]
    pub fn is_upload_drained(&self) -> bool {
        match self.upload_manager.as_ref() {
            Some(manager) => manager.succeeded_count() >= self.chunks_enqueued,
            None => true,
        }
    }

    pub async fn finish_uploading(&mut self, now_millis: u64) -> Result<(), RecorderError> {
        let chunks_count = self.chunks_enqueued;
        let mime_type = self
            .codec
            .as_ref()
            .map(|c| c.mime_type.clone())
            .unwrap_or_default();
        let chunks_folder = self.chunks_folder();
        self.controller
            .finish_uploading(chunks_count, 100, mime_type, chunks_folder, now_millis)
            .await
    }

    pub fn abort(&mut self, now_millis: u64) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.abort();
        }
        self.visibility_watcher = None;
        self.controller.abort(now_millis);
    }
}

/// Parses `url` for a session identifier and constructs the controller
/// wired to an `HttpApiClient` pointed at `api_base_url`.
///
/// # Errors
/// Returns the link parser's error string if `url` contains no valid
/// session identifier (spec §4.7).
pub fn init(url: &str, api_base_url: String) -> Result<RecordingSession, String> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let id: SessionId = parse_session_link(url).map_err(|e| e.to_string())?;
    let emitter = Rc::new(JsEventEmitter::new());
    let store = HttpApiClient::new(api_base_url);
    let controller = RecordingController::new(
        id.clone(),
        RecorderConfig::default(),
        store.clone(),
        emitter.clone(),
    );

    Ok(RecordingSession {
        controller,
        emitter,
        id,
        store: Rc::new(store),
        codec: None,
        recorder: None,
        upload_manager: None,
        progress_observer: None,
        visibility_watcher: None,
        pause_started_at_ms: None,
        chunks_enqueued: 0,
    })
}
