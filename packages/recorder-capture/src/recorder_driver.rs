//! Implements [`recorder_core::recorder::RecorderDriver`] against
//! `web_sys::MediaRecorder`.
//!
//! The `dataavailable`/`error` events are bridged from JS callbacks into
//! Rust futures via `tokio::sync::oneshot` channels (no reactor needed, so
//! this works identically under wasm), following the `Closure`-over-a-
//! shared-cell pattern from the pack's `wayeast-mediarecorder` example,
//! generalized from a fire-and-forget log callback into an awaitable
//! request/response pair.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use gloo_file::{futures::read_as_bytes, Blob};
use recorder_core::error::RecorderDriverError;
use recorder_core::recorder::RecorderDriver;
use tokio::sync::oneshot;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{BlobEvent, MediaRecorder, MediaRecorderOptions, MediaStream};

use crate::media_acquirer::WebMediaStream;

pub struct WebRecorderDriver {
    recorder: MediaRecorder,
    stream: WebMediaStream,
    mime_type: String,
    pending: Rc<RefCell<Option<oneshot::Sender<Result<Blob, RecorderDriverError>>>>>,
    // Kept alive for the lifetime of the recorder; dropping a `Closure`
    // invalidates the JS-side function pointer it backs.
    _on_data: Closure<dyn FnMut(JsValue)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

impl WebRecorderDriver {
    /// Constructs a driver over `stream` configured with `mime_type` (the
    /// descriptor chosen by C1). `mime_type` may be `""` to request the
    /// runtime default.
    ///
    /// # Errors
    /// Returns `DeviceDropped` if the underlying `MediaRecorder`
    /// constructor rejects the stream or options.
    pub fn new(stream: WebMediaStream, mime_type: String) -> Result<Self, RecorderDriverError> {
        let js_stream: &MediaStream = stream.inner();
        let options = MediaRecorderOptions::new();
        if !mime_type.is_empty() {
            options.mime_type(&mime_type);
        }

        let recorder =
            MediaRecorder::new_with_media_stream_and_media_recorder_options(js_stream, &options)
                .map_err(|e| RecorderDriverError::DeviceDropped(format!("{e:?}")))?;

        let pending: Rc<RefCell<Option<oneshot::Sender<Result<Blob, RecorderDriverError>>>>> =
            Rc::new(RefCell::new(None));

        let pending_for_data = pending.clone();
        let on_data = Closure::wrap(Box::new(move |event: JsValue| {
            let blob_event: BlobEvent = event.unchecked_into();
            if let Some(sender) = pending_for_data.borrow_mut().take() {
                match blob_event.data() {
                    Some(blob) => {
                        let _ = sender.send(Ok(Blob::from(blob)));
                    }
                    None => {
                        let _ = sender.send(Err(RecorderDriverError::DeviceDropped(
                            "dataavailable event carried no blob".into(),
                        )));
                    }
                }
            }
        }) as Box<dyn FnMut(JsValue)>);
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));

        let pending_for_error = pending.clone();
        let on_error = Closure::wrap(Box::new(move |_event: JsValue| {
            if let Some(sender) = pending_for_error.borrow_mut().take() {
                let _ = sender.send(Err(RecorderDriverError::DeviceDropped(
                    "underlying MediaRecorder reported an error".into(),
                )));
            }
        }) as Box<dyn FnMut(JsValue)>);
        recorder.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(Self {
            recorder,
            stream,
            mime_type,
            pending,
            _on_data: on_data,
            _on_error: on_error,
        })
    }
}

#[async_trait(?Send)]
impl RecorderDriver for WebRecorderDriver {
    async fn start(&mut self) -> Result<(), RecorderDriverError> {
        self.recorder
            .start()
            .map_err(|e| RecorderDriverError::DeviceDropped(format!("{e:?}")))
    }

    fn pause(&mut self) {
        let _ = self.recorder.pause();
    }

    fn resume(&mut self) {
        let _ = self.recorder.resume();
    }

    async fn request_chunk(&mut self) -> Result<(Vec<u8>, String), RecorderDriverError> {
        let (tx, rx) = oneshot::channel();
        *self.pending.borrow_mut() = Some(tx);
        self.recorder
            .request_data()
            .map_err(|e| RecorderDriverError::DeviceDropped(format!("{e:?}")))?;

        let blob = rx
            .await
            .map_err(|_| RecorderDriverError::DeviceDropped("dataavailable never fired".into()))??;

        let bytes = read_as_bytes(&blob)
            .await
            .map_err(|e| RecorderDriverError::DeviceDropped(format!("{e:?}")))?;

        Ok((bytes, self.mime_type.clone()))
    }

    async fn stop(&mut self) {
        let _ = self.recorder.stop();
        self.stream.release();
    }

    fn abort(&mut self) {
        let _ = self.recorder.stop();
        self.stream.release();
    }
}

impl Drop for WebRecorderDriver {
    fn drop(&mut self) {
        self.recorder.set_ondataavailable(None);
        self.recorder.set_onerror(None);
    }
}

pub use crate::media_acquirer::WebMediaStream as WebMediaStreamHandle;
