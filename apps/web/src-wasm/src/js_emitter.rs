//! JS-callback event emitter for forwarding controller events to the
//! hosting page.
//!
//! The direct analogue of `thaumic-core`'s Tauri adapter
//! (`tauri_emitter.rs`'s `TauriEventEmitter`, which forwarded events to the
//! desktop frontend via `AppHandle::emit()`): here the "frontend" is the
//! hosting web page and the emit call is a plain JS function invocation
//! instead of a Tauri IPC round-trip.

use std::cell::RefCell;

use recorder_core::events::{ControllerEvent, EventEmitter};
use wasm_bindgen::JsValue;

/// Event emitter that forwards events to a JS callback as JSON.
///
/// Holds the callback behind a `RefCell<Option<_>>` rather than requiring
/// it at construction, mirroring `TauriEventEmitter`'s deferred
/// `set_app_handle` - the wasm module is instantiated before the host page
/// has necessarily registered its listener.
pub struct JsEventEmitter {
    callback: RefCell<Option<js_sys::Function>>,
}

impl JsEventEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            callback: RefCell::new(None),
        }
    }

    /// Registers (or replaces) the JS callback invoked on every event.
    pub fn set_callback(&self, callback: js_sys::Function) {
        *self.callback.borrow_mut() = Some(callback);
    }
}

impl Default for JsEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter for JsEventEmitter {
    fn emit(&self, event: ControllerEvent) {
        let Some(callback) = self.callback.borrow().clone() else {
            log::debug!("dropping controller event, no JS callback registered: {event:?}");
            return;
        };

        let value = match serde_wasm_bindgen::to_value(&event) {
            Ok(value) => value,
            Err(err) => {
                log::error!("failed to serialize controller event: {err}");
                return;
            }
        };

        if let Err(err) = callback.call1(&JsValue::NULL, &value) {
            log::warn!("JS event callback threw: {err:?}");
        }
    }
}
