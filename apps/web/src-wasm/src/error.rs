//! JS-facing error conversion.
//!
//! `wasm-bindgen` exported functions return `Result<T, JsValue>`; this
//! module is the single place that turns a [`recorder_core::error::RecorderError`]
//! into a small JSON-serializable payload `{ code, message }` the host page
//! can branch on, mirroring how `apps/desktop/src-tauri::error` maps the
//! core's error types onto Tauri's command error contract.

use recorder_core::error::{ErrorCode, RecorderError};
use serde::Serialize;
use wasm_bindgen::JsValue;

#[derive(Serialize)]
struct JsErrorPayload {
    code: &'static str,
    message: String,
}

/// Converts a core error into a `JsValue` suitable for a `wasm-bindgen`
/// exported function's `Err` arm.
#[must_use]
pub fn to_js_error(err: &RecorderError) -> JsValue {
    let payload = JsErrorPayload {
        code: err.code(),
        message: err.to_string(),
    };
    serde_wasm_bindgen::to_value(&payload).unwrap_or_else(|_| JsValue::from_str(err.code()))
}
