//! Implements [`recorder_core::media::MediaAcquirer`] against
//! `web_sys::MediaDevices::get_user_media_with_constraints`.

use async_trait::async_trait;
use js_sys::Reflect;
use recorder_core::error::MediaError;
use recorder_core::media::{MediaAcquirer, MediaConstraints, MediaStreamHandle};
use recorder_core::model::MediaKind;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MediaStream, MediaStreamConstraints, MediaStreamTrack};

/// Wraps a `web_sys::MediaStream`, releasing every track on
/// [`MediaStreamHandle::release`] (spec §5, "on `stop()` or `abort()` C3
/// must release every track").
pub struct WebMediaStream {
    inner: MediaStream,
}

impl WebMediaStream {
    #[must_use]
    pub fn inner(&self) -> &MediaStream {
        &self.inner
    }
}

impl MediaStreamHandle for WebMediaStream {
    fn release(&self) {
        let tracks = self.inner.get_tracks();
        for i in 0..tracks.length() {
            if let Ok(track) = tracks.get(i).dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}

/// Requests microphone/camera access via the browser's
/// `getUserMedia`. Constructed fresh per recording attempt by the
/// `preparing` phase handler, never at module load, so permission is
/// requested just-in-time (spec §4.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMediaAcquirer;

#[async_trait(?Send)]
impl MediaAcquirer for WebMediaAcquirer {
    type Stream = WebMediaStream;

    async fn acquire(&self, constraints: &MediaConstraints) -> Result<Self::Stream, MediaError> {
        let window = web_sys::window().ok_or(MediaError::Unsupported)?;
        let navigator = window.navigator();
        let media_devices = navigator.media_devices().map_err(|_| MediaError::Unsupported)?;

        let js_constraints = build_constraints(constraints);
        let promise = media_devices
            .get_user_media_with_constraints(&js_constraints)
            .map_err(classify_get_user_media_error)?;

        let value = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(classify_get_user_media_error)?;

        Ok(WebMediaStream {
            inner: value.unchecked_into(),
        })
    }
}

/// Builds `{ audio: {...ideal...}, video: {...ideal...} | false }` for the
/// given recording mode (spec §4.2, "Quality contract" - "ideal", not
/// "exact", so devices without the ideal capability still work).
fn build_constraints(constraints: &MediaConstraints) -> MediaStreamConstraints {
    let result = MediaStreamConstraints::new();

    let audio_dict = js_sys::Object::new();
    let _ = Reflect::set(
        &audio_dict,
        &"echoCancellation".into(),
        &constraints.echo_cancellation.into(),
    );
    let _ = Reflect::set(
        &audio_dict,
        &"noiseSuppression".into(),
        &constraints.noise_suppression.into(),
    );
    let _ = Reflect::set(
        &audio_dict,
        &"autoGainControl".into(),
        &constraints.auto_gain_control.into(),
    );
    let _ = Reflect::set(
        &audio_dict,
        &"sampleRate".into(),
        &ideal_u32(constraints.ideal_sample_rate_hz),
    );
    result.audio(&audio_dict.into());

    if matches!(constraints.kind, MediaKind::Video) {
        let video_dict = js_sys::Object::new();
        let _ = Reflect::set(&video_dict, &"width".into(), &ideal_max_u32(constraints.ideal_width, constraints.max_width));
        let _ = Reflect::set(&video_dict, &"height".into(), &ideal_max_u32(constraints.ideal_height, constraints.max_height));
        let _ = Reflect::set(&video_dict, &"frameRate".into(), &ideal_u32(constraints.ideal_frame_rate));
        if constraints.facing_mode_user {
            let _ = Reflect::set(&video_dict, &"facingMode".into(), &JsValue::from_str("user"));
        }
        result.video(&video_dict.into());
    } else {
        result.video(&JsValue::FALSE);
    }

    result
}

fn ideal_u32(value: u32) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = Reflect::set(&obj, &"ideal".into(), &JsValue::from_f64(f64::from(value)));
    obj.into()
}

fn ideal_max_u32(ideal: u32, max: u32) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = Reflect::set(&obj, &"ideal".into(), &JsValue::from_f64(f64::from(ideal)));
    let _ = Reflect::set(&obj, &"max".into(), &JsValue::from_f64(f64::from(max)));
    obj.into()
}

/// Classifies a `getUserMedia` rejection into the error taxonomy from spec
/// §4.2, keyed on the DOM exception's `name`.
fn classify_get_user_media_error(err: JsValue) -> MediaError {
    let name = Reflect::get(&err, &"name".into())
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default();

    match name.as_str() {
        "NotAllowedError" | "SecurityError" => MediaError::PermissionDenied,
        "NotFoundError" | "OverconstrainedError" => MediaError::NoDevice,
        "NotReadableError" | "TrackStartError" => MediaError::DeviceInUse,
        _ => MediaError::Unsupported,
    }
}
