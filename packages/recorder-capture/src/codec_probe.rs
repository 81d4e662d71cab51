//! Implements [`recorder_core::codec::CodecProbe`] against the real
//! `MediaRecorder.isTypeSupported` static method.

use recorder_core::codec::CodecProbe;

/// Probes codec support via `web_sys::MediaRecorder::is_type_supported`.
/// Stateless - constructed fresh wherever a probe is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebCodecProbe;

impl CodecProbe for WebCodecProbe {
    fn is_supported(&self, descriptor: &str) -> bool {
        web_sys::MediaRecorder::is_type_supported(descriptor)
    }
}
