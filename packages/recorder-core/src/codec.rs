//! Codec Selector (C1, spec §4.1).
//!
//! The preference tables and the `first_supported` policy are pure and
//! platform-independent; only the probe itself needs a browser. This
//! mirrors how `thaumic-core::sonos::discovery` keeps protocol-level
//! decision logic separate from `thaumic-capture`'s OS-specific device
//! enumeration - `recorder-capture::codec_probe` is this crate's analogue
//! of that platform shim, implementing [`CodecProbe`] against
//! `web_sys::MediaRecorder::is_type_supported`.

use crate::error::CodecError;
use crate::model::MediaKind;

/// Platform probe for container/codec descriptor support.
///
/// A no-op "always true" implementation would make [`first_supported`]
/// trivially pick the highest-preference descriptor, which is exactly what
/// tests that don't care about codec fallback behavior want; a fake that
/// rejects everything but one entry exercises the fallback chain (spec §8
/// scenario 2, "Runtime without MP4").
pub trait CodecProbe {
    /// Returns whether the runtime's media recorder can produce the given
    /// MIME type descriptor (which may include a `codecs=` parameter).
    fn is_supported(&self, descriptor: &str) -> bool;
}

/// Audio preference order, highest first (spec §4.1). The final `""` entry
/// asks the runtime for its default container/codec.
pub const AUDIO_PREFERENCE: &[&str] = &[
    "audio/mp4;codecs=mp4a.40.2",
    "audio/mp4",
    "audio/webm;codecs=opus",
    "audio/webm",
    "",
];

/// Video preference order, highest first (spec §4.1).
pub const VIDEO_PREFERENCE: &[&str] = &[
    "video/mp4;codecs=h264",
    "video/mp4",
    "video/webm;codecs=vp8",
    "video/webm",
    "",
];

/// File extension associated with a chosen descriptor, derived from its
/// MIME type prefix (used to build deterministic object paths per spec §3
/// "ChunkObjectPath").
#[must_use]
pub fn extension_for(descriptor: &str) -> &'static str {
    if descriptor.starts_with("audio/mp4") || descriptor.starts_with("video/mp4") {
        "mp4"
    } else if descriptor.starts_with("audio/webm") || descriptor.starts_with("video/webm") {
        "webm"
    } else {
        // Runtime-default probe ("") succeeded; webm is the broadest-support
        // fallback container across browsers that lack MP4 recording.
        "webm"
    }
}

/// A chosen container/codec descriptor plus its file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecDescriptor {
    pub mime_type: String,
    pub extension: &'static str,
}

/// Walks the preference table for `kind` in order and returns the first
/// descriptor the probe accepts. Fails with `UnsupportedCodec` only when
/// probing the empty-string runtime-default entry is also rejected (spec
/// §4.1: "Fails ... only when probing the empty string is also rejected").
pub fn first_supported(
    kind: MediaKind,
    probe: &impl CodecProbe,
) -> Result<CodecDescriptor, CodecError> {
    let table = match kind {
        MediaKind::Audio => AUDIO_PREFERENCE,
        MediaKind::Video => VIDEO_PREFERENCE,
    };

    for &descriptor in table {
        if probe.is_supported(descriptor) {
            return Ok(CodecDescriptor {
                mime_type: descriptor.to_string(),
                extension: extension_for(descriptor),
            });
        }
    }

    Err(CodecError::UnsupportedCodec)
}
