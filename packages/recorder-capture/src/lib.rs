//! recorder-capture - browser-platform adapter.
//!
//! Implements `recorder-core`'s capture-side traits
//! ([`recorder_core::codec::CodecProbe`], [`recorder_core::media::MediaAcquirer`],
//! [`recorder_core::recorder::RecorderDriver`]) against the real
//! `web_sys::MediaDevices`/`MediaRecorder` APIs, plus a DOM
//! `visibilitychange` listener feeding the controller's auto-pause path.
//! Corresponds to `thaumic-capture`, which adapted the same core traits to
//! WASAPI on Windows; here they are adapted to the browser instead.

pub mod codec_probe;
pub mod media_acquirer;
pub mod recorder_driver;
pub mod visibility;

pub use codec_probe::WebCodecProbe;
pub use media_acquirer::WebMediaAcquirer;
pub use recorder_driver::{WebMediaStreamHandle, WebRecorderDriver};
pub use visibility::VisibilityWatcher;
