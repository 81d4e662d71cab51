//! Media Acquirer (C2, spec §4.2).
//!
//! The trait and constraint builder are platform-agnostic; the actual
//! `getUserMedia` call lives in `recorder-capture::media_acquirer`, which
//! implements [`MediaAcquirer`] against `web_sys::MediaDevices`. This is the
//! capture-side counterpart of `thaumic-core::sonos::traits`' pattern of
//! defining the contract in the core crate and letting a platform adapter
//! satisfy it.

use async_trait::async_trait;

use crate::error::MediaError;
use crate::model::MediaKind;

/// "Ideal, not exact" constraints for a media request (spec §4.2, "Quality
/// contract"). Devices without the ideal capability still produce a stream;
/// these are hints, not hard requirements.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaConstraints {
    pub kind: MediaKind,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub ideal_sample_rate_hz: u32,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub ideal_frame_rate: u32,
    pub facing_mode_user: bool,
}

impl MediaConstraints {
    /// Builds the constraint set for a given recording mode, matching the
    /// defaults in spec §4.2 exactly.
    #[must_use]
    pub fn for_kind(kind: MediaKind) -> Self {
        Self {
            kind,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            ideal_sample_rate_hz: 44_100,
            ideal_width: 1280,
            ideal_height: 720,
            max_width: 1920,
            max_height: 1080,
            ideal_frame_rate: 30,
            facing_mode_user: true,
        }
    }
}

/// A live media stream handle. Platform-opaque: `recorder-core` never
/// inspects the stream's contents, only passes it from [`MediaAcquirer`] to
/// the `RecorderDriver` (C3).
pub trait MediaStreamHandle {
    /// Stops every track on the stream, releasing camera/microphone
    /// hardware. Must be idempotent (spec §5, "Shared resources": "on
    /// `stop()` or `abort()` C3 must release every track").
    fn release(&self);
}

/// Requests a live media stream matching `constraints`.
///
/// Implementations must request permission just-in-time - only when this
/// method is called, never eagerly at construction (spec §4.2, "Side
/// effects"). The associated type keeps this core trait free of any
/// browser-specific stream type.
#[async_trait(?Send)]
pub trait MediaAcquirer {
    type Stream: MediaStreamHandle;

    async fn acquire(&self, constraints: &MediaConstraints) -> Result<Self::Stream, MediaError>;
}
