//! Session Watcher (C6, spec §4.6).
//!
//! Subscribes to out-of-band changes on the session document and turns
//! them into a small closed set of events C8 reacts to. Modeled on
//! `thaumic-core::sonos::subscription_arbiter`'s pattern of wrapping a
//! push-based subscription in a typed `Stream` the consumer can select
//! over alongside its own state machine, rather than registering ad-hoc
//! callbacks.

use async_trait::async_trait;
use futures::stream::Stream;

use crate::error::SessionError;
use crate::model::{SessionId, SessionStatus};

/// Events C6 emits to C8 on out-of-band session changes (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The document no longer exists.
    SessionRemoved,
    /// The document exists but `now > expiresAt`.
    SessionExpired,
    /// `status` changed to something the core did not itself write.
    StatusExternalChange(SessionStatus),
}

/// Platform contract for subscribing to session document changes.
/// Implemented in `apps/web/src-wasm::http_store`, typically backed by the
/// external platform's realtime/polling primitive.
#[async_trait(?Send)]
pub trait SessionSubscription {
    type Stream: Stream<Item = Result<WatchEvent, SessionError>> + Unpin;

    /// Opens a subscription for `session_id`. The returned stream yields
    /// one item per out-of-band change; it never yields for changes the
    /// core's own `DocumentStore::transition` calls caused.
    async fn watch(&self, session_id: &SessionId) -> Result<Self::Stream, SessionError>;
}

/// Whether a [`WatchEvent`] requires C8 to abort any in-progress recording
/// and uploads and show a terminal message (spec §4.6: "On
/// `session-removed` or `session-expired`, C8 must abort ... On
/// `status-external-change(completed|removed)`, the same abort path
/// runs.").
#[must_use]
pub fn requires_abort(event: &WatchEvent) -> bool {
    match event {
        WatchEvent::SessionRemoved | WatchEvent::SessionExpired => true,
        WatchEvent::StatusExternalChange(status) => {
            matches!(status, SessionStatus::Completed | SessionStatus::Removed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_and_expired_always_require_abort() {
        assert!(requires_abort(&WatchEvent::SessionRemoved));
        assert!(requires_abort(&WatchEvent::SessionExpired));
    }

    #[test]
    fn external_completed_or_removed_require_abort() {
        assert!(requires_abort(&WatchEvent::StatusExternalChange(
            SessionStatus::Completed
        )));
        assert!(requires_abort(&WatchEvent::StatusExternalChange(
            SessionStatus::Removed
        )));
    }

    #[test]
    fn external_recording_does_not_require_abort() {
        assert!(!requires_abort(&WatchEvent::StatusExternalChange(
            SessionStatus::Recording
        )));
    }
}
