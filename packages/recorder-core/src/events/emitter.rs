//! Event emitter abstraction for decoupling the controller from transport.
//!
//! The controller depends on [`EventEmitter`] rather than a concrete
//! channel, so the same core logic drives a native test harness, a logging
//! sink, or the browser's JS-callback bridge interchangeably.

use super::ControllerEvent;

/// Trait for emitting controller events without knowledge of transport.
///
/// Not `Send + Sync`: the controller and everything reachable from it runs
/// on a single task (native tests use a `tokio::task::LocalSet`; the browser
/// is inherently single-threaded), so emitters may hold non-`Send` state
/// such as a `js_sys::Function` callback.
pub trait EventEmitter {
    /// Emits a controller event.
    fn emit(&self, event: ControllerEvent);
}

/// No-op emitter, useful when a collaborator is constructed without a UI to
/// report to (for example in a unit test exercising only one component).
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: ControllerEvent) {}
}

/// Logs every event at debug level. Used during development and by tests
/// that want to see the event stream without asserting on it.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit(&self, event: ControllerEvent) {
        tracing::debug!(?event, "controller_event");
    }
}
