//! recorder-core - platform-agnostic engine for the in-browser story
//! recording capture tab.
//!
//! This crate provides the data model, the state machine, and the error
//! and event types shared between the browser capture adapter
//! (`recorder-capture`) and the `wasm-bindgen` entry point
//! (`recorder-web`). It is designed so the same logic runs under a real
//! Tokio runtime (native tests) or under `wasm-bindgen-futures` (the
//! browser tab) without modification.
//!
//! # Architecture
//!
//! - [`model`]: the data model - `SessionId`, `Session`, `Chunk`, `Phase`,
//!   `RecorderRuntimeState`.
//! - [`link`]: Session Link Parser (C7).
//! - [`codec`]: Codec Selector (C1) preference policy.
//! - [`media`]: Media Acquirer (C2) contract.
//! - [`recorder`]: Chunked Recorder (C3).
//! - [`upload`]: Upload Manager (C4).
//! - [`session`]: Session Client (C5).
//! - [`watcher`]: Session Watcher (C6).
//! - [`controller`]: Recording Controller (C8) - the top-level state
//!   machine wiring C1-C7 together.
//! - [`events`]: typed event bus for surfacing controller progress to a UI.
//! - [`error`]: centralized error types.
//! - [`config`]: injectable timing/concurrency constants.
//! - [`runtime`]: task-spawning and clock abstractions for runtime
//!   independence and deterministic tests.
//!
//! # Abstraction traits
//!
//! The crate defines the seams a platform adapter must satisfy:
//!
//! - [`runtime::TaskSpawner`] / [`runtime::Clock`]: spawning background work
//!   and suspending, independent of the underlying executor.
//! - [`events::EventEmitter`]: emitting controller events without knowledge
//!   of transport.
//! - [`media::MediaAcquirer`] / [`codec::CodecProbe`]: acquiring a media
//!   stream and probing codec support.
//! - [`recorder::RecorderDriver`]: the low-level `MediaRecorder`-alike
//!   surface.
//! - [`upload::ObjectStore`] / [`session::DocumentStore`] /
//!   [`watcher::SessionSubscription`]: the external document-store and
//!   object-store facades.
//!
//! [`test_support`] provides in-memory fakes for all of the above.

pub mod codec;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod link;
pub mod media;
pub mod model;
pub mod recorder;
pub mod runtime;
pub mod session;
pub mod upload;
pub mod watcher;

#[cfg(test)]
pub mod test_support;
