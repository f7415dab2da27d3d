#![forbid(unsafe_code)]

//! Concrete devtools sinks for the keyhole store.
//!
//! The core crate defines the [`DevtoolsSink`] seam and stays agnostic about
//! where bridge traffic ends up. This crate supplies the two backends a
//! store debugger actually needs:
//!
//! - [`JsonlSink`]: one JSON object per line to any `io::Write`, for offline
//!   inspection of a dispatch history.
//! - [`RecordingSink`]: an in-memory log of bridge traffic, for tests and
//!   tooling that want to assert on what the store reported.
//!
//! [`DevtoolsSink`]: keyhole_core::DevtoolsSink

pub mod jsonl;
pub mod recording;

pub use jsonl::JsonlSink;
pub use recording::{RecordingSink, SinkEvent};
