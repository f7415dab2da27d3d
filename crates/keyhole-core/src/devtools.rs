#![forbid(unsafe_code)]

//! Bridge to an injected debugging sink.
//!
//! # Design
//!
//! The store never probes its environment for a debugger. A
//! [`DevtoolsSink`] implementation is injected at construction time;
//! [`DevtoolsBridge::connect`] either wires it up (calling `init` with the
//! initial state) or, when none is installed, reports the absence once and
//! returns an inert bridge whose `send` is a no-op. Either way the store
//! can call `send` unconditionally after each dispatch.
//!
//! The bridge is purely observational: nothing it does influences
//! dispatched state, and a misbehaving sink can at worst panic.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// Debugging backend receiving store traffic.
pub trait DevtoolsSink {
    /// Called once at connection time with the store's initial state and
    /// the configured options, forwarded verbatim.
    fn init(&self, initial_state: &Value, options: &DevtoolsOptions);

    /// Called after every dispatch, after subscriber notification, with the
    /// action kind and the state it produced.
    fn send(&self, action_kind: &str, state: &Value);
}

/// Options forwarded verbatim to the sink at connection time.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DevtoolsOptions {
    /// Display name for the store instance.
    pub name: Option<String>,
    /// How many dispatches the sink should retain, if it buffers.
    pub max_age: Option<u32>,
}

impl DevtoolsOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Live or inert connection to a [`DevtoolsSink`].
pub struct DevtoolsBridge {
    sink: Option<Rc<dyn DevtoolsSink>>,
}

impl Clone for DevtoolsBridge {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl fmt::Debug for DevtoolsBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevtoolsBridge")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl DevtoolsBridge {
    /// Connect to an injected sink.
    ///
    /// With a sink, calls `init(initial_state, options)` and returns a live
    /// bridge. Without one, reports the absence (non-fatal) and returns an
    /// inert bridge; further calls are no-ops.
    #[must_use]
    pub fn connect(
        sink: Option<Rc<dyn DevtoolsSink>>,
        initial_state: &Value,
        options: &DevtoolsOptions,
    ) -> Self {
        match sink {
            Some(sink) => {
                sink.init(initial_state, options);
                Self { sink: Some(sink) }
            }
            None => {
                tracing::error!("devtools enabled but no sink is installed; bridge is inert");
                Self { sink: None }
            }
        }
    }

    /// A bridge that ignores all traffic.
    #[must_use]
    pub fn inert() -> Self {
        Self { sink: None }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Forward one dispatched action kind and the state it produced.
    pub fn send(&self, action_kind: &str, state: &Value) {
        if let Some(sink) = &self.sink {
            tracing::trace!(kind = action_kind, "devtools send");
            sink.send(action_kind, state);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
