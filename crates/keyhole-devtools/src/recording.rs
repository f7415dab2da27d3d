#![forbid(unsafe_code)]

//! In-memory recording sink.
//!
//! Captures bridge traffic as plain values so tests and tooling can assert
//! on exactly what the store reported, in order. The caller keeps its own
//! `Rc` to the sink and reads the log back after driving the store.

use std::cell::RefCell;
use std::fmt;

use keyhole_core::{DevtoolsOptions, DevtoolsSink};
use serde_json::Value;

/// One captured bridge call.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkEvent {
    /// The bridge came up: initial state and configured options.
    Init {
        state: Value,
        options: DevtoolsOptions,
    },
    /// One dispatch: action kind and the state it produced.
    Send { kind: String, state: Value },
}

/// Devtools sink accumulating every bridge call in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: RefCell<Vec<SinkEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.borrow().clone()
    }

    /// Action kinds of the captured send events, in arrival order.
    #[must_use]
    pub fn sent_kinds(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Send { kind, .. } => Some(kind.clone()),
                SinkEvent::Init { .. } => None,
            })
            .collect()
    }

    /// State carried by the most recent event, if any.
    #[must_use]
    pub fn last_state(&self) -> Option<Value> {
        self.events.borrow().last().map(|event| match event {
            SinkEvent::Init { state, .. } | SinkEvent::Send { state, .. } => state.clone(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl fmt::Debug for RecordingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSink")
            .field("events", &self.len())
            .finish()
    }
}

impl DevtoolsSink for RecordingSink {
    fn init(&self, initial_state: &Value, options: &DevtoolsOptions) {
        self.events.borrow_mut().push(SinkEvent::Init {
            state: initial_state.clone(),
            options: options.clone(),
        });
    }

    fn send(&self, action_kind: &str, state: &Value) {
        self.events.borrow_mut().push(SinkEvent::Send {
            kind: action_kind.to_string(),
            state: state.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
