#![forbid(unsafe_code)]

//! The store: state ownership, dispatch, selection.
//!
//! # Architecture
//!
//! [`Store`] owns the current state value plus everything around it: the
//! combined reducer fold, the selector channel table, and an optional
//! devtools bridge. `dispatch` is the only mutation path; everything else
//! reads snapshots. The handle is `Rc`-based and single-threaded: cloning
//! it creates another handle to the same store, not a copy of the state.
//!
//! # Invariants
//!
//! 1. A dispatch folds the action through every reducer in combination
//!    order; the final accumulator becomes the state before any
//!    notification goes out.
//! 2. Channels are notified in registration order, synchronously, within
//!    the dispatch call.
//! 3. A channel never delivers two consecutive structurally-equal values.
//! 4. A fresh subscription first observes the value derived from the state
//!    at subscription time.
//! 5. The devtools bridge sees `(action kind, new state)` after all
//!    subscribers were notified.
//!
//! # Failure Modes
//!
//! - **Reducer panic**: propagates unmodified out of `dispatch`. The store
//!   keeps the previous state — the fold result is assigned only after the
//!   whole fold succeeds. No rollback is needed and none exists.
//! - **Reentrant dispatch**: a subscriber callback calling `dispatch`
//!   panics with a descriptive message. Notification order under reentry
//!   has no sensible definition, so it is rejected outright.
//! - **Blank selector key**: warned and ignored; no channel is registered
//!   and nothing panics.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::action::Action;
use crate::channel::{ChannelTable, Selection};
use crate::devtools::DevtoolsBridge;
use crate::reducer::CombinedReducers;

struct StoreInner {
    state: Value,
    reducers: CombinedReducers,
    channels: ChannelTable,
    bridge: Option<DevtoolsBridge>,
}

/// Single-threaded reactive state container.
///
/// Cloning a `Store` creates a new handle to the **same** store.
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
    dispatching: Rc<Cell<bool>>,
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            dispatching: Rc::clone(&self.dispatching),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("state", &inner.state)
            .field("reducers", &inner.reducers)
            .field("channels", &inner.channels.len())
            .field("devtools", &inner.bridge.is_some())
            .finish()
    }
}

impl Store {
    /// Store without a devtools bridge.
    #[must_use]
    pub fn new(reducers: CombinedReducers, initial_state: Value) -> Self {
        Self::build(reducers, initial_state, None)
    }

    /// Store reporting every dispatch to `bridge`.
    #[must_use]
    pub fn with_devtools(
        reducers: CombinedReducers,
        initial_state: Value,
        bridge: DevtoolsBridge,
    ) -> Self {
        Self::build(reducers, initial_state, Some(bridge))
    }

    fn build(
        reducers: CombinedReducers,
        initial_state: Value,
        bridge: Option<DevtoolsBridge>,
    ) -> Self {
        tracing::debug!(reducers = reducers.len(), "store created");
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                state: initial_state,
                reducers,
                channels: ChannelTable::new(),
                bridge,
            })),
            dispatching: Rc::new(Cell::new(false)),
        }
    }

    /// Register interest in `selector(state)` under `key`.
    ///
    /// Returns `None` (with a warning, never a panic) when the key is
    /// blank. For a new key the channel is seeded with the selector applied
    /// to the current state; for an existing key the returned [`Selection`]
    /// shares the existing channel and `selector` is discarded.
    #[must_use]
    pub fn select(
        &self,
        key: impl Into<String>,
        selector: impl Fn(&Value) -> Value + 'static,
    ) -> Option<Selection> {
        let inner = self.inner.borrow();
        inner.channels.register(key, selector, &inner.state)
    }

    /// Apply `action`: fold it through the combined reducers, publish the
    /// result to the selector channels, then inform the devtools bridge.
    ///
    /// The fold runs in combination order; each reducer receives the
    /// accumulator so far, and its partial return is shallow-merged into
    /// that accumulator. The final accumulator becomes the new state before
    /// any notification goes out. Notification is a synchronous push and
    /// completes before `dispatch` returns.
    ///
    /// # Panics
    ///
    /// - When called reentrantly from a subscriber callback; reentrant
    ///   dispatch is disallowed.
    /// - A panic raised inside a reducer propagates unmodified; the store
    ///   keeps the previous state.
    pub fn dispatch(&self, action: Action) {
        assert!(
            !self.dispatching.get(),
            "reentrant dispatch: dispatch called from inside a subscriber notification"
        );
        let _guard = DispatchGuard::engage(&self.dispatching);

        let (snapshot, channels, bridge) = {
            let mut inner = self.inner.borrow_mut();
            let next = inner.reducers.apply(&inner.state, &action);
            inner.state = next.clone();
            (next, inner.channels.clone(), inner.bridge.clone())
        };

        // Inner borrow is released: callbacks may select() freely.
        channels.publish(&snapshot);
        if let Some(bridge) = &bridge {
            bridge.send(&action.kind, &snapshot);
        }
    }
}

/// Clears the reentrancy flag even when a reducer or subscriber panics.
struct DispatchGuard {
    flag: Rc<Cell<bool>>,
}

impl DispatchGuard {
    fn engage(flag: &Rc<Cell<bool>>) -> Self {
        flag.set(true);
        Self {
            flag: Rc::clone(flag),
        }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
