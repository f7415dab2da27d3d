#![forbid(unsafe_code)]

//! The adapter: keyhole's surface over an external store.
//!
//! # Architecture
//!
//! [`ObservedStore`] holds a handle to the external container and two
//! channel registries: one for caller selections (keyed, de-duplicated,
//! exactly like the native store's) and a private one carrying the full
//! post-update state for [`ObservedStore::observe`]. An observer attached
//! to the external store at wrap time republishes every external update
//! through both registries, so out-of-band updates reach selectors the same
//! way adapter dispatches do.
//!
//! Dispatches forwarded through the adapter additionally re-read the
//! external state and republish it — external stores that do not notify on
//! dispatch still converge, and channel de-duplication absorbs the double
//! publish for stores that do. Only adapter dispatches carry an action kind
//! to the devtools bridge; out-of-band updates cannot be attributed and are
//! not forwarded.
//!
//! # Invariants
//!
//! 1. A selection's first value is its selector applied to the external
//!    state at registration time.
//! 2. No channel delivers two consecutive structurally-equal values, no
//!    matter how often the external store notifies.
//! 3. The adapter never mutates external state except through
//!    [`ExternalStore::dispatch`].

use std::fmt;
use std::rc::Rc;

use keyhole_core::{
    Action, ChannelTable, DevtoolsBridge, DevtoolsOptions, DevtoolsSink, Selection, Subscription,
    Value,
};

use crate::handle::{ExternalStore, ExternalSubscription};

/// Key of the private full-state channel; lives in its own registry, so it
/// cannot collide with caller selection keys.
const STATE_FEED_KEY: &str = "state";

/// Fatal configuration errors raised while wrapping an external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStoreError {
    /// No external store handle was supplied.
    Missing,
}

impl fmt::Display for ExternalStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "no external store handle was supplied"),
        }
    }
}

impl std::error::Error for ExternalStoreError {}

/// Keyed, de-duplicated selection surface over an external store.
///
/// Cloning an `ObservedStore` creates a new handle to the **same** adapter.
pub struct ObservedStore {
    external: Rc<dyn ExternalStore>,
    selections: ChannelTable,
    state_table: ChannelTable,
    state_feed: Selection,
    bridge: DevtoolsBridge,
    /// Kept alive so the external observer stays attached for as long as
    /// any adapter handle exists.
    _external_sub: Rc<ExternalSubscription>,
}

impl Clone for ObservedStore {
    fn clone(&self) -> Self {
        Self {
            external: Rc::clone(&self.external),
            selections: self.selections.clone(),
            state_table: self.state_table.clone(),
            state_feed: self.state_feed.clone(),
            bridge: self.bridge.clone(),
            _external_sub: Rc::clone(&self._external_sub),
        }
    }
}

impl fmt::Debug for ObservedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservedStore")
            .field("selections", &self.selections.len())
            .field("devtools", &self.bridge.is_connected())
            .finish_non_exhaustive()
    }
}

impl ObservedStore {
    /// Wrap an external store without devtools.
    ///
    /// A missing handle is a fatal configuration error
    /// ([`ExternalStoreError::Missing`]), not something to degrade around.
    pub fn wrap(handle: Option<Rc<dyn ExternalStore>>) -> Result<Self, ExternalStoreError> {
        let handle = handle.ok_or(ExternalStoreError::Missing)?;
        Ok(Self::build(handle, DevtoolsBridge::inert()))
    }

    /// Wrap an external store and report adapter dispatches to a devtools
    /// sink.
    ///
    /// The sink is initialized with the external store's current state; an
    /// absent sink leaves the bridge inert (reported, non-fatal).
    pub fn wrap_with_devtools(
        handle: Option<Rc<dyn ExternalStore>>,
        sink: Option<Rc<dyn DevtoolsSink>>,
        options: &DevtoolsOptions,
    ) -> Result<Self, ExternalStoreError> {
        let handle = handle.ok_or(ExternalStoreError::Missing)?;
        let bridge = DevtoolsBridge::connect(sink, &handle.state(), options);
        Ok(Self::build(handle, bridge))
    }

    fn build(external: Rc<dyn ExternalStore>, bridge: DevtoolsBridge) -> Self {
        let selections = ChannelTable::new();
        let state_table = ChannelTable::new();
        let initial = external.state();
        let state_feed = state_table
            .register(STATE_FEED_KEY, |state| state.clone(), &initial)
            .expect("state feed key is never blank");

        let republish_selections = selections.clone();
        let republish_states = state_table.clone();
        let external_sub = external.subscribe(Box::new(move |state| {
            republish_selections.publish(state);
            republish_states.publish(state);
        }));

        tracing::debug!(devtools = bridge.is_connected(), "external store wrapped");
        Self {
            external,
            selections,
            state_table,
            state_feed,
            bridge,
            _external_sub: Rc::new(external_sub),
        }
    }

    /// Register interest in `selector(external state)` under `key`.
    ///
    /// Same contract as the native store: a blank key is warned about and
    /// yields `None`; an existing key shares its channel and keeps the
    /// first registration's selector.
    #[must_use]
    pub fn select(
        &self,
        key: impl Into<String>,
        selector: impl Fn(&Value) -> Value + 'static,
    ) -> Option<Selection> {
        self.selections.register(key, selector, &self.external.state())
    }

    /// Forward `action` into the external store, republish the resulting
    /// state, then inform the devtools bridge with the action kind.
    pub fn dispatch(&self, action: Action) {
        self.external.dispatch(&action);
        let state = self.external.state();
        self.selections.publish(&state);
        self.state_table.publish(&state);
        self.bridge.send(&action.kind, &state);
    }

    /// Subscribe to the full post-update state stream.
    ///
    /// The callback is invoked immediately with the current state, then
    /// once per structurally-distinct update, after all selection channels
    /// were notified.
    pub fn observe(&self, callback: impl Fn(&Value) + 'static) -> Subscription {
        self.state_feed.subscribe(callback)
    }

    /// Snapshot of the last republished external state.
    #[must_use]
    pub fn state(&self) -> Value {
        self.state_feed.get()
    }

    /// The wrapped external store handle.
    #[must_use]
    pub fn external(&self) -> Rc<dyn ExternalStore> {
        Rc::clone(&self.external)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use tracing_test::traced_test;

    type Listener = Rc<dyn Fn(&Value)>;

    /// Redux-shaped external store: object state, `dispatch` stores the
    /// payload under the action kind, subscribers hear every dispatch.
    struct ReduxMock {
        state: Rc<RefCell<Value>>,
        listeners: Rc<RefCell<Vec<(u64, Listener)>>>,
        next_listener: Cell<u64>,
        /// Redux notifies on every dispatch; flip off to model stores that
        /// update silently.
        notify_on_dispatch: bool,
    }

    impl ReduxMock {
        fn new(initial: Value) -> Rc<Self> {
            Rc::new(Self {
                state: Rc::new(RefCell::new(initial)),
                listeners: Rc::new(RefCell::new(Vec::new())),
                next_listener: Cell::new(0),
                notify_on_dispatch: true,
            })
        }

        fn silent(initial: Value) -> Rc<Self> {
            Rc::new(Self {
                state: Rc::new(RefCell::new(initial)),
                listeners: Rc::new(RefCell::new(Vec::new())),
                next_listener: Cell::new(0),
                notify_on_dispatch: false,
            })
        }

        /// Out-of-band update: mutate state and notify, bypassing dispatch.
        fn set(&self, key: &str, value: Value) {
            self.state.borrow_mut()[key] = value;
            self.notify();
        }

        fn notify(&self) {
            let state = self.state.borrow().clone();
            let listeners: Vec<Listener> = self
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&state);
            }
        }

        fn listener_count(&self) -> usize {
            self.listeners.borrow().len()
        }
    }

    impl ExternalStore for ReduxMock {
        fn state(&self) -> Value {
            self.state.borrow().clone()
        }

        fn dispatch(&self, action: &Action) {
            if action.kind != "noop" {
                self.state.borrow_mut()[action.kind.as_str()] = action.payload.clone();
            }
            if self.notify_on_dispatch {
                self.notify();
            }
        }

        fn subscribe(&self, observer: Box<dyn Fn(&Value)>) -> ExternalSubscription {
            let id = self.next_listener.get();
            self.next_listener.set(id + 1);
            self.listeners.borrow_mut().push((id, Rc::from(observer)));
            let listeners = Rc::clone(&self.listeners);
            ExternalSubscription::new(move || {
                listeners.borrow_mut().retain(|(other, _)| *other != id);
            })
        }
    }

    /// Test sink recording the action kinds it saw.
    #[derive(Default)]
    struct KindSink {
        kinds: RefCell<Vec<String>>,
        initialized_with: RefCell<Option<Value>>,
    }

    impl DevtoolsSink for KindSink {
        fn init(&self, initial_state: &Value, _options: &DevtoolsOptions) {
            *self.initialized_with.borrow_mut() = Some(initial_state.clone());
        }

        fn send(&self, action_kind: &str, _state: &Value) {
            self.kinds.borrow_mut().push(action_kind.to_string());
        }
    }

    fn wrap_mock(mock: &Rc<ReduxMock>) -> ObservedStore {
        ObservedStore::wrap(Some(Rc::clone(mock) as Rc<dyn ExternalStore>))
            .expect("handle supplied")
    }

    #[test]
    fn missing_handle_is_a_fatal_configuration_error() {
        let result = ObservedStore::wrap(None);
        assert_eq!(result.unwrap_err(), ExternalStoreError::Missing);
        assert_eq!(
            ExternalStoreError::Missing.to_string(),
            "no external store handle was supplied"
        );
    }

    #[test]
    fn adapter_dispatch_moves_selections() {
        let mock = ReduxMock::new(json!({}));
        let store = wrap_mock(&mock);
        let slice = store.select("user", |s| s["user"].clone()).unwrap();
        assert_eq!(slice.get(), Value::Null);

        store.dispatch(Action::new("user", json!({"name": "ada"})));
        assert_eq!(slice.get(), json!({"name": "ada"}));
        assert_eq!(store.state(), json!({"user": {"name": "ada"}}));
    }

    #[test]
    fn out_of_band_updates_reach_selections_without_devtools_attribution() {
        let mock = ReduxMock::new(json!({"n": 0}));
        let sink = Rc::new(KindSink::default());
        let store = ObservedStore::wrap_with_devtools(
            Some(Rc::clone(&mock) as Rc<dyn ExternalStore>),
            Some(Rc::clone(&sink) as Rc<dyn DevtoolsSink>),
            &DevtoolsOptions::new(),
        )
        .unwrap();
        assert_eq!(*sink.initialized_with.borrow(), Some(json!({"n": 0})));

        let n = store.select("n", |s| s["n"].clone()).unwrap();
        mock.set("n", json!(7)); // bypasses the adapter
        assert_eq!(n.get(), json!(7));
        assert!(sink.kinds.borrow().is_empty(), "no kind to attribute");

        store.dispatch(Action::new("n", json!(8)));
        assert_eq!(n.get(), json!(8));
        assert_eq!(*sink.kinds.borrow(), vec!["n".to_string()]);
    }

    #[test]
    fn silent_external_store_still_converges() {
        let mock = ReduxMock::silent(json!({}));
        let store = wrap_mock(&mock);
        let slice = store.select("k", |s| s["k"].clone()).unwrap();

        // The mock never notifies; the adapter's post-dispatch re-read
        // carries the update.
        store.dispatch(Action::new("k", json!(1)));
        assert_eq!(slice.get(), json!(1));
    }

    #[test]
    fn observe_carries_full_states_and_dedups() {
        let mock = ReduxMock::new(json!({"n": 0}));
        let store = wrap_mock(&mock);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _sub = store.observe(move |state| log.borrow_mut().push(state.clone()));

        store.dispatch(Action::new("n", json!(1)));
        store.dispatch(Action::bare("noop")); // state unchanged, mock notifies anyway
        store.dispatch(Action::new("n", json!(2)));

        assert_eq!(
            *seen.borrow(),
            vec![json!({"n": 0}), json!({"n": 1}), json!({"n": 2})]
        );
    }

    #[test]
    fn double_notification_is_absorbed_by_dedup() {
        // notify_on_dispatch + the adapter's re-read publish the same state
        // twice per dispatch; channels must deliver it once.
        let mock = ReduxMock::new(json!({}));
        let store = wrap_mock(&mock);
        let slice = store.select("k", |s| s["k"].clone()).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _sub = slice.subscribe(move |value| log.borrow_mut().push(value.clone()));

        store.dispatch(Action::new("k", json!(1)));
        assert_eq!(*seen.borrow(), vec![Value::Null, json!(1)]);
    }

    #[traced_test]
    #[test]
    fn blank_selection_key_is_rejected() {
        let mock = ReduxMock::new(json!({}));
        let store = wrap_mock(&mock);
        assert!(store.select("  ", |s| s.clone()).is_none());
        assert!(logs_contain("selector key is blank"));
    }

    #[test]
    fn cloned_handles_share_channels() {
        let mock = ReduxMock::new(json!({}));
        let store = wrap_mock(&mock);
        let other = store.clone();
        let slice = other.select("k", |s| s["k"].clone()).unwrap();

        store.dispatch(Action::new("k", json!(3)));
        assert_eq!(slice.get(), json!(3));
    }

    #[test]
    fn dropping_every_handle_detaches_the_external_observer() {
        let mock = ReduxMock::new(json!({}));
        let store = wrap_mock(&mock);
        let clone = store.clone();
        assert_eq!(mock.listener_count(), 1);

        drop(store);
        assert_eq!(mock.listener_count(), 1, "a live handle keeps it attached");
        drop(clone);
        assert_eq!(mock.listener_count(), 0);
    }
}
