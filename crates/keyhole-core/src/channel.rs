#![forbid(unsafe_code)]

//! Selector-keyed notification channels.
//!
//! # Architecture
//!
//! [`ChannelTable`] is the fan-out half of the store: a registry of
//! channels, one per selector key, each remembering the last value it
//! emitted. Registering a key computes the selector against the current
//! state and seeds the channel with the result. Publishing a new state
//! recomputes every channel's selector and delivers the value to that
//! channel's subscribers only if it differs structurally from the last
//! emission.
//!
//! The table uses `Rc<RefCell<..>>` for single-threaded shared ownership,
//! so handles are cheap to clone and none of this is `Send`. Subscribers
//! are stored as `Weak` callbacks and cleaned up lazily during publish;
//! [`Subscription`] is the RAII guard that keeps a callback alive.
//!
//! # Invariants
//!
//! 1. One channel per key: a second registration under an existing key
//!    returns a handle to the existing channel, and the first
//!    registration's selector stays in effect.
//! 2. Channels are notified in registration order.
//! 3. A channel never delivers two consecutive structurally-equal values
//!    (`serde_json::Value` equality, which is deep).
//! 4. A fresh subscription is immediately delivered the channel's current
//!    value, computed no earlier than registration time.
//! 5. Dropping a [`Subscription`] detaches its callback before the next
//!    publish cycle.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use serde_json::Value;

/// A selector: pure function from full state to a derived value.
pub type SelectorFn = Box<dyn Fn(&Value) -> Value>;

type SubscriberFn = dyn Fn(&Value);

/// One selector's channel: the selector, the last emitted value, and the
/// attached subscribers.
struct ChannelEntry {
    key: String,
    selector: SelectorFn,
    /// Last emitted derived value; always structurally equal to
    /// `selector(state)` for the most recently published state.
    last: Value,
    /// Weak so that dropping a [`Subscription`] detaches the callback.
    subscribers: Vec<Weak<SubscriberFn>>,
}

#[derive(Default)]
struct TableInner {
    /// Channels in registration order, which is also notification order.
    entries: Vec<Rc<RefCell<ChannelEntry>>>,
    /// Key to slot in `entries`.
    index: AHashMap<String, usize>,
}

/// Registry of selector-keyed channels.
///
/// Cloning a `ChannelTable` creates a new handle to the **same** registry.
#[derive(Default)]
pub struct ChannelTable {
    inner: Rc<RefCell<TableInner>>,
}

impl Clone for ChannelTable {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ChannelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelTable")
            .field("keys", &self.keys())
            .finish()
    }
}

impl ChannelTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `selector(state)` under `key`.
    ///
    /// Returns `None` (with a warning, never a panic) when the key is
    /// blank, so a bad registration cannot break channels registered
    /// elsewhere. For a new key the channel is seeded with
    /// `selector(state)`; for an existing key the returned [`Selection`]
    /// shares the existing channel and `selector` is discarded.
    ///
    /// # Panics
    ///
    /// Panics if `selector` re-enters this table. Selectors must be pure.
    #[must_use]
    pub fn register(
        &self,
        key: impl Into<String>,
        selector: impl Fn(&Value) -> Value + 'static,
        state: &Value,
    ) -> Option<Selection> {
        let key = key.into();
        if key.trim().is_empty() {
            tracing::warn!("selector key is blank; select ignored");
            return None;
        }

        let mut table = self.inner.borrow_mut();
        if let Some(&slot) = table.index.get(&key) {
            return Some(Selection {
                entry: Rc::clone(&table.entries[slot]),
            });
        }

        let entry = Rc::new(RefCell::new(ChannelEntry {
            last: selector(state),
            selector: Box::new(selector),
            key: key.clone(),
            subscribers: Vec::new(),
        }));
        let slot = table.entries.len();
        table.index.insert(key, slot);
        table.entries.push(Rc::clone(&entry));
        Some(Selection { entry })
    }

    /// Recompute every channel against `state` and deliver changed values.
    ///
    /// Channels are visited in registration order. A channel delivers only
    /// when the recomputed value differs structurally from its last
    /// emission; dead subscriber slots are pruned along the way. Delivery
    /// is a synchronous push and completes before `publish` returns.
    pub fn publish(&self, state: &Value) {
        // Snapshot the entry handles so callbacks may register new
        // channels without holding the table borrow.
        let entries: Vec<Rc<RefCell<ChannelEntry>>> = self.inner.borrow().entries.clone();

        for entry in entries {
            let staged = {
                let mut entry = entry.borrow_mut();
                let next = (entry.selector)(state);
                if next == entry.last {
                    None
                } else {
                    entry.last = next.clone();
                    let mut live: Vec<Rc<SubscriberFn>> =
                        Vec::with_capacity(entry.subscribers.len());
                    entry.subscribers.retain(|weak| match weak.upgrade() {
                        Some(subscriber) => {
                            live.push(subscriber);
                            true
                        }
                        None => false,
                    });
                    Some((next, live))
                }
            };
            // Entry borrow is released before callbacks run, so a callback
            // may read its own selection.
            if let Some((value, subscribers)) = staged {
                for subscriber in subscribers {
                    (*subscriber)(&value);
                }
            }
        }
    }

    /// Registered keys in registration order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|entry| entry.borrow().key.clone())
            .collect()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().index.contains_key(key)
    }

    /// Number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

/// Handle to one channel: read the current derived value, attach
/// subscribers.
///
/// Cloning a `Selection` creates a new handle to the **same** channel.
pub struct Selection {
    entry: Rc<RefCell<ChannelEntry>>,
}

impl Clone for Selection {
    fn clone(&self) -> Self {
        Self {
            entry: Rc::clone(&self.entry),
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.entry.borrow();
        f.debug_struct("Selection")
            .field("key", &entry.key)
            .field("last", &entry.last)
            .field("subscribers", &entry.subscribers.len())
            .finish()
    }
}

impl Selection {
    /// Key this channel is registered under.
    #[must_use]
    pub fn key(&self) -> String {
        self.entry.borrow().key.clone()
    }

    /// Current derived value (a snapshot; the channel keeps its own copy).
    #[must_use]
    pub fn get(&self) -> Value {
        self.entry.borrow().last.clone()
    }

    /// Attach a subscriber.
    ///
    /// The callback is invoked immediately with the channel's current
    /// value, then once per published change. Dropping the returned
    /// [`Subscription`] detaches it.
    pub fn subscribe(&self, callback: impl Fn(&Value) + 'static) -> Subscription {
        let callback: Rc<SubscriberFn> = Rc::new(callback);
        self.entry
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        let current = self.entry.borrow().last.clone();
        (*callback)(&current);
        Subscription {
            _callback: callback,
        }
    }

    /// Number of live subscribers on this channel.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.entry
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

/// RAII guard keeping one subscriber callback attached to a channel.
///
/// Dropping the guard detaches the callback; the dead slot is pruned
/// during the next publish.
pub struct Subscription {
    _callback: Rc<SubscriberFn>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
