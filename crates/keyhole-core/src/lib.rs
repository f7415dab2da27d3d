#![forbid(unsafe_code)]

//! Selector-keyed reactive state store.
//!
//! A thin publish/subscribe layer around a plain state value. Callers
//! `dispatch` actions to update the state and `select` keyed slices of it;
//! each selection is a channel that delivers a derived value only when it
//! actually changed.
//!
//! - [`Action`]: a kind tag plus an arbitrary payload.
//! - [`ReducerMap`] / [`combine_reducers`]: declare named reducers and
//!   combine them into one ordered fold.
//! - [`Store`]: owns the state; `dispatch` folds actions through the
//!   reducers and republishes derived values.
//! - [`Selection`] / [`Subscription`]: read and observe one channel.
//! - [`DevtoolsBridge`] / [`DevtoolsSink`]: optional, injected debugging
//!   tap fed after every dispatch.
//!
//! # Architecture
//!
//! State is a [`serde_json::Value`] replaced wholesale on each dispatch,
//! never mutated in place. Reducers return partial states that are
//! shallow-merged into the accumulator as the fold runs. Change detection
//! is structural equality on derived values, so consumers are only woken
//! for slices that really changed. Everything is single-threaded:
//! handles are `Rc`-based and not `Send`.
//!
//! # Invariants
//!
//! 1. The reducer fold runs in combination order and completes before any
//!    notification goes out.
//! 2. Channels are notified in registration order.
//! 3. No channel delivers two consecutive structurally-equal values.
//! 4. A fresh subscription first observes the value derived from the state
//!    at subscription time.
//! 5. Dropping a [`Subscription`] detaches its callback before the next
//!    publish cycle.

pub mod action;
pub mod channel;
pub mod devtools;
pub mod reducer;
pub mod store;

pub use action::Action;
pub use channel::{ChannelTable, Selection, SelectorFn, Subscription};
pub use devtools::{DevtoolsBridge, DevtoolsOptions, DevtoolsSink};
pub use reducer::{CombinedReducers, ReducerFn, ReducerMap, combine_reducers, shallow_merge};
pub use store::Store;

// State and payloads are plain JSON values; re-export the essentials so
// downstream crates need no direct serde_json dependency.
pub use serde_json::{Value, json};
