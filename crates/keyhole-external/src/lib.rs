#![forbid(unsafe_code)]

//! Observe an external state store through keyhole's selection surface.
//!
//! Some applications already own a state container (a redux-style store,
//! an embedded interpreter's state, a foreign runtime). This crate wraps
//! such a store behind the same `select`/`dispatch` surface the native
//! [`Store`] exposes, so UI code observes keyed, de-duplicated slices of
//! external state without caring where the state lives.
//!
//! - [`ExternalStore`]: the trait an external container implements
//!   (read state, dispatch, subscribe to updates).
//! - [`ObservedStore`]: the adapter republishing external updates through
//!   keyhole's channel mechanism.
//! - [`ExternalStoreError`]: fatal construction errors (a missing handle
//!   is a configuration error, not something to degrade around).
//!
//! [`Store`]: keyhole_core::Store

pub mod handle;
pub mod observed;

pub use handle::{ExternalStore, ExternalSubscription};
pub use observed::{ExternalStoreError, ObservedStore};
