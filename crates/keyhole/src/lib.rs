#![forbid(unsafe_code)]

//! Keyhole public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users: the
//! factory that builds stores from reducers and options, the explicit
//! context that replaces a hidden global singleton, and re-exports of the
//! member crates.
//!
//! ```
//! use keyhole::{Action, ReducerMap, StoreContext, StoreOptions, combine_reducers};
//! use keyhole::{Value, create_store, json};
//!
//! let reducers = combine_reducers(ReducerMap::new().with_reducer("test", |acc, action| {
//!     if action.kind == "test" {
//!         json!({"test": keyhole::shallow_merge(acc["test"].clone(), action.payload.clone())})
//!     } else {
//!         Value::Null
//!     }
//! }));
//!
//! let context = StoreContext::new();
//! let store = create_store(&context, reducers, json!({}), StoreOptions::default());
//! let slice = store.select("test", |s| s["test"].clone()).unwrap();
//!
//! store.dispatch(Action::new("test", json!({"x": 1})));
//! assert_eq!(slice.get(), json!({"x": 1}));
//! ```

pub mod factory;

pub use factory::{StoreContext, StoreOptions, create_store, observe_external_store};

pub use keyhole_core::{
    Action, CombinedReducers, DevtoolsBridge, DevtoolsOptions, DevtoolsSink, ReducerMap,
    Selection, Store, Subscription, Value, combine_reducers, json, shallow_merge,
};
pub use keyhole_external::{ExternalStore, ExternalStoreError, ObservedStore};

pub mod prelude {
    pub use keyhole_core as core;
    pub use keyhole_devtools as devtools;
    pub use keyhole_external as external;

    pub use crate::factory::{StoreContext, StoreOptions, create_store, observe_external_store};
}
