#![forbid(unsafe_code)]

//! Store construction: options, context, factory functions.
//!
//! # Design
//!
//! The factory replaces a hidden module-global singleton with an explicit
//! [`StoreContext`] the caller owns. Callers who want process-wide sharing
//! hold one context and pass it to every construction call; callers who
//! want isolation use a fresh context (or `use_singleton: false`). Nothing
//! here touches global state.
//!
//! Two construction paths exist:
//!
//! - [`create_store`]: build a native [`Store`] from combined reducers and
//!   an initial state.
//! - [`observe_external_store`]: wrap an already-constructed
//!   [`ExternalStore`] handle behind the same selection surface.
//!
//! # Invariants
//!
//! 1. With `use_singleton: true`, the first call on a context builds the
//!    instance and every later call on the same context returns that same
//!    instance, regardless of arguments.
//! 2. With `use_singleton: false`, every call returns a fresh, independent
//!    instance and the context cache is neither read nor written.
//! 3. For the external variant, handle validation precedes the cache
//!    lookup: a missing handle fails even when a cached instance exists.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use keyhole_core::{CombinedReducers, DevtoolsBridge, DevtoolsOptions, DevtoolsSink, Store, Value};
use keyhole_external::{ExternalStore, ExternalStoreError, ObservedStore};

/// Recognized store construction options.
#[derive(Clone)]
pub struct StoreOptions {
    /// Wire a devtools bridge into the store.
    pub devtools: bool,
    /// Sink receiving bridge traffic. With `devtools: true` and no sink,
    /// the bridge reports the absence and stays inert.
    pub devtools_sink: Option<Rc<dyn DevtoolsSink>>,
    /// Forwarded verbatim to the sink at connection time.
    pub devtools_options: DevtoolsOptions,
    /// Cache the instance in the context and return it on later calls.
    pub use_singleton: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            devtools: false,
            devtools_sink: None,
            devtools_options: DevtoolsOptions::default(),
            use_singleton: true,
        }
    }
}

impl StoreOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_devtools(mut self, enabled: bool) -> Self {
        self.devtools = enabled;
        self
    }

    /// Install a devtools sink and enable the bridge.
    #[must_use]
    pub fn with_devtools_sink(mut self, sink: Rc<dyn DevtoolsSink>) -> Self {
        self.devtools = true;
        self.devtools_sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_devtools_options(mut self, options: DevtoolsOptions) -> Self {
        self.devtools_options = options;
        self
    }

    #[must_use]
    pub fn with_use_singleton(mut self, enabled: bool) -> Self {
        self.use_singleton = enabled;
        self
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("devtools", &self.devtools)
            .field("devtools_sink", &self.devtools_sink.is_some())
            .field("devtools_options", &self.devtools_options)
            .field("use_singleton", &self.use_singleton)
            .finish()
    }
}

/// Caller-owned home for singleton instances.
///
/// A context caches at most one native store and one observed external
/// store. Constructing with `use_singleton: true` populates the cache;
/// later singleton calls on the same context return the cached instance.
#[derive(Default)]
pub struct StoreContext {
    store: RefCell<Option<Store>>,
    observed: RefCell<Option<ObservedStore>>,
}

impl StoreContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a native store is cached.
    #[must_use]
    pub fn has_store(&self) -> bool {
        self.store.borrow().is_some()
    }

    /// Whether an observed external store is cached.
    #[must_use]
    pub fn has_observed(&self) -> bool {
        self.observed.borrow().is_some()
    }
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("store", &self.has_store())
            .field("observed", &self.has_observed())
            .finish()
    }
}

/// Build a [`Store`] from combined reducers, an initial state, and options.
///
/// With `use_singleton: true` (the default) the instance is cached in
/// `context`; every later singleton call on the same context returns the
/// cached instance regardless of arguments, and the arguments are dropped
/// unused. With `use_singleton: false` each call builds a fresh store.
#[must_use]
pub fn create_store(
    context: &StoreContext,
    reducers: CombinedReducers,
    initial_state: Value,
    options: StoreOptions,
) -> Store {
    if options.use_singleton {
        if let Some(cached) = context.store.borrow().as_ref() {
            tracing::debug!("returning cached singleton store");
            return cached.clone();
        }
    }

    let store = if options.devtools {
        let bridge = DevtoolsBridge::connect(
            options.devtools_sink,
            &initial_state,
            &options.devtools_options,
        );
        Store::with_devtools(reducers, initial_state, bridge)
    } else {
        Store::new(reducers, initial_state)
    };

    if options.use_singleton {
        *context.store.borrow_mut() = Some(store.clone());
    }
    store
}

/// Wrap an already-constructed external store behind the selection surface.
///
/// Fails with [`ExternalStoreError::Missing`] when no handle is supplied;
/// validation precedes the singleton cache lookup, so a missing handle
/// fails even when a cached instance exists. Singleton semantics otherwise
/// match [`create_store`].
pub fn observe_external_store(
    context: &StoreContext,
    handle: Option<Rc<dyn ExternalStore>>,
    options: StoreOptions,
) -> Result<ObservedStore, ExternalStoreError> {
    if handle.is_none() {
        return Err(ExternalStoreError::Missing);
    }
    if options.use_singleton {
        if let Some(cached) = context.observed.borrow().as_ref() {
            tracing::debug!("returning cached singleton observed store");
            return Ok(cached.clone());
        }
    }

    let store = if options.devtools {
        ObservedStore::wrap_with_devtools(
            handle,
            options.devtools_sink,
            &options.devtools_options,
        )?
    } else {
        ObservedStore::wrap(handle)?
    };

    if options.use_singleton {
        *context.observed.borrow_mut() = Some(store.clone());
    }
    Ok(store)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
