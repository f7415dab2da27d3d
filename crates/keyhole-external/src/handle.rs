#![forbid(unsafe_code)]

//! The external-store seam.

use std::fmt;

use keyhole_core::{Action, Value};

/// An already-constructed external state container.
///
/// The adapter never owns external state; it reads snapshots through
/// `state`, forwards actions through `dispatch`, and hears about updates
/// through `subscribe`. Implementations decide whether `dispatch` notifies
/// subscribers synchronously (redux-style stores do); the adapter tolerates
/// either by re-reading state after every forwarded dispatch.
pub trait ExternalStore {
    /// Snapshot of the current external state.
    fn state(&self) -> Value;

    /// Forward one action into the external store.
    fn dispatch(&self, action: &Action);

    /// Attach an observer called with each post-update state.
    ///
    /// The returned guard detaches the observer when dropped.
    fn subscribe(&self, observer: Box<dyn Fn(&Value)>) -> ExternalSubscription;
}

/// Guard keeping one external observer attached.
///
/// Dropping the guard runs the unhook the external store provided.
pub struct ExternalSubscription {
    unhook: Option<Box<dyn FnOnce()>>,
}

impl ExternalSubscription {
    /// Guard running `unhook` when dropped.
    #[must_use]
    pub fn new(unhook: impl FnOnce() + 'static) -> Self {
        Self {
            unhook: Some(Box::new(unhook)),
        }
    }

    /// Guard with nothing to detach, for stores whose observers cannot be
    /// removed.
    #[must_use]
    pub fn detached() -> Self {
        Self { unhook: None }
    }
}

impl Drop for ExternalSubscription {
    fn drop(&mut self) {
        if let Some(unhook) = self.unhook.take() {
            unhook();
        }
    }
}

impl fmt::Debug for ExternalSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSubscription")
            .field("detachable", &self.unhook.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn dropping_the_guard_runs_the_unhook_once() {
        let unhooked = Rc::new(Cell::new(0));
        let counter = Rc::clone(&unhooked);
        let guard = ExternalSubscription::new(move || counter.set(counter.get() + 1));
        assert_eq!(unhooked.get(), 0);
        drop(guard);
        assert_eq!(unhooked.get(), 1);
    }

    #[test]
    fn detached_guard_is_inert() {
        let guard = ExternalSubscription::detached();
        drop(guard); // nothing to run, must not panic
    }
}
