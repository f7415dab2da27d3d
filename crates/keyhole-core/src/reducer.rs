#![forbid(unsafe_code)]

//! Reducer declaration and combination.
//!
//! # Design
//!
//! Reducers are declared in a [`ReducerMap`]: an ordered list of named slots,
//! each holding a reducer or nothing. [`combine_reducers`] turns the map into
//! a [`CombinedReducers`] fold, warning about and dropping every empty slot.
//! Names label reducers for diagnostics and fold review; they do not
//! namespace the state — every reducer sees the full accumulator and merges
//! its contribution at the top level.
//!
//! During a dispatch the fold runs in declaration order. Each reducer
//! receives the accumulator so far (not the pristine previous state) and
//! returns a *partial* state that is shallow-merged into the accumulator.
//! Returning [`Value::Null`] means "no contribution".
//!
//! # Invariants
//!
//! 1. Fold order equals declaration order, exactly once per reducer.
//! 2. Empty slots never reach the fold; each is warned about once, at
//!    combination time.
//! 3. [`shallow_merge`] only touches top-level object keys; nested values
//!    are replaced wholesale, never merged recursively.

use std::fmt;

use serde_json::Value;

use crate::action::Action;

/// A reducer: pure function from the accumulator so far and an action to a
/// partial next state.
pub type ReducerFn = Box<dyn Fn(&Value, &Action) -> Value>;

/// One named reducer in the combined fold.
struct NamedReducer {
    name: String,
    run: ReducerFn,
}

/// Ordered builder of named reducer slots.
///
/// A slot either holds a reducer or is declared empty (for example when a
/// lookup that should have produced one came back with nothing). Empty slots
/// survive until [`combine_reducers`], which warns about and drops them.
#[derive(Default)]
pub struct ReducerMap {
    slots: Vec<(String, Option<ReducerFn>)>,
}

impl ReducerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a reducer under `name`.
    ///
    /// Names are diagnostic labels, not unique keys: declaring the same name
    /// twice keeps both slots, and both reducers run in declaration order.
    #[must_use]
    pub fn with_reducer(
        mut self,
        name: impl Into<String>,
        reducer: impl Fn(&Value, &Action) -> Value + 'static,
    ) -> Self {
        self.slots.push((name.into(), Some(Box::new(reducer))));
        self
    }

    /// Declare a slot that may or may not hold a reducer.
    ///
    /// An empty slot is kept until combination, where it is dropped with a
    /// warning naming the key.
    #[must_use]
    pub fn with_optional<F>(mut self, name: impl Into<String>, reducer: Option<F>) -> Self
    where
        F: Fn(&Value, &Action) -> Value + 'static,
    {
        let slot = reducer.map(|f| Box::new(f) as ReducerFn);
        self.slots.push((name.into(), slot));
        self
    }

    /// Number of declared slots, filled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for ReducerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<(&str, bool)> = self
            .slots
            .iter()
            .map(|(name, slot)| (name.as_str(), slot.is_some()))
            .collect();
        f.debug_struct("ReducerMap").field("slots", &slots).finish()
    }
}

/// The ordered fold produced by [`combine_reducers`].
///
/// Consumed by value at store construction, so combination happens at most
/// once per store.
pub struct CombinedReducers {
    entries: Vec<NamedReducer>,
}

impl CombinedReducers {
    /// Fold `action` through every reducer in declaration order.
    ///
    /// Each reducer receives the accumulator so far; its partial return is
    /// shallow-merged into that accumulator. The final accumulator is the
    /// next state. A panic inside a reducer propagates unmodified.
    #[must_use]
    pub fn apply(&self, state: &Value, action: &Action) -> Value {
        self.entries.iter().fold(state.clone(), |acc, entry| {
            let partial = (entry.run)(&acc, action);
            shallow_merge(acc, partial)
        })
    }

    /// Names of the combined reducers, in fold order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CombinedReducers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        f.debug_struct("CombinedReducers")
            .field("names", &names)
            .finish()
    }
}

/// Combine an ordered reducer map into one fold.
///
/// Slots that hold a reducer are kept in declaration order. For every empty
/// slot a non-fatal warning names the key and the slot is dropped — not
/// retried, not defaulted. No side effects beyond the warnings.
#[must_use]
pub fn combine_reducers(map: ReducerMap) -> CombinedReducers {
    let mut entries = Vec::with_capacity(map.slots.len());
    for (name, slot) in map.slots {
        match slot {
            Some(run) => entries.push(NamedReducer { name, run }),
            None => tracing::warn!("no reducer provided for key {name:?}; slot dropped"),
        }
    }
    CombinedReducers { entries }
}

/// Merge a reducer's partial return into the accumulator.
///
/// - `Null` partial: no contribution, accumulator unchanged.
/// - Object partial: its top-level keys overwrite the accumulator's;
///   a non-object accumulator is coerced to an empty object first.
/// - Any other partial: ignored with a debug log — scalar and array
///   contributions have no top-level keys to merge.
#[must_use]
pub fn shallow_merge(base: Value, partial: Value) -> Value {
    match partial {
        Value::Null => base,
        Value::Object(fields) => {
            let mut merged = match base {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            for (key, value) in fields {
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        other => {
            tracing::debug!(
                kind = kind_of(&other),
                "non-object reducer contribution ignored"
            );
            base
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
