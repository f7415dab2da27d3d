#![forbid(unsafe_code)]

//! Actions dispatched through the store.

use serde_json::Value;

/// A dispatched update: a kind tag plus an arbitrary structured payload.
///
/// The store treats actions as opaque data. Reducers decide what a kind
/// means; the devtools bridge receives the kind verbatim for labeling.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    /// Discriminant examined by reducers.
    pub kind: String,
    /// Arbitrary payload; `Value::Null` when the action carries none.
    pub payload: Value,
}

impl Action {
    /// Action carrying a payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Action without a payload.
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
