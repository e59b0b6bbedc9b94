//! Change-tracked key/value state carried across stateless calls.
//!
//! The caller sends a snapshot (`key -> JSON`) with every request and gets
//! back only the keys that were written during the call.

mod flat;
mod scoped;

use std::collections::HashMap;

use serde_json::Value;

pub use flat::FlatState;
pub use scoped::ScopedState;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("missing value for key {0:?}")]
    MissingKey(String),

    #[error("value at key {key:?} is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("no state scope selected")]
    NoScopeSelected,

    #[error("invalid state snapshot at {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state at {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which istate layout a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IStateKind {
    /// One channel's state (Command).
    Flat,
    /// Every subscribed channel's state keyed by identifier (Disconnect).
    Scoped,
}

/// Channel-scoped state as decoded for the current call.
#[derive(Debug, Clone, PartialEq)]
pub enum IState {
    Flat(FlatState),
    Scoped(ScopedState),
}

impl IState {
    pub fn decode(src: &HashMap<String, String>, kind: IStateKind) -> Result<Self, StateError> {
        Ok(match kind {
            IStateKind::Flat => IState::Flat(FlatState::decode(src)?),
            IStateKind::Scoped => IState::Scoped(ScopedState::decode(src)?),
        })
    }

    /// Focus the scope for `identifier`. No-op for flat state.
    pub fn select(&mut self, identifier: &str) {
        if let IState::Scoped(state) = self {
            state.select(identifier);
        }
    }

    /// The store a channel with this identifier reads and writes.
    pub fn scope_mut(&mut self, identifier: &str) -> &mut FlatState {
        match self {
            IState::Flat(state) => state,
            IState::Scoped(state) => state.select(identifier),
        }
    }

    pub fn scope(&self, identifier: &str) -> Option<&FlatState> {
        match self {
            IState::Flat(state) => Some(state),
            IState::Scoped(state) => state.scope(identifier),
        }
    }

    pub fn changes(&self) -> Result<HashMap<String, String>, StateError> {
        match self {
            IState::Flat(state) => state.changes(),
            IState::Scoped(state) => state.changes(),
        }
    }
}

/// JSON numbers only have one type; keep whole results integral so `1 + 2`
/// goes back over the wire as `3` rather than `3.0`.
fn number_value(n: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
