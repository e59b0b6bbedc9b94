use std::collections::HashMap;

use serde_json::Value;

use super::{FlatState, StateError};

/// Per-channel stores keyed by channel identifier, as carried by Disconnect.
///
/// On the wire each scope is a JSON string holding that scope's own
/// `key -> JSON` map. Reads and writes go to the focused scope; `select`
/// creates it on first use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedState {
    scopes: HashMap<String, FlatState>,
    focus: Option<String>,
}

impl ScopedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(src: &HashMap<String, String>) -> Result<Self, StateError> {
        let mut scopes = HashMap::with_capacity(src.len());
        for (scope, json) in src {
            // An empty scope string is treated as an empty map.
            let inner: HashMap<String, String> = if json.is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(json).map_err(|source| StateError::Decode {
                    key: scope.clone(),
                    source,
                })?
            };
            scopes.insert(scope.clone(), FlatState::decode(&inner)?);
        }
        Ok(Self { scopes, focus: None })
    }

    /// Focus `scope`, creating an empty one if it was not in the snapshot.
    pub fn select(&mut self, scope: &str) -> &mut FlatState {
        self.focus = Some(scope.to_string());
        self.scopes.entry(scope.to_string()).or_default()
    }

    pub fn focused(&self) -> Option<&FlatState> {
        self.focus.as_deref().and_then(|scope| self.scopes.get(scope))
    }

    pub fn focused_mut(&mut self) -> Result<&mut FlatState, StateError> {
        let scope = self.focus.as_deref().ok_or(StateError::NoScopeSelected)?;
        self.scopes.get_mut(scope).ok_or(StateError::NoScopeSelected)
    }

    pub fn scope(&self, scope: &str) -> Option<&FlatState> {
        self.scopes.get(scope)
    }

    /// Read from the focused scope. Nothing is visible until a scope is selected.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.focused().and_then(|state| state.get(key))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), StateError> {
        self.focused_mut()?.set(key, value);
        Ok(())
    }

    pub fn update_string(
        &mut self,
        key: &str,
        f: impl FnOnce(&str) -> String,
    ) -> Result<(), StateError> {
        self.focused_mut()?.update_string(key, f)
    }

    pub fn update_float(&mut self, key: &str, f: impl FnOnce(f64) -> f64) -> Result<(), StateError> {
        self.focused_mut()?.update_float(key, f)
    }

    /// Every known scope with that scope's changed keys, in wire form.
    pub fn changes(&self) -> Result<HashMap<String, String>, StateError> {
        self.scopes
            .iter()
            .map(|(scope, state)| Ok((scope.clone(), encode_scope(scope, &state.changes()?)?)))
            .collect()
    }

    /// Full snapshot of every scope, in wire form.
    pub fn encode(&self) -> Result<HashMap<String, String>, StateError> {
        self.scopes
            .iter()
            .map(|(scope, state)| Ok((scope.clone(), encode_scope(scope, &state.encode()?)?)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

fn encode_scope(scope: &str, values: &HashMap<String, String>) -> Result<String, StateError> {
    serde_json::to_string(values).map_err(|source| StateError::Encode {
        key: scope.to_string(),
        source,
    })
}
