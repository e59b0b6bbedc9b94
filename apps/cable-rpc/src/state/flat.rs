use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::{number_value, StateError};

/// Single-scope store with a dirty-key set.
///
/// A key is dirty iff `set` or a successful `update_*` touched it since the
/// store was built. Decoding never marks anything dirty and `get` never does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatState {
    values: HashMap<String, Value>,
    dirty: HashSet<String>,
}

impl FlatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from its wire form (`key -> JSON`).
    pub fn decode(src: &HashMap<String, String>) -> Result<Self, StateError> {
        let mut values = HashMap::with_capacity(src.len());
        for (key, json) in src {
            let value = serde_json::from_str(json).map_err(|source| StateError::Decode {
                key: key.clone(),
                source,
            })?;
            values.insert(key.clone(), value);
        }
        Ok(Self {
            values,
            dirty: HashSet::new(),
        })
    }

    /// Full snapshot of every key, in wire form.
    pub fn encode(&self) -> Result<HashMap<String, String>, StateError> {
        self.values
            .iter()
            .map(|(key, value)| Ok((key.clone(), encode_value(key, value)?)))
            .collect()
    }

    /// Wire form of the dirty keys only.
    pub fn changes(&self) -> Result<HashMap<String, String>, StateError> {
        self.dirty
            .iter()
            .filter_map(|key| self.values.get(key).map(|value| (key, value)))
            .map(|(key, value)| Ok((key.clone(), encode_value(key, value)?)))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.dirty.insert(key.clone());
        self.values.insert(key, value.into());
    }

    pub fn update_string(
        &mut self,
        key: &str,
        f: impl FnOnce(&str) -> String,
    ) -> Result<(), StateError> {
        let current = match self.values.get(key) {
            None => return Err(StateError::MissingKey(key.to_string())),
            Some(Value::String(s)) => s,
            Some(_) => {
                return Err(StateError::TypeMismatch {
                    key: key.to_string(),
                    expected: "string",
                })
            }
        };
        let next = f(current);
        self.set(key, next);
        Ok(())
    }

    pub fn update_float(&mut self, key: &str, f: impl FnOnce(f64) -> f64) -> Result<(), StateError> {
        let current = match self.values.get(key) {
            None => return Err(StateError::MissingKey(key.to_string())),
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(_) => {
                return Err(StateError::TypeMismatch {
                    key: key.to_string(),
                    expected: "number",
                })
            }
        };
        self.set(key, number_value(f(current)));
        Ok(())
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.dirty.contains(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn encode_value(key: &str, value: &Value) -> Result<String, StateError> {
    serde_json::to_string(value).map_err(|source| StateError::Encode {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decode_empty_snapshot() {
        let state = FlatState::decode(&HashMap::new()).unwrap();
        assert!(state.get("foo").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn decode_reads_json_values() {
        let state = FlatState::decode(&snapshot(&[("foo", r#""bar""#), ("n", "2")])).unwrap();
        assert_eq!(state.get("foo"), Some(&json!("bar")));
        assert_eq!(state.get("n"), Some(&json!(2)));
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = FlatState::decode(&snapshot(&[("foo", "{not json")])).unwrap_err();
        assert!(matches!(err, StateError::Decode { ref key, .. } if key == "foo"));
    }

    #[test]
    fn decode_marks_nothing_dirty() {
        let state = FlatState::decode(&snapshot(&[("foo", r#""bar""#), ("baz", r#""qux""#)])).unwrap();
        assert!(state.changes().unwrap().is_empty());
        let _ = state.get("foo");
        assert!(state.changes().unwrap().is_empty());
    }

    #[test]
    fn set_overwrites_and_marks_dirty() {
        let mut state = FlatState::decode(&snapshot(&[("foo", r#""bar""#), ("baz", r#""qux""#)])).unwrap();
        state.set("baz", "XXX");
        assert_eq!(state.get("baz"), Some(&json!("XXX")));
        assert_eq!(state.changes().unwrap(), snapshot(&[("baz", r#""XXX""#)]));
    }

    #[test]
    fn set_same_value_still_dirty() {
        let mut state = FlatState::decode(&snapshot(&[("foo", r#""bar""#)])).unwrap();
        state.set("foo", "bar");
        assert!(state.is_dirty("foo"));
        assert_eq!(state.changes().unwrap(), snapshot(&[("foo", r#""bar""#)]));
    }

    #[test]
    fn set_structured_value() {
        let mut state = FlatState::new();
        state.set("user", json!({ "name": "john" }));
        assert_eq!(state.changes().unwrap(), snapshot(&[("user", r#"{"name":"john"}"#)]));
    }

    #[test]
    fn update_string_with_correct_type() {
        let mut state = FlatState::decode(&snapshot(&[("foo", r#""bar""#)])).unwrap();
        state.update_string("foo", |v| format!("{v}BAR")).unwrap();
        assert_eq!(state.get("foo"), Some(&json!("barBAR")));
        assert_eq!(state.changes().unwrap(), snapshot(&[("foo", r#""barBAR""#)]));
    }

    #[test]
    fn update_float_on_string_is_type_mismatch() {
        let mut state = FlatState::decode(&snapshot(&[("foo", r#""bar""#)])).unwrap();
        let before = state.clone();
        let err = state.update_float("foo", |v| v + 1.0).unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { expected: "number", .. }));
        assert_eq!(state, before);
        assert!(state.changes().unwrap().is_empty());
    }

    #[test]
    fn update_string_on_number_is_type_mismatch() {
        let mut state = FlatState::decode(&snapshot(&[("count", "1")])).unwrap();
        let err = state.update_string("count", |v| v.to_string()).unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { expected: "string", .. }));
        assert_eq!(state.get("count"), Some(&json!(1)));
    }

    #[test]
    fn update_missing_key() {
        let mut state = FlatState::new();
        assert!(matches!(
            state.update_float("count", |v| v + 1.0),
            Err(StateError::MissingKey(ref k)) if k == "count"
        ));
        assert!(matches!(
            state.update_string("name", |v| v.to_string()),
            Err(StateError::MissingKey(_))
        ));
        assert!(state.is_empty());
        assert!(state.changes().unwrap().is_empty());
    }

    #[test]
    fn update_float_keeps_whole_numbers_integral() {
        let mut state = FlatState::decode(&snapshot(&[("count", "1")])).unwrap();
        state.update_float("count", |v| v + 2.0).unwrap();
        assert_eq!(state.changes().unwrap(), snapshot(&[("count", "3")]));

        state.update_float("count", |v| v / 2.0).unwrap();
        assert_eq!(state.changes().unwrap(), snapshot(&[("count", "1.5")]));
    }

    #[test]
    fn changes_round_trip_is_stable() {
        let mut state = FlatState::new();
        state.set("a", json!({ "nested": [1, 2, { "x": null }] }));
        state.set("b", 2.5);
        state.set("c", true);
        let changes = state.changes().unwrap();

        let reloaded = FlatState::decode(&changes).unwrap();
        assert!(reloaded.changes().unwrap().is_empty());
        assert_eq!(reloaded.encode().unwrap(), changes);
    }
}
