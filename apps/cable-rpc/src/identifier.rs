//! Channel identifiers and connection identity tokens.

use serde_json::{Map, Value};

use crate::error::CableError;

/// Parsed `{"channel": "...", ...params}` blob.
///
/// The raw JSON is kept as-is: it names the channel's istate scope and is
/// echoed back verbatim in every transmission for the subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelIdentifier {
    raw: String,
    channel: String,
    params: Map<String, Value>,
}

impl ChannelIdentifier {
    pub fn parse(raw: &str) -> Result<Self, CableError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CableError::InvalidIdentifier(format!("{raw}: {e}")))?;

        let Value::Object(mut params) = value else {
            return Err(CableError::InvalidIdentifier(format!(
                "{raw}: expected a JSON object"
            )));
        };

        let channel = match params.remove("channel") {
            Some(Value::String(channel)) => channel,
            Some(_) => {
                return Err(CableError::InvalidIdentifier(format!(
                    "{raw}: \"channel\" must be a string"
                )))
            }
            None => {
                return Err(CableError::InvalidIdentifier(format!(
                    "{raw}: missing \"channel\""
                )))
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            channel,
            params,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Every field except `channel`.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn as_json(&self) -> &str {
        &self.raw
    }
}

/// Identity tags assigned during Connect and round-tripped by the caller as
/// an opaque JSON token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionIdentifiers(Map<String, Value>);

impl ConnectionIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the token. An empty or `null` token means "not identified yet".
    pub fn from_json(token: &str) -> Result<Self, CableError> {
        if token.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str::<Option<Map<String, Value>>>(token)
            .map(|ids| Self(ids.unwrap_or_default()))
            .map_err(|e| CableError::Environment(format!("identifiers: {e}")))
    }

    pub fn to_json(&self) -> Result<String, CableError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_splits_channel_from_params() {
        let id = ChannelIdentifier::parse(r#"{"channel":"Chat","room":"42","page":2}"#).unwrap();
        assert_eq!(id.channel(), "Chat");
        assert_eq!(id.param("room"), Some(&json!("42")));
        assert_eq!(id.param("page"), Some(&json!(2)));
        assert!(id.param("channel").is_none());
        assert_eq!(id.params().len(), 2);
        assert_eq!(id.as_json(), r#"{"channel":"Chat","room":"42","page":2}"#);
    }

    #[test]
    fn parse_rejects_bad_identifiers() {
        for raw in ["", "not json", "[1]", r#"{"room":"42"}"#, r#"{"channel":5}"#] {
            let err = ChannelIdentifier::parse(raw).unwrap_err();
            assert!(
                matches!(err, CableError::InvalidIdentifier(_)),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn empty_token_is_anonymous() {
        assert!(ConnectionIdentifiers::from_json("").unwrap().is_empty());
        assert!(ConnectionIdentifiers::from_json("null").unwrap().is_empty());
        assert!(ConnectionIdentifiers::from_json(" null ").unwrap().is_empty());
    }

    #[test]
    fn token_round_trips() {
        let mut ids = ConnectionIdentifiers::new();
        ids.insert("user", "john");
        let token = ids.to_json().unwrap();
        assert_eq!(token, r#"{"user":"john"}"#);
        assert_eq!(ConnectionIdentifiers::from_json(&token).unwrap(), ids);
    }

    #[test]
    fn malformed_token_is_environment_error() {
        assert!(matches!(
            ConnectionIdentifiers::from_json("{oops"),
            Err(CableError::Environment(_))
        ));
    }
}
