//! Connection lifecycle: open, command, close.
//!
//! A `Connection` is rebuilt from the request on every call and owns that
//! call's [`Socket`]. Nothing survives the call except what is drained into
//! the response.

use std::collections::HashMap;

use cable_protocol::{Env, Reply};
use http::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::application::{ActionData, Application, HookResult};
use crate::broadcast::Broadcaster;
use crate::channel::Channel;
use crate::error::CableError;
use crate::identifier::{ChannelIdentifier, ConnectionIdentifiers};
use crate::socket::Socket;
use crate::state::{FlatState, IStateKind};

/// Base for request paths that arrive without scheme and host.
const DEFAULT_BASE_URL: &str = "http://localhost/";

pub struct Connection {
    url: Url,
    headers: HeaderMap,
    identifiers: ConnectionIdentifiers,
    socket: Socket,
    broadcaster: Broadcaster,
}

impl Connection {
    pub fn new(
        url: Url,
        headers: HeaderMap,
        identifiers: ConnectionIdentifiers,
        socket: Socket,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            url,
            headers,
            identifiers,
            socket,
            broadcaster,
        }
    }

    /// Rebuild a connection from what the proxy sent.
    ///
    /// `env.url`/`env.headers` win; the request-level `path`/`headers` are
    /// used when the env carries no URL.
    pub fn from_request(
        path: &str,
        headers: &HashMap<String, String>,
        env: &Env,
        identifiers: &str,
        kind: IStateKind,
        broadcaster: Broadcaster,
    ) -> Result<Self, CableError> {
        let (raw_url, raw_headers) = if env.url.is_empty() {
            (path, headers)
        } else {
            (env.url.as_str(), &env.headers)
        };

        Ok(Self::new(
            parse_url(raw_url)?,
            header_map(raw_headers),
            ConnectionIdentifiers::from_json(identifiers)?,
            Socket::from_env(env, kind)?,
            broadcaster,
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text. Non-ASCII bytes are decoded lossily.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(header_text)
    }

    /// Look `name` up in the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .map(header_text)
            .find_map(|raw| {
                raw.split(';')
                    .filter_map(|pair| pair.trim().split_once('='))
                    .find(|(key, _)| key.trim() == name)
                    .map(|(_, value)| value.trim().trim_matches('"').to_string())
            })
    }

    pub fn identifiers(&self) -> &ConnectionIdentifiers {
        &self.identifiers
    }

    /// Tag the connection; the tags travel back to the proxy as the
    /// identifiers token.
    pub fn identified_by(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.identifiers.insert(key, value);
    }

    /// Connection-scoped state (cstate).
    pub fn state(&self) -> &FlatState {
        self.socket.cstate()
    }

    pub fn state_mut(&mut self) -> &mut FlatState {
        self.socket.cstate_mut()
    }

    pub fn transmit<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<(), CableError> {
        self.socket.write(message)
    }

    /// Ask the proxy to close the client with the given reason.
    pub fn disconnect(&mut self, reason: impl Into<String>, reconnect: bool) -> Result<(), CableError> {
        self.socket.write(&Reply::Disconnect {
            reason: reason.into(),
            reconnect,
        })?;
        self.socket.request_disconnect();
        Ok(())
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut Socket {
        &mut self.socket
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run the connected hook and greet the client. No welcome is written
    /// when the hook fails.
    pub async fn handle_open(&mut self, app: &Application) -> HookResult {
        app.connected_hook().call(self).await?;
        self.socket.write(&Reply::Welcome)
    }

    pub async fn handle_command(
        &mut self,
        app: &Application,
        command: &str,
        identifier: &str,
        data: &str,
    ) -> HookResult {
        let identifier = ChannelIdentifier::parse(identifier)?;
        let config = app.channel(identifier.channel())?;
        let mut channel = Channel::new(self, identifier);

        match command {
            "subscribe" => {
                config.subscribed_hook().call(&mut channel).await?;
                if channel.is_rejected() {
                    return Ok(());
                }
                channel.confirm()
            }
            "unsubscribe" => config.unsubscribed_hook().call(&mut channel).await,
            "message" => {
                let data = parse_action_data(data)?;
                let action = match data.get("action") {
                    None => return Ok(()),
                    Some(Value::String(action)) => action.clone(),
                    Some(other) => return Err(CableError::MalformedAction(other.clone())),
                };
                let hook = config.action(&action).ok_or_else(|| CableError::UnknownAction {
                    channel: channel.name().to_string(),
                    action: action.clone(),
                })?;
                hook.call(&mut channel, data).await
            }
            other => Err(CableError::UnsupportedCommand(other.to_string())),
        }
    }

    /// Unsubscribe every channel, then run the disconnected hook.
    ///
    /// A failing subscription is reported through `on_failure` and does not
    /// stop the others. Only the disconnected hook's own error is returned.
    pub async fn handle_close<F>(
        &mut self,
        app: &Application,
        subscriptions: &[String],
        mut on_failure: F,
    ) -> HookResult
    where
        F: FnMut(&str, &CableError) + Send,
    {
        for identifier in subscriptions {
            self.socket.istate_mut().select(identifier);
            if let Err(err) = self.unsubscribe_on_close(app, identifier).await {
                on_failure(identifier.as_str(), &err);
            }
        }

        app.disconnected_hook().call(self).await
    }

    async fn unsubscribe_on_close(&mut self, app: &Application, identifier: &str) -> HookResult {
        let identifier = ChannelIdentifier::parse(identifier)?;
        let config = app.channel(identifier.channel())?;
        let mut channel = Channel::new(self, identifier);
        config.unsubscribed_hook().call(&mut channel).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url.as_str())
            .field("identifiers", &self.identifiers)
            .finish_non_exhaustive()
    }
}

fn parse_url(raw: &str) -> Result<Url, CableError> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(DEFAULT_BASE_URL)
            .and_then(|base| base.join(raw))
            .map_err(|e| CableError::Environment(format!("url {raw:?}: {e}"))),
        Err(e) => Err(CableError::Environment(format!("url {raw:?}: {e}"))),
    }
}

/// Headers the proxy forwarded. Entries `http` refuses are skipped.
fn header_map(raw: &HashMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let parsed = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| e.to_string())
            .and_then(|n| HeaderValue::from_str(value).map(|v| (n, v)).map_err(|e| e.to_string()));
        match parsed {
            Ok((name, value)) => {
                headers.append(name, value);
            }
            Err(error) => tracing::warn!(header = %name, %error, "skipping invalid header"),
        }
    }
    headers
}

fn header_text(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

/// `data` of a `message` command. An empty string counts as `{}`.
fn parse_action_data(data: &str) -> Result<ActionData, CableError> {
    if data.trim().is_empty() {
        return Ok(ActionData::new());
    }
    match serde_json::from_str(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CableError::MalformedData(format!("expected a JSON object, got {other}"))),
        Err(e) => Err(CableError::MalformedData(e.to_string())),
    }
}
