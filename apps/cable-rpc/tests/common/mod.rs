#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use cable_protocol::{BroadcastPayload, CommandMessage, Env};
use cable_rpc::broadcast::{BroadcastAdapter, BroadcastError, Broadcaster};
use cable_rpc::logging::{CallInfo, CallLog};
use cable_rpc::server::Server;
use cable_rpc::{ActionData, AppState, Application, CableError, Channel, ChannelConfig, Connection, HookResult};

pub const CHAT: &str = r#"{"channel":"Chat"}"#;
pub const REJECTOR: &str = r#"{"channel":"Rejector"}"#;
pub const TRANSMISSIONS: &str = r#"{"channel":"Transmissions"}"#;
pub const MULTIPLE: &str = r#"{"channel":"Multiple"}"#;
pub const FAILING: &str = r#"{"channel":"Failing"}"#;
pub const DEFAULTS: &str = r#"{"channel":"Defaults"}"#;

pub const BASE_URL: &str = "http://localhost:8080/cable";

/// `{"channel":"State","name":<name>}`, optionally asking for a broadcast on
/// unsubscribe.
pub fn state_channel(name: &str, notify_disconnect: bool) -> String {
    let mut id = json!({ "channel": "State", "name": name });
    if notify_disconnect {
        id["notify_disconnect"] = json!(true);
    }
    id.to_string()
}

// ---------------------------------------------------------------------------
// Recording collaborators
// ---------------------------------------------------------------------------

/// Broadcast adapter that keeps every payload and can be told to fail.
#[derive(Default)]
pub struct RecordingAdapter {
    payloads: Mutex<Vec<BroadcastPayload>>,
    failing: AtomicBool,
}

impl RecordingAdapter {
    pub fn payloads(&self) -> Vec<BroadcastPayload> {
        self.payloads.lock().unwrap().clone()
    }

    /// Every payload as plain JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.payloads()
            .iter()
            .map(|p| serde_json::to_value(p).unwrap())
            .collect()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BroadcastAdapter for RecordingAdapter {
    async fn broadcast(&self, payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BroadcastError::Status(503));
        }
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Call log that keeps one line per event.
#[derive(Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

impl CallLog for RecordingLog {
    fn call_started(&self, call: &CallInfo<'_>) {
        self.push(format!("{} started", call.verb));
    }

    fn call_failed(&self, call: &CallInfo<'_>, error: &CableError) {
        self.push(format!("{} failed: {error}", call.verb));
    }

    fn cleanup_failed(&self, call: &CallInfo<'_>, subscription: &str, error: &CableError) {
        self.push(format!("{} cleanup {subscription}: {error}", call.verb));
    }
}

pub struct Harness {
    pub server: Server,
    pub broadcasts: Arc<RecordingAdapter>,
    pub log: Arc<RecordingLog>,
}

pub fn harness() -> Harness {
    harness_for(conformance_app())
}

pub fn harness_for(app: Application) -> Harness {
    let broadcasts = Arc::new(RecordingAdapter::default());
    let log = Arc::new(RecordingLog::default());
    let server = Server::new(app, Broadcaster::from_arc(broadcasts.clone()))
        .with_log(log.clone());
    Harness {
        server,
        broadcasts,
        log,
    }
}

/// Router state wired to the conformance application.
pub fn test_state() -> (AppState, Arc<RecordingAdapter>) {
    let Harness {
        server, broadcasts, ..
    } = harness();
    let state = AppState {
        server: Arc::new(server),
    };
    (state, broadcasts)
}

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

pub fn pairs(values: &[(&str, &str)]) -> HashMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn env_at(url: &str) -> Env {
    Env {
        url: url.to_string(),
        ..Env::default()
    }
}

pub fn command(command: &str, identifier: &str, data: &str) -> CommandMessage {
    CommandMessage {
        command: command.to_string(),
        identifier: identifier.to_string(),
        connection_identifiers: r#"{"user":"john"}"#.to_string(),
        data: data.to_string(),
        env: env_at(BASE_URL),
    }
}

pub fn command_with_istate(
    command_name: &str,
    identifier: &str,
    data: &str,
    istate: HashMap<String, String>,
) -> CommandMessage {
    let mut msg = command(command_name, identifier, data);
    msg.env.istate = istate;
    msg
}

// ---------------------------------------------------------------------------
// Conformance application
// ---------------------------------------------------------------------------

/// Channels modelled on the ActionCable conformance suite.
pub fn conformance_app() -> Application {
    Application::new()
        .on_connected(connected)
        .on_disconnected(disconnected)
        .with_channel(
            "Chat",
            ChannelConfig::new()
                .on_subscribed(stream_chat)
                .on_action("tick", tick)
                .on_action("echo", echo)
                .on_action("unfollow", unfollow)
                .on_action("speak", speak),
        )
        .with_channel("Rejector", ChannelConfig::new().on_subscribed(reject))
        .with_channel(
            "Transmissions",
            ChannelConfig::new().on_subscribed(hello_world),
        )
        .with_channel(
            "Multiple",
            ChannelConfig::new()
                .on_subscribed(stream_a_and_b)
                .on_unsubscribed(stop_everything),
        )
        .with_channel(
            "State",
            ChannelConfig::new()
                .on_subscribed(init_state)
                .on_unsubscribed(notify_left)
                .on_action("tick", tick),
        )
        .with_channel(
            "Failing",
            ChannelConfig::new()
                .on_subscribed(fail_after_effects)
                .on_unsubscribed(refuse),
        )
        .with_channel("Defaults", ChannelConfig::new())
}

fn connected(conn: &mut Connection) -> BoxFuture<'_, HookResult> {
    Box::pin(async move {
        let test = conn.query("test").unwrap_or_default();
        let passed = match test.as_str() {
            "" => true,
            "request_url" => conn.url().as_str().contains("test=request_url"),
            "cookies" => conn.cookie("username").as_deref() == Some("john green"),
            "headers" => conn.header("X-Api-Token").as_deref() == Some("abc"),
            "reasons" => conn.query("reason").as_deref() != Some("unauthorized"),
            "uid" => match conn.query("uid").filter(|uid| !uid.is_empty()) {
                Some(uid) => {
                    conn.identified_by("uid", uid);
                    true
                }
                None => false,
            },
            "state" => {
                let visits = conn.state().get("visits").and_then(Value::as_i64).unwrap_or(0);
                conn.state_mut().set("visits", visits + 1);
                true
            }
            "late_failure" => {
                conn.transmit(&json!({ "note": "never delivered" }))?;
                conn.state_mut().set("leaked", true);
                false
            }
            _ => false,
        };
        if !passed {
            return Err(CableError::application("unauthorized"));
        }
        if let Some(user) = conn.query("user") {
            conn.identified_by("user", user);
        }
        Ok(())
    })
}

fn disconnected(conn: &mut Connection) -> BoxFuture<'_, HookResult> {
    Box::pin(async move {
        if conn.identifiers().get("uid") == Some(&json!("sticky")) {
            return Err(CableError::application("refusing to let go"));
        }
        Ok(())
    })
}

fn stream_chat<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        ch.stream_from("chat");
        Ok(())
    })
}

fn reject<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move { ch.reject() })
}

fn hello_world<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        ch.transmit("hello")?;
        ch.transmit("world")
    })
}

fn stream_a_and_b<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        ch.stream_from("a");
        ch.stream_from("b");
        Ok(())
    })
}

fn stop_everything<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        ch.stop_all_streams();
        Ok(())
    })
}

fn init_state<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        let name = ch.param("name").cloned().unwrap_or(Value::Null);
        ch.stream_from("state_counts");
        let state = ch.state_mut();
        state.set("count", 1);
        state.set("user", json!({ "name": name }));
        Ok(())
    })
}

fn notify_left<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        if ch.param("notify_disconnect").is_none() {
            return Ok(());
        }
        let name = ch
            .state()
            .and_then(|state| state.get("user"))
            .and_then(|user| user.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CableError::application("no 'user' in istate"))?;
        ch.broadcast("state_counts", &json!({ "data": format!("user left: {name}") }))
            .await?;
        Ok(())
    })
}

fn fail_after_effects<'a>(ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        ch.transmit("partial")?;
        ch.stream_from("leak");
        ch.state_mut().set("touched", true);
        Err(CableError::application("subscription refused"))
    })
}

fn refuse<'a>(_ch: &'a mut Channel<'_>) -> BoxFuture<'a, HookResult> {
    Box::pin(async move { Err(CableError::application("cannot unsubscribe")) })
}

fn tick<'a>(ch: &'a mut Channel<'_>, _data: ActionData) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        if ch.name() != "State" {
            return ch.transmit("tock");
        }
        let state = ch.state_mut();
        state.update_float("count", |v| v + 2.0)?;
        let count = state.get("count").cloned();
        let name = state.get("user").and_then(|u| u.get("name")).cloned();
        ch.transmit(&json!({ "count": count, "name": name }))
    })
}

fn echo<'a>(ch: &'a mut Channel<'_>, data: ActionData) -> BoxFuture<'a, HookResult> {
    Box::pin(async move { ch.transmit(&json!({ "response": data.get("text") })) })
}

fn unfollow<'a>(ch: &'a mut Channel<'_>, data: ActionData) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        let stream = data
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CableError::application("unfollow needs a stream name"))?;
        ch.stop_stream_from(stream);
        Ok(())
    })
}

fn speak<'a>(ch: &'a mut Channel<'_>, data: ActionData) -> BoxFuture<'a, HookResult> {
    Box::pin(async move {
        let text = data.get("text").cloned().unwrap_or(Value::Null);
        ch.broadcast("chat", &text).await?;
        Ok(())
    })
}
