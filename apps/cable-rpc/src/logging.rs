//! Structured call logging for the dispatcher.
//!
//! The dispatcher never logs ad hoc; it reports to a [`CallLog`] at call
//! entry, on call failure, and for each subscription that fails to clean up
//! during Disconnect.

use std::fmt;

use crate::error::CableError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Connect,
    Command,
    Disconnect,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Connect => "connect",
            Verb::Command => "command",
            Verb::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is known about a call when it is logged.
#[derive(Debug, Clone, Copy)]
pub struct CallInfo<'a> {
    pub verb: Verb,
    pub sid: Option<&'a str>,
    /// Command verb (`subscribe`, ...) for Command calls.
    pub command: Option<&'a str>,
    /// Channel identifier for Command calls.
    pub identifier: Option<&'a str>,
}

pub trait CallLog: Send + Sync {
    fn call_started(&self, call: &CallInfo<'_>);
    fn call_failed(&self, call: &CallInfo<'_>, error: &CableError);
    fn cleanup_failed(&self, call: &CallInfo<'_>, subscription: &str, error: &CableError);
}

/// Default [`CallLog`]: emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl CallLog for TracingLog {
    fn call_started(&self, call: &CallInfo<'_>) {
        tracing::debug!(
            verb = %call.verb,
            sid = call.sid,
            command = call.command,
            identifier = call.identifier,
            "rpc call"
        );
    }

    fn call_failed(&self, call: &CallInfo<'_>, error: &CableError) {
        tracing::warn!(
            verb = %call.verb,
            sid = call.sid,
            command = call.command,
            identifier = call.identifier,
            error = %error,
            "rpc call failed"
        );
    }

    fn cleanup_failed(&self, call: &CallInfo<'_>, subscription: &str, error: &CableError) {
        tracing::warn!(
            verb = %call.verb,
            sid = call.sid,
            identifier = subscription,
            error = %error,
            "unsubscribe on disconnect failed"
        );
    }
}
