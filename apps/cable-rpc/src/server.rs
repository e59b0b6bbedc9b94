//! Protocol dispatcher: maps Connect, Command and Disconnect onto the
//! connection lifecycle and drains the socket into the response.
//!
//! Every failure that belongs to the application or the protocol comes back
//! as a FAILURE status. `Err` is only returned when the request itself cannot
//! be understood (undecodable env, identifiers token or URL).

use std::collections::HashMap;
use std::sync::Arc;

use cable_protocol::{
    CommandMessage, CommandResponse, ConnectionRequest, ConnectionResponse, DisconnectRequest,
    DisconnectResponse, Status,
};

use crate::application::Application;
use crate::broadcast::Broadcaster;
use crate::connection::Connection;
use crate::error::CableError;
use crate::logging::{CallInfo, CallLog, TracingLog, Verb};
use crate::state::IStateKind;

/// Per-call metadata supplied by the transport.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Proxy-side session id, if the transport knows it.
    pub sid: Option<String>,
}

impl CallContext {
    pub fn with_sid(sid: impl Into<String>) -> Self {
        Self {
            sid: Some(sid.into()),
        }
    }
}

pub struct Server {
    app: Arc<Application>,
    broadcaster: Broadcaster,
    log: Arc<dyn CallLog>,
}

impl Server {
    pub fn new(app: Application, broadcaster: Broadcaster) -> Self {
        Self {
            app: Arc::new(app),
            broadcaster,
            log: Arc::new(TracingLog),
        }
    }

    pub fn with_log(mut self, log: Arc<dyn CallLog>) -> Self {
        self.log = log;
        self
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn application(&self) -> &Application {
        &self.app
    }

    pub async fn connect(
        &self,
        ctx: &CallContext,
        req: ConnectionRequest,
    ) -> Result<ConnectionResponse, CableError> {
        let call = CallInfo {
            verb: Verb::Connect,
            sid: ctx.sid.as_deref(),
            command: None,
            identifier: None,
        };
        self.log.call_started(&call);

        let mut connection = self.check(
            &call,
            Connection::from_request(
                &req.path,
                &req.headers,
                &req.env,
                "",
                IStateKind::Flat,
                self.broadcaster.clone(),
            ),
        )?;

        let mut response = ConnectionResponse::default();
        match connection.handle_open(&self.app).await {
            Ok(()) => {
                response.identifiers = self.check(&call, connection.identifiers().to_json())?;
                self.check(&call, connection.socket().save_to_connection_response(&mut response))?;
                response.status = Status::Success;
            }
            Err(err) => {
                self.log.call_failed(&call, &err);
                response.error_msg = err.to_string();
            }
        }
        Ok(response)
    }

    pub async fn command(
        &self,
        ctx: &CallContext,
        req: CommandMessage,
    ) -> Result<CommandResponse, CableError> {
        let call = CallInfo {
            verb: Verb::Command,
            sid: ctx.sid.as_deref(),
            command: Some(req.command.as_str()),
            identifier: Some(req.identifier.as_str()),
        };
        self.log.call_started(&call);

        let mut connection = self.check(
            &call,
            Connection::from_request(
                "",
                &HashMap::new(),
                &req.env,
                &req.connection_identifiers,
                IStateKind::Flat,
                self.broadcaster.clone(),
            ),
        )?;

        let result = connection
            .handle_command(&self.app, &req.command, &req.identifier, &req.data)
            .await;

        // Whatever was written before a failure is still returned.
        let mut response = CommandResponse::default();
        self.check(&call, connection.socket().save_to_command_response(&mut response))?;

        match result {
            Ok(()) => response.status = Status::Success,
            Err(err) => {
                self.log.call_failed(&call, &err);
                response.error_msg = format!("error handling command {:?}: {err}", req.command);
                // A failed command must not change the client's subscriptions.
                response.streams.clear();
                response.stopped_streams.clear();
                response.stop_streams = false;
            }
        }
        Ok(response)
    }

    pub async fn disconnect(
        &self,
        ctx: &CallContext,
        req: DisconnectRequest,
    ) -> Result<DisconnectResponse, CableError> {
        let call = CallInfo {
            verb: Verb::Disconnect,
            sid: ctx.sid.as_deref(),
            command: None,
            identifier: None,
        };
        self.log.call_started(&call);

        let mut connection = self.check(
            &call,
            Connection::from_request(
                &req.path,
                &req.headers,
                &req.env,
                &req.identifiers,
                IStateKind::Scoped,
                self.broadcaster.clone(),
            ),
        )?;

        let log = &self.log;
        let closed = connection
            .handle_close(&self.app, &req.subscriptions, |subscription, err| {
                log.cleanup_failed(&call, subscription, err)
            })
            .await;

        let mut response = DisconnectResponse::default();
        if let Err(err) = closed {
            self.log.call_failed(&call, &err);
            response.error_msg = err.to_string();
            return Ok(response);
        }

        if let Err(err) = self.broadcaster.remote_disconnect(&req.identifiers).await {
            self.log
                .cleanup_failed(&call, &req.identifiers, &CableError::Broadcast(err));
        }

        response.status = Status::Success;
        Ok(response)
    }

    fn check<T>(&self, call: &CallInfo<'_>, result: Result<T, CableError>) -> Result<T, CableError> {
        if let Err(err) = &result {
            self.log.call_failed(call, err);
        }
        result
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("app", &self.app)
            .field("broadcaster", &self.broadcaster)
            .finish_non_exhaustive()
    }
}
