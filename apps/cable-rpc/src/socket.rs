//! Per-call side-effect accumulator.
//!
//! A `Socket` is built from the request's env, collects everything handlers
//! do during the call, and is drained into the response at the end.

use cable_protocol::{CommandResponse, ConnectionResponse, Env, EnvResponse};
use serde::Serialize;

use crate::error::CableError;
use crate::state::{FlatState, IState, IStateKind};

#[derive(Debug)]
pub struct Socket {
    transmissions: Vec<String>,
    streams: Vec<String>,
    stopped_streams: Vec<String>,
    stop_all_streams: bool,
    disconnect: bool,
    cstate: FlatState,
    istate: IState,
}

impl Socket {
    /// Decode both state snapshots carried by `env`.
    ///
    /// A snapshot that is not valid JSON cannot be recovered from, so it is
    /// reported as an `Environment` error rather than a FAILURE status.
    pub fn from_env(env: &Env, kind: IStateKind) -> Result<Self, CableError> {
        let cstate = FlatState::decode(&env.cstate)
            .map_err(|e| CableError::Environment(format!("cstate: {e}")))?;
        let istate = IState::decode(&env.istate, kind)
            .map_err(|e| CableError::Environment(format!("istate: {e}")))?;

        Ok(Self {
            transmissions: Vec::new(),
            streams: Vec::new(),
            stopped_streams: Vec::new(),
            stop_all_streams: false,
            disconnect: false,
            cstate,
            istate,
        })
    }

    /// Serialize `message` and queue it for the client.
    pub fn write<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<(), CableError> {
        self.transmissions.push(serde_json::to_string(message)?);
        Ok(())
    }

    pub fn subscribe(&mut self, stream: impl Into<String>) {
        self.streams.push(stream.into());
    }

    pub fn unsubscribe(&mut self, stream: impl Into<String>) {
        self.stopped_streams.push(stream.into());
    }

    pub fn unsubscribe_all(&mut self) {
        self.stop_all_streams = true;
    }

    /// Ask the proxy to close the client connection after this call.
    pub fn request_disconnect(&mut self) {
        self.disconnect = true;
    }

    pub fn transmissions(&self) -> &[String] {
        &self.transmissions
    }

    pub fn streams(&self) -> &[String] {
        &self.streams
    }

    pub fn stopped_streams(&self) -> &[String] {
        &self.stopped_streams
    }

    pub fn stops_all_streams(&self) -> bool {
        self.stop_all_streams
    }

    pub fn disconnect_requested(&self) -> bool {
        self.disconnect
    }

    pub fn cstate(&self) -> &FlatState {
        &self.cstate
    }

    pub fn cstate_mut(&mut self) -> &mut FlatState {
        &mut self.cstate
    }

    pub fn istate(&self) -> &IState {
        &self.istate
    }

    pub fn istate_mut(&mut self) -> &mut IState {
        &mut self.istate
    }

    /// State diffs accumulated so far.
    pub fn env_response(&self) -> Result<EnvResponse, CableError> {
        Ok(EnvResponse {
            cstate: self.cstate.changes()?,
            istate: self.istate.changes()?,
        })
    }

    pub fn save_to_connection_response(
        &self,
        response: &mut ConnectionResponse,
    ) -> Result<(), CableError> {
        response.transmissions = self.transmissions.clone();
        response.env = Some(self.env_response()?);
        Ok(())
    }

    pub fn save_to_command_response(&self, response: &mut CommandResponse) -> Result<(), CableError> {
        response.transmissions = self.transmissions.clone();
        response.streams = self.streams.clone();
        response.stopped_streams = self.stopped_streams.clone();
        response.stop_streams = self.stop_all_streams;
        response.disconnect = self.disconnect;
        response.env = Some(self.env_response()?);
        Ok(())
    }
}
