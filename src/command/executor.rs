//! Command engine - parses, validates and dispatches request lines

use super::handlers;
use crate::device::DeviceState;
use lst_shared::state_machine::{
    FallbackReason, RequestEvent, RequestState, RequestStateMachine,
};
use lst_shared::{CommandName, ParsedCommand, ProtocolError, Reply};
use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Span};

/// Engine shared between transports; lock only around [`CommandEngine::handle`]
pub type SharedEngine = Arc<Mutex<CommandEngine>>;

/// Reasons a named command could not be executed
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{command} expects {expected} parameter(s), got {supplied}")]
    ArgumentCount {
        command: CommandName,
        expected: usize,
        supplied: usize,
    },

    #[error("Invalid integer {value:?}: {source}")]
    InvalidInteger {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Relative move of {offset} from {position} overflows")]
    PositionOverflow { position: i64, offset: i64 },
}

/// Turns request lines into reply lines against one simulated unit
pub struct CommandEngine {
    device: DeviceState,
    requests: RequestStateMachine,
    span: Span,
}

impl CommandEngine {
    /// Create an engine logging under its own `engine` span
    pub fn new(device: DeviceState) -> Self {
        let span = info_span!("engine", device = device.device_number());
        Self::with_span(device, span)
    }

    /// Create an engine that logs under the given span
    pub fn with_span(device: DeviceState, span: Span) -> Self {
        Self {
            device,
            requests: RequestStateMachine::new(),
            span,
        }
    }

    /// Wrap the engine for use by several transports
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    /// Handle one raw request line and return the reply line (no terminator).
    ///
    /// Always answers: anything that cannot be executed gets the status snapshot.
    pub fn handle(&mut self, raw_line: &str) -> String {
        let span = self.span.clone();
        let _enter = span.enter();

        info!(request = raw_line.trim_end_matches(['\r', '\n']), "Request received");

        let reply = match self.advance(RequestEvent::LineReceived(raw_line.to_string())) {
            RequestState::Dispatch(command) => match self.dispatch(&command) {
                Ok(reply) => reply,
                Err(e) => {
                    let reason = FallbackReason::Rejected {
                        command: command.command,
                        reason: e.to_string(),
                    };
                    self.advance(RequestEvent::Rejected(reason));
                    self.respond_status()
                }
            },
            RequestState::RespondStatus(_) | RequestState::Ready => self.respond_status(),
        };

        self.advance(RequestEvent::Replied);

        let reply = reply.to_string();
        debug!(reply = %reply, "Reply ready");
        reply
    }

    /// Resolve the command and run its handler
    fn dispatch(&mut self, command: &ParsedCommand) -> Result<Reply, CommandError> {
        let name = command.command_name()?;
        let params = command.parameters.as_slice();
        match name {
            CommandName::Identify => handlers::handle_identify(&self.device, params),
            CommandName::Status => handlers::handle_status(&self.device, params),
            CommandName::Get => handlers::handle_get(&self.device, params),
            CommandName::Home => handlers::handle_home(&self.device, params),
            CommandName::Move => handlers::handle_move(&mut self.device, params),
        }
    }

    /// Answer the current request with the status snapshot
    fn respond_status(&self) -> Reply {
        if let RequestState::RespondStatus(reason) = self.requests.state() {
            match reason {
                FallbackReason::ShortFrame { .. } => debug!(%reason, "Answering with status"),
                FallbackReason::Rejected { .. } => warn!(%reason, "Answering with status"),
            }
        }
        self.device.snapshot()
    }

    fn advance(&mut self, event: RequestEvent) -> RequestState {
        match self.requests.process_event(event) {
            Ok(state) => state.clone(),
            Err(e) => {
                error!("{}", e);
                self.requests = RequestStateMachine::new();
                RequestState::Ready
            }
        }
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new(DeviceState::default())
    }
}
