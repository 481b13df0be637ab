//! Request State Machine
//!
//! Every request line walks `Ready -> Dispatch | RespondStatus -> Ready`.
//! Short frames and rejected commands both land in `RespondStatus`, so the
//! controller always answers with a well-formed reply.

use crate::protocol::ParsedCommand;
use std::fmt;
use thiserror::Error;

/// Why a request is being answered with the status snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Fewer tokens than needed to name a command
    ShortFrame { tokens: usize },
    /// A command was named but could not be executed
    Rejected { command: String, reason: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ShortFrame { tokens } => {
                write!(f, "short frame ({} tokens)", tokens)
            }
            FallbackReason::Rejected { command, reason } => {
                write!(f, "{:?} rejected: {}", command, reason)
            }
        }
    }
}

/// Where the current request is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    /// Waiting for a request line
    #[default]
    Ready,
    /// A command was parsed and should be executed
    Dispatch(ParsedCommand),
    /// The request is answered with the status snapshot
    RespondStatus(FallbackReason),
}

/// Events that drive request handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    /// A raw request line arrived
    LineReceived(String),
    /// The dispatched command could not be executed
    Rejected(FallbackReason),
    /// The reply has been produced
    Replied,
}

/// Errors from driving the machine with an event its state does not accept
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} on {event:?}")]
    Invalid {
        from: RequestState,
        event: RequestEvent,
    },
}

/// Tracks one request at a time from arrival to reply
#[derive(Debug, Default)]
pub struct RequestStateMachine {
    current_state: RequestState,
}

impl RequestStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState {
        &self.current_state
    }

    /// Apply an event, returning the new state
    pub fn process_event(&mut self, event: RequestEvent) -> Result<&RequestState, TransitionError> {
        let next = match (&self.current_state, event) {
            (RequestState::Ready, RequestEvent::LineReceived(line)) => {
                match ParsedCommand::parse(&line) {
                    Some(command) => RequestState::Dispatch(command),
                    None => RequestState::RespondStatus(FallbackReason::ShortFrame {
                        tokens: crate::protocol::tokenize(&line).len(),
                    }),
                }
            }

            (RequestState::Dispatch(_), RequestEvent::Rejected(reason)) => {
                RequestState::RespondStatus(reason)
            }

            (RequestState::Dispatch(_) | RequestState::RespondStatus(_), RequestEvent::Replied) => {
                RequestState::Ready
            }

            (from, event) => {
                return Err(TransitionError::Invalid {
                    from: from.clone(),
                    event,
                });
            }
        };

        self.current_state = next;
        Ok(&self.current_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let fsm = RequestStateMachine::new();
        assert_eq!(fsm.state(), &RequestState::Ready);
    }

    #[test]
    fn test_well_formed_line_dispatches() {
        let mut fsm = RequestStateMachine::new();
        let state = fsm
            .process_event(RequestEvent::LineReceived("/1 0 get pos".into()))
            .expect("valid transition");
        assert!(matches!(state, RequestState::Dispatch(cmd) if cmd.command == "get"));

        let state = fsm.process_event(RequestEvent::Replied).expect("valid transition");
        assert_eq!(state, &RequestState::Ready);
    }

    #[test]
    fn test_short_line_responds_status() {
        let mut fsm = RequestStateMachine::new();
        let state = fsm
            .process_event(RequestEvent::LineReceived("/1".into()))
            .expect("valid transition");
        assert_eq!(
            state,
            &RequestState::RespondStatus(FallbackReason::ShortFrame { tokens: 1 })
        );
    }

    #[test]
    fn test_rejected_dispatch_responds_status() {
        let mut fsm = RequestStateMachine::new();
        fsm.process_event(RequestEvent::LineReceived("/1 0 spin".into()))
            .expect("valid transition");

        let reason = FallbackReason::Rejected {
            command: "spin".into(),
            reason: "unknown command".into(),
        };
        let state = fsm
            .process_event(RequestEvent::Rejected(reason.clone()))
            .expect("valid transition");
        assert_eq!(state, &RequestState::RespondStatus(reason));

        fsm.process_event(RequestEvent::Replied).expect("valid transition");
        assert_eq!(fsm.state(), &RequestState::Ready);
    }

    #[test]
    fn test_invalid_transitions_keep_state() {
        let mut fsm = RequestStateMachine::new();
        let result = fsm.process_event(RequestEvent::Replied);
        assert!(matches!(result, Err(TransitionError::Invalid { .. })));
        assert_eq!(fsm.state(), &RequestState::Ready);

        fsm.process_event(RequestEvent::LineReceived("".into()))
            .expect("valid transition");
        let result = fsm.process_event(RequestEvent::LineReceived("/1 0 status".into()));
        assert!(result.is_err());
        assert!(matches!(fsm.state(), RequestState::RespondStatus(_)));
    }
}
