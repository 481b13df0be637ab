//! Command execution for the simulated controller
//!
//! This module handles:
//! - Running each request line through the request state machine
//! - Resolving the command name and checking its parameter count
//! - Dispatching to the matching handler
//! - Answering everything else with the status snapshot

mod executor;
pub mod handlers;

pub use executor::{CommandEngine, CommandError, SharedEngine};
