//! Serving the controller over a transport
//!
//! This module handles:
//! - Accepting one client at a time and serving it to completion
//! - Reading request lines and writing reply lines
//! - Optional idle-read timeout per client
//! - Shutdown on request

mod server;
mod session;

pub use server::LineServer;
pub use session::{serve_session, SessionEnd};
