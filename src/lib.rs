//! Mock motorized linear-stage controller
//!
//! Answers the ASCII line protocol of a single simulated stage over TCP, a
//! real serial device, or the in-process [`transport::MockSerial`].

pub mod command;
pub mod config;
pub mod connection;
pub mod device;
pub mod transport;

pub use command::{CommandEngine, CommandError, SharedEngine};
pub use config::{ServerConfig, TcpConfig};
pub use connection::LineServer;
pub use device::DeviceState;
