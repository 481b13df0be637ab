//! Runtime configuration for the mock controller

use crate::transport::SerialSettings;
use lst_shared::device::DEFAULT_DEVICE_NUMBER;
use std::time::Duration;

/// Default TCP listen address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP listen port
pub const DEFAULT_PORT: u16 = 5000;

/// TCP listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    pub host: String,
    /// Port 0 binds an ephemeral port
    pub port: u16,
}

impl TcpConfig {
    /// Address in `host:port` form, for logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

/// Everything needed to start the controller
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Number echoed after `@` in every reply
    pub device_number: u32,
    /// TCP listener settings
    pub tcp: TcpConfig,
    /// Also serve on a real serial device when set
    pub serial: Option<SerialSettings>,
    /// Drop clients silent for longer than this
    pub read_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            device_number: DEFAULT_DEVICE_NUMBER,
            tcp: TcpConfig::default(),
            serial: None,
            read_timeout: None,
        }
    }
}
