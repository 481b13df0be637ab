//! Serial transport: serves the controller on a real serial device
//!
//! Useful with one end of a pseudo-terminal pair, the other end handed to the
//! software under test.

use crate::transport::traits::{TransportAcceptor, TransportStream};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

/// Default line speed
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Delay before re-opening a device whose session has ended
const REOPEN_DELAY: Duration = Duration::from_secs(1);

/// Serial line settings
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    /// Device path (e.g., "/dev/ttyUSB0" or "/dev/pts/3")
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Read timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// 8N1 settings without flow control
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Default::default()
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: None,
        }
    }
}

#[async_trait]
impl TransportStream for SerialStream {
    async fn shutdown(&mut self) -> Result<()> {
        tokio::io::AsyncWriteExt::shutdown(self).await?;
        Ok(())
    }
}

/// Opens the configured device each time a session is needed
pub struct SerialAcceptor {
    settings: SerialSettings,
    opened_before: bool,
}

impl SerialAcceptor {
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            opened_before: false,
        }
    }
}

#[async_trait]
impl TransportAcceptor for SerialAcceptor {
    type Stream = SerialStream;

    async fn accept(&mut self) -> Result<(Self::Stream, String)> {
        if self.opened_before {
            tokio::time::sleep(REOPEN_DELAY).await;
        }

        let settings = &self.settings;
        debug!(port = %settings.port, baud = settings.baud_rate, "Opening serial device");

        let stream = tokio_serial::new(settings.port.as_str(), settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .flow_control(settings.flow_control)
            .open_native_async()
            .map_err(|e| anyhow!("Failed to open {}: {}", settings.port, e))?;

        self.opened_before = true;
        Ok((stream, settings.port.clone()))
    }

    fn name(&self) -> &'static str {
        "Serial"
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.settings.port, self.settings.baud_rate)
    }
}
