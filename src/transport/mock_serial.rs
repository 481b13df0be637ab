//! In-process stand-in for a serial port
//!
//! `write` runs the request through the engine and queues the reply;
//! `readline` hands queued replies back in order. Writes are never refused for
//! lack of a matching read: each one just queues another reply.

use crate::command::{CommandEngine, SharedEngine};
use crate::transport::serial::SerialSettings;
use bytes::Bytes;
use lst_shared::codec;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, info_span, Instrument, Span};

/// Errors from the mock serial port
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SerialError {
    #[error("Port {0} is closed")]
    PortClosed(String),

    #[error("Reply queue closed")]
    QueueClosed,
}

/// Mock serial port backed by a [`CommandEngine`]
pub struct MockSerial {
    settings: SerialSettings,
    engine: SharedEngine,
    reply_tx: mpsc::UnboundedSender<String>,
    reply_rx: Mutex<mpsc::UnboundedReceiver<String>>,
    open: AtomicBool,
    span: Span,
}

impl MockSerial {
    /// Create an open port with its own simulated unit
    pub fn new(settings: SerialSettings) -> Self {
        Self::with_engine(settings, CommandEngine::default().into_shared())
    }

    /// Create an open port answering from an existing engine
    pub fn with_engine(settings: SerialSettings, engine: SharedEngine) -> Self {
        let span = info_span!("mock_serial", port = %settings.port);
        Self::with_span(settings, engine, span)
    }

    /// Create an open port that logs under the given span
    pub fn with_span(settings: SerialSettings, engine: SharedEngine, span: Span) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        span.in_scope(|| info!(baud = settings.baud_rate, "MockSerial created"));

        Self {
            settings,
            engine,
            reply_tx,
            reply_rx: Mutex::new(reply_rx),
            open: AtomicBool::new(true),
            span,
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Port name as given in the settings
    pub fn name(&self) -> &str {
        &self.settings.port
    }

    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Re-open a closed port; queued replies are kept
    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.span.in_scope(|| info!("Opening serial connection"));
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.span.in_scope(|| info!("Closing serial connection"));
    }

    /// Send one request; returns the number of bytes accepted
    pub async fn write(&self, data: &[u8]) -> Result<usize, SerialError> {
        self.ensure_open()?;

        async {
            let request = String::from_utf8_lossy(data);
            let reply = self.engine.lock().await.handle(&request);
            debug!(reply = %reply, "Queueing reply");

            self.reply_tx
                .send(reply)
                .map(|_| data.len())
                .map_err(|_| SerialError::QueueClosed)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Wait for the next queued reply, terminated with `\r\n`
    ///
    /// With a timeout configured, an empty buffer is returned once it elapses.
    pub async fn readline(&self) -> Result<Bytes, SerialError> {
        self.ensure_open()?;

        async {
            let mut replies = self.reply_rx.lock().await;
            let reply = match self.settings.timeout {
                Some(limit) => match tokio::time::timeout(limit, replies.recv()).await {
                    Ok(reply) => reply,
                    Err(_) => {
                        debug!(?limit, "Read timed out");
                        return Ok(Bytes::new());
                    }
                },
                None => replies.recv().await,
            };

            match reply {
                Some(reply) => {
                    debug!(reply = %reply, "Reading from queue");
                    Ok(codec::encode_line(&reply))
                }
                None => Err(SerialError::QueueClosed),
            }
        }
        .instrument(self.span.clone())
        .await
    }

    fn ensure_open(&self) -> Result<(), SerialError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SerialError::PortClosed(self.settings.port.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceState;
    use std::sync::Arc;
    use std::time::Duration;

    fn port() -> MockSerial {
        MockSerial::new(SerialSettings::new("/dev/mock0", 9600))
    }

    #[tokio::test]
    async fn test_write_then_readline() {
        let serial = port();
        let written = serial.write(b"/1 0 move abs 500\r\n").await.expect("write");
        assert_eq!(written, 19);
        assert_eq!(&serial.readline().await.expect("read")[..], b"@1 0 OK IDLE -- 0\r\n");

        serial.write(b"/1 0 get pos\n").await.expect("write");
        assert_eq!(&serial.readline().await.expect("read")[..], b"@1 0 OK IDLE -- 500\r\n");
    }

    #[tokio::test]
    async fn test_extra_writes_queue_extra_replies() {
        let serial = port();
        serial.write(b"/1 0 move abs 3\n").await.expect("write");
        serial.write(b"/1 0 get pos\n").await.expect("write");
        serial.write(b"/1\n").await.expect("write");

        assert_eq!(&serial.readline().await.expect("read")[..], b"@1 0 OK IDLE -- 0\r\n");
        assert_eq!(&serial.readline().await.expect("read")[..], b"@1 0 OK IDLE -- 3\r\n");
        assert_eq!(&serial.readline().await.expect("read")[..], b"@1 0 OK IDLE -- 0\r\n");
    }

    #[tokio::test]
    async fn test_readline_waits_for_write() {
        let serial = Arc::new(port());

        let reader = {
            let serial = serial.clone();
            tokio::spawn(async move { serial.readline().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        serial.write(b"/1 0 get device.id\n").await.expect("write");
        let line = reader.await.expect("join").expect("read");
        assert_eq!(&line[..], b"@1 0 OK IDLE -- 30342\r\n");
    }

    #[tokio::test]
    async fn test_readline_timeout_returns_empty() {
        let settings = SerialSettings {
            timeout: Some(Duration::from_millis(10)),
            ..SerialSettings::new("/dev/mock1", 9600)
        };
        let serial = MockSerial::new(settings);
        assert!(serial.readline().await.expect("read").is_empty());
    }

    #[tokio::test]
    async fn test_closed_port_rejects_io() {
        let serial = port();
        serial.close();
        assert!(!serial.is_open());
        assert_eq!(
            serial.write(b"/1 0 status\n").await,
            Err(SerialError::PortClosed("/dev/mock0".into()))
        );
        assert!(serial.readline().await.is_err());

        serial.open();
        serial.write(b"/1 0 status\n").await.expect("write after reopen");
        assert!(!serial.readline().await.expect("read").is_empty());
    }

    #[tokio::test]
    async fn test_shared_engine_between_ports() {
        let engine = CommandEngine::new(DeviceState::new(2)).into_shared();
        let first = MockSerial::with_engine(SerialSettings::new("/dev/mockA", 9600), engine.clone());
        let second = MockSerial::with_engine(SerialSettings::new("/dev/mockB", 9600), engine);

        first.write(b"/1 0 move abs 64\n").await.expect("write");
        first.readline().await.expect("read");

        second.write(b"/1 0 get pos\n").await.expect("write");
        assert_eq!(&second.readline().await.expect("read")[..], b"@2 0 OK IDLE -- 64\r\n");
    }
}
