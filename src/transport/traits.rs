//! Transport trait abstraction for serving the controller over byte streams

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A connected byte stream carrying request and reply lines
#[async_trait]
pub trait TransportStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Close the transport gracefully
    async fn shutdown(&mut self) -> Result<()>;
}

/// Source of client streams, handed out one at a time
#[async_trait]
pub trait TransportAcceptor: Send {
    /// The stream type this acceptor produces
    type Stream: TransportStream;

    /// Wait for the next client, returning its stream and a peer description
    async fn accept(&mut self) -> Result<(Self::Stream, String)>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;

    /// Where clients reach this transport, for logging
    fn describe(&self) -> String;
}
