//! TCP transport: a listener handing out one client connection at a time

use crate::config::TcpConfig;
use crate::transport::traits::{TransportAcceptor, TransportStream};
use anyhow::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

#[async_trait]
impl TransportStream for TcpStream {
    async fn shutdown(&mut self) -> Result<()> {
        tokio::io::AsyncWriteExt::shutdown(self).await?;
        Ok(())
    }
}

/// Accepts TCP clients on a bound listener
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Bind the listener; port 0 picks an ephemeral port
    pub async fn bind(config: &TcpConfig) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl TransportAcceptor for TcpAcceptor {
    type Stream = TcpStream;

    async fn accept(&mut self) -> Result<(Self::Stream, String)> {
        let (stream, addr) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, addr.to_string()))
    }

    fn name(&self) -> &'static str {
        "TCP"
    }

    fn describe(&self) -> String {
        match self.listener.local_addr() {
            Ok(addr) => format!("tcp://{}", addr),
            Err(_) => "tcp://<unbound>".into(),
        }
    }
}
