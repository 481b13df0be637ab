//! Line server: accepts one client at a time and serves it to completion

use super::session::{serve_session, SessionEnd};
use crate::command::SharedEngine;
use crate::transport::{TransportAcceptor, TransportStream};
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument, Span};

/// Delay before accepting again after a failed accept
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Serves the shared engine over one transport.
///
/// Further clients wait in the transport's backlog until the current one
/// disconnects.
pub struct LineServer<A: TransportAcceptor> {
    acceptor: A,
    engine: SharedEngine,
    read_timeout: Option<Duration>,
    span: Span,
}

impl<A: TransportAcceptor> LineServer<A> {
    /// Create a server logging under its own `server` span
    pub fn new(acceptor: A, engine: SharedEngine) -> Self {
        let span = info_span!("server", transport = acceptor.name());
        Self::with_span(acceptor, engine, span)
    }

    /// Create a server that logs under the given span
    pub fn with_span(acceptor: A, engine: SharedEngine, span: Span) -> Self {
        Self {
            acceptor,
            engine,
            read_timeout: None,
            span,
        }
    }

    /// Drop clients that stay silent for longer than `read_timeout`
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Accept and serve clients until the process ends
    pub async fn run(&mut self) -> Result<()> {
        let span = self.span.clone();
        self.accept_loop().instrument(span).await
    }

    async fn accept_loop(&mut self) -> Result<()> {
        info!(endpoint = %self.acceptor.describe(), "Listening for clients");
        loop {
            if let Err(e) = self.serve_next().await {
                error!("Accept failed: {}", e);
                sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }

    /// Serve clients until `shutdown` resolves
    ///
    /// A client being served when shutdown arrives is dropped.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let span = self.span.clone();
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                span.in_scope(|| info!("Server shutting down"));
                Ok(())
            }
        }
    }

    /// Accept one client and serve it until it goes away.
    ///
    /// Only a failure to accept is returned as an error; session failures are
    /// logged and end that session alone.
    pub async fn serve_next(&mut self) -> Result<Option<SessionEnd>> {
        let (mut stream, peer) = self.acceptor.accept().await?;

        let session_span = info_span!("session", peer = %peer);
        let outcome = async {
            info!("Client connected");
            let result = serve_session(&mut stream, &self.engine, self.read_timeout).await;

            match &result {
                Ok(SessionEnd::Closed) => info!("Client disconnected"),
                Ok(SessionEnd::IdleTimeout) => info!("Client dropped after idle timeout"),
                Err(e) => warn!("Session ended with error: {}", e),
            }

            if let Err(e) = TransportStream::shutdown(&mut stream).await {
                warn!("Shutdown failed: {}", e);
            }
            result.ok()
        }
        .instrument(session_span)
        .await;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandEngine;
    use crate::config::TcpConfig;
    use crate::device::DeviceState;
    use crate::transport::TcpAcceptor;
    use std::net::SocketAddr;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    async fn start_server(
        engine: SharedEngine,
        read_timeout: Option<Duration>,
    ) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let acceptor = TcpAcceptor::bind(&TcpConfig {
            host: "127.0.0.1".into(),
            port: 0,
        })
        .await
        .expect("bind");
        let addr = acceptor.local_addr().expect("local addr");

        let (stop_tx, stop_rx) = oneshot::channel();
        let mut server = LineServer::new(acceptor, engine).with_read_timeout(read_timeout);
        let handle = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        (addr, stop_tx, handle)
    }

    struct Client {
        stream: BufReader<TcpStream>,
    }

    impl Client {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.expect("connect");
            Self {
                stream: BufReader::new(stream),
            }
        }

        async fn send(&mut self, request: &str) {
            self.stream
                .write_all(format!("{}\n", request).as_bytes())
                .await
                .expect("write");
        }

        async fn recv(&mut self) -> String {
            let mut line = String::new();
            self.stream.read_line(&mut line).await.expect("read");
            line
        }

        async fn query(&mut self, request: &str) -> String {
            self.send(request).await;
            self.recv().await
        }
    }

    #[tokio::test]
    async fn test_polling_session_over_tcp() {
        let (addr, stop, handle) = start_server(CommandEngine::default().into_shared(), None).await;
        let mut client = Client::connect(addr).await;

        assert_eq!(client.query("/1 identify").await, "@1 0 OK IDLE -- 0\r\n");
        assert_eq!(client.query("/1 0 move abs 500").await, "@1 0 OK IDLE -- 0\r\n");
        assert_eq!(client.query("/1 0 get pos").await, "@1 0 OK IDLE -- 500\r\n");
        assert_eq!(client.query("/1 0 move rel -20").await, "@1 0 OK IDLE -- 0\r\n");
        assert_eq!(client.query("/1 0 get pos").await, "@1 0 OK IDLE -- 480\r\n");
        assert_eq!(client.query("").await, "@1 0 OK IDLE -- 0\r\n");
        assert_eq!(client.query("/1").await, "@1 0 OK IDLE -- 0\r\n");
        assert_eq!(client.query("/1 0 get device.id").await, "@1 0 OK IDLE -- 30342\r\n");
        assert_eq!(client.query("/1 0 unknown").await, "@1 0 OK IDLE -- 0\r\n");

        let _ = stop.send(());
        handle.await.expect("join").expect("server");
    }

    #[tokio::test]
    async fn test_state_survives_reconnect() {
        let engine = CommandEngine::new(DeviceState::new(3)).into_shared();
        let (addr, stop, handle) = start_server(engine.clone(), None).await;

        let mut first = Client::connect(addr).await;
        assert_eq!(first.query("/1 0 move abs 42").await, "@3 0 OK IDLE -- 0\r\n");
        drop(first);

        let mut second = Client::connect(addr).await;
        assert_eq!(second.query("/1 0 get pos").await, "@3 0 OK IDLE -- 42\r\n");
        assert_eq!(engine.lock().await.device().position(), 42);

        let _ = stop.send(());
        handle.await.expect("join").expect("server");
    }

    #[tokio::test]
    async fn test_second_client_waits_for_first() {
        let (addr, stop, handle) = start_server(CommandEngine::default().into_shared(), None).await;

        let mut first = Client::connect(addr).await;
        assert_eq!(first.query("/1 0 status").await, "@1 0 OK IDLE -- 0\r\n");

        let mut second = Client::connect(addr).await;
        second.send("/1 0 get device.id").await;
        let early = timeout(Duration::from_millis(100), second.recv()).await;
        assert!(early.is_err(), "second client answered while first connected");

        drop(first);
        let reply = timeout(Duration::from_secs(2), second.recv())
            .await
            .expect("second client answered after first left");
        assert_eq!(reply, "@1 0 OK IDLE -- 30342\r\n");

        let _ = stop.send(());
        handle.await.expect("join").expect("server");
    }

    #[tokio::test]
    async fn test_idle_client_is_dropped() {
        let (addr, stop, handle) = start_server(
            CommandEngine::default().into_shared(),
            Some(Duration::from_millis(50)),
        )
        .await;

        let mut client = Client::connect(addr).await;
        let eof = timeout(Duration::from_secs(2), client.recv())
            .await
            .expect("server closed idle client");
        assert!(eof.is_empty());

        let mut next = Client::connect(addr).await;
        assert_eq!(next.query("/1 0 status").await, "@1 0 OK IDLE -- 0\r\n");

        let _ = stop.send(());
        handle.await.expect("join").expect("server");
    }
}
