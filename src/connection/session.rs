//! A single client session: request lines in, reply lines out

use crate::command::SharedEngine;
use crate::transport::TransportStream;
use anyhow::Result;
use bytes::BytesMut;
use lst_shared::codec::{self, LineDecoder};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info};

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its side
    Closed,
    /// Nothing was received within the configured idle timeout
    IdleTimeout,
}

/// Serve one stream until the client goes away.
///
/// Every complete line gets exactly one reply, in order. The engine is locked
/// only while a line is being handled, never while waiting for input.
pub async fn serve_session<S: TransportStream>(
    stream: &mut S,
    engine: &SharedEngine,
    read_timeout: Option<Duration>,
) -> Result<SessionEnd> {
    let mut decoder = LineDecoder::new();
    let mut read_buf = vec![0u8; 1024];
    let mut replies = BytesMut::new();

    loop {
        while let Some(line) = decoder.decode_next()? {
            let reply = engine.lock().await.handle(&line);
            codec::encode_line_into(&reply, &mut replies);
        }

        if !replies.is_empty() {
            stream.write_all(&replies).await?;
            stream.flush().await?;
            replies.clear();
        }

        let read = match read_timeout {
            Some(limit) => match timeout(limit, stream.read(&mut read_buf)).await {
                Ok(result) => result?,
                Err(_) => {
                    info!(?limit, "Idle timeout");
                    return Ok(SessionEnd::IdleTimeout);
                }
            },
            None => stream.read(&mut read_buf).await?,
        };

        if read == 0 {
            if decoder.buffer_len() > 0 {
                debug!(bytes = decoder.buffer_len(), "Discarding unterminated request");
            }
            return Ok(SessionEnd::Closed);
        }

        decoder.extend(&read_buf[..read]);
    }
}
