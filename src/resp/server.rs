use std::io;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use redis_protocol::resp2::decode::decode;
use redis_protocol::resp2::encode::encode;
use redis_protocol::resp2::types::OwnedFrame as RespFrame;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::handler::handle_command;
use crate::QueueRegistry;

#[derive(Debug, Clone)]
pub struct RespConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RespConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6379,
        }
    }
}

impl RespConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// RESP Server
pub struct RespServer {
    config: RespConfig,
    registry: Arc<QueueRegistry>,
}

impl RespServer {
    pub fn new(config: RespConfig, registry: Arc<QueueRegistry>) -> Self {
        Self { config, registry }
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    ///
    /// Cancelling `shutdown` stops accepting and releases every blocked
    /// `BRPOP` across all connections.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> io::Result<()> {
        tracing::info!("tubeq RESP server listening on {}", listener.local_addr()?);

        loop {
            let (socket, peer_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = shutdown.cancelled() => {
                    tracing::info!("RESP server shutting down");
                    return Ok(());
                }
            };
            tracing::debug!("New connection from {}", peer_addr);

            let registry = self.registry.clone();
            let shutdown = shutdown.clone();

            tokio::spawn(async move {
                match handle_connection(socket, registry, shutdown).await {
                    Ok(()) => tracing::debug!("Connection from {} closed", peer_addr),
                    Err(e) => tracing::error!("Connection error: {} (kind: {:?})", e, e.kind()),
                }
            });
        }
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    registry: Arc<QueueRegistry>,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        loop {
            match decode(&buffer) {
                Ok(Some((frame, consumed))) => {
                    tracing::trace!("Received frame: {:?}", frame);
                    buffer.advance(consumed);

                    let cancel = shutdown.child_token();
                    let command = handle_command(frame, &registry, &cancel);
                    tokio::pin!(command);

                    // Keep reading while the command runs so a peer hanging up
                    // mid-BRPOP cancels the wait.
                    let response = tokio::select! {
                        biased;
                        response = &mut command => response,
                        closed = wait_for_close(&mut socket, &mut buffer) => {
                            cancel.cancel();
                            command.await;
                            return closed;
                        }
                    };

                    if let Some(response) = response {
                        write_frame(&mut socket, &response).await?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Parse error: {:?}", e);
                    write_frame(&mut socket, &RespFrame::Error(format!("ERR {}", e))).await?;
                    buffer.clear();
                    break;
                }
            }
        }

        tokio::select! {
            read = socket.read_buf(&mut buffer) => {
                if read? == 0 {
                    return Ok(());
                }
            }
            _ = shutdown.cancelled() => return Ok(()),
        }
    }
}

/// Resolves once the peer closes its side. Pipelined input that arrives in
/// the meantime is kept in `buffer` for the next command.
async fn wait_for_close(socket: &mut TcpStream, buffer: &mut BytesMut) -> io::Result<()> {
    loop {
        if socket.read_buf(buffer).await? == 0 {
            return Ok(());
        }
    }
}

async fn write_frame(socket: &mut TcpStream, frame: &RespFrame) -> io::Result<()> {
    let mut bytes = vec![0u8; encoded_len_hint(frame)];
    let written = encode(&mut bytes, frame).map_err(|e| {
        tracing::error!("Encode error: {:?}", e);
        io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e))
    })?;
    socket.write_all(&bytes[..written]).await
}

/// Upper bound on the encoded size of `frame`.
fn encoded_len_hint(frame: &RespFrame) -> usize {
    const OVERHEAD: usize = 32;

    match frame {
        RespFrame::Array(frames) => OVERHEAD + frames.iter().map(encoded_len_hint).sum::<usize>(),
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => OVERHEAD + data.len(),
        RespFrame::Error(message) => OVERHEAD + message.len(),
        _ => OVERHEAD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_hint_covers_nested_payloads() {
        let frame = RespFrame::Array(vec![
            RespFrame::BulkString(b"jobs".to_vec()),
            RespFrame::BulkString(vec![b'x'; 100_000]),
        ]);
        let mut bytes = vec![0u8; encoded_len_hint(&frame)];

        assert!(encode(&mut bytes, &frame).is_ok());
    }
}
