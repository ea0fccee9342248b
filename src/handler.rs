//! Connection handler.
//!
//! One exchange per connection: a single bounded read, an echo of whatever
//! arrived, then close. There is no loop and no retry; anything the peer
//! sends beyond the first read is never consumed.

use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::WriteMode;

/// Per-connection settings, copied into each handler task.
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    /// Capacity of the transfer buffer; the most bytes one exchange echoes.
    pub buffer_size: usize,
    pub write_mode: WriteMode,
}

/// Which branch a handler took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Data arrived and was written back (possibly short, in single mode).
    Echoed { received: usize },
    /// Peer closed without sending anything.
    Disconnected,
    /// The read failed.
    ReceiveFailed(io::ErrorKind),
}

/// Handle one client connection: receive, echo, close.
///
/// The stream is closed on every path before this returns.
pub async fn handle_connection<S>(mut stream: S, peer: SocketAddr, config: HandlerConfig) -> Exchange
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::zeroed(config.buffer_size);

    let exchange = match stream.read(&mut buffer[..]).await {
        Ok(0) => {
            info!(peer = %peer, "Client disconnected");
            Exchange::Disconnected
        }
        Err(e) => {
            warn!(peer = %peer, error = %e, "Error receiving data");
            Exchange::ReceiveFailed(e.kind())
        }
        Ok(n) => {
            let payload = &buffer[..n];
            info!(
                peer = %peer,
                bytes = n,
                payload = %String::from_utf8_lossy(payload),
                "Received"
            );
            echo(&mut stream, payload, config.write_mode, peer).await;
            Exchange::Echoed { received: n }
        }
    };

    // Close
    let _ = stream.shutdown().await;
    drop(stream);

    exchange
}

async fn echo<S>(stream: &mut S, payload: &[u8], mode: WriteMode, peer: SocketAddr)
where
    S: AsyncWrite + Unpin,
{
    match mode {
        WriteMode::Single => {
            let _ = stream.write(payload).await;
        }
        WriteMode::Full => {
            if let Err(e) = stream.write_all(payload).await {
                debug!(peer = %peer, error = %e, "Echo write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio_test::io::Builder;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn config(write_mode: WriteMode) -> HandlerConfig {
        HandlerConfig {
            buffer_size: 1024,
            write_mode,
        }
    }

    #[tokio::test]
    async fn test_ping_is_echoed() {
        let mock = Builder::new().read(b"ping").write(b"ping").build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Single)).await;
        assert_eq!(exchange, Exchange::Echoed { received: 4 });
    }

    #[tokio::test]
    async fn test_full_write_mode_echoes() {
        let mock = Builder::new()
            .read(b"hello world")
            .write(b"hello world")
            .build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Full)).await;
        assert_eq!(exchange, Exchange::Echoed { received: 11 });
    }

    #[tokio::test]
    async fn test_single_write_drops_shortfall() {
        // The transport takes two of four bytes; no second write is attempted.
        let mock = Builder::new().read(b"ping").write(b"pi").build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Single)).await;
        assert_eq!(exchange, Exchange::Echoed { received: 4 });
    }

    #[tokio::test]
    async fn test_full_write_sends_every_byte() {
        let mock = Builder::new()
            .read(b"ping")
            .write(b"pi")
            .write(b"ng")
            .build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Full)).await;
        assert_eq!(exchange, Exchange::Echoed { received: 4 });
    }

    #[tokio::test]
    async fn test_binary_payload_is_echoed_unchanged() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let mock = Builder::new().read(&payload).write(&payload).build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Single)).await;
        assert_eq!(exchange, Exchange::Echoed { received: 256 });
    }

    #[tokio::test]
    async fn test_eof_is_disconnect() {
        // No actions: the first read reports EOF and any write would fail.
        let mock = Builder::new().build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Single)).await;
        assert_eq!(exchange, Exchange::Disconnected);
    }

    #[tokio::test]
    async fn test_read_error_skips_echo() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let exchange = handle_connection(mock, peer(), config(WriteMode::Full)).await;
        assert_eq!(exchange, Exchange::ReceiveFailed(io::ErrorKind::ConnectionReset));
    }

    #[tokio::test]
    async fn test_oversized_payload_is_truncated() {
        let (mut client, server) = duplex(4096);
        let payload: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();
        client.write_all(&payload).await.unwrap();

        let exchange = handle_connection(server, peer(), config(WriteMode::Single)).await;
        assert_eq!(exchange, Exchange::Echoed { received: 1024 });

        let mut echoed = Vec::new();
        client.read_to_end(&mut echoed).await.unwrap();
        assert_eq!(echoed, &payload[..1024]);
    }

    #[tokio::test]
    async fn test_small_buffer_limits_echo() {
        let (mut client, server) = duplex(64);
        client.write_all(b"abcdefgh").await.unwrap();

        let settings = HandlerConfig {
            buffer_size: 3,
            write_mode: WriteMode::Full,
        };
        let exchange = handle_connection(server, peer(), settings).await;
        assert_eq!(exchange, Exchange::Echoed { received: 3 });

        let mut echoed = Vec::new();
        client.read_to_end(&mut echoed).await.unwrap();
        assert_eq!(echoed, b"abc");
    }

    #[tokio::test]
    async fn test_empty_input_closes_silently() {
        let (mut client, server) = duplex(64);
        client.shutdown().await.unwrap();

        let exchange = handle_connection(server, peer(), config(WriteMode::Single)).await;
        assert_eq!(exchange, Exchange::Disconnected);

        let mut echoed = Vec::new();
        client.read_to_end(&mut echoed).await.unwrap();
        assert!(echoed.is_empty());
    }
}
