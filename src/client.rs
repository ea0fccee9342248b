//! Companion client.
//!
//! Mirrors one server exchange from the other side: connect, send the whole
//! message, read a single reply chunk of at most `buffer_size` bytes.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Send `message` to the server at `addr` and return the first reply chunk.
///
/// An empty reply means the server closed without echoing.
pub async fn send_message<A>(addr: A, message: &[u8], buffer_size: usize) -> io::Result<Bytes>
where
    A: ToSocketAddrs,
{
    let mut stream = TcpStream::connect(addr).await?;
    debug!(peer = %stream.peer_addr()?, bytes = message.len(), "Sending");

    stream.write_all(message).await?;

    let mut buffer = BytesMut::zeroed(buffer_size);
    let n = stream.read(&mut buffer[..]).await?;
    buffer.truncate(n);

    Ok(buffer.freeze())
}
