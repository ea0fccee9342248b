//! TCP listener and accept loop.
//!
//! The listening socket is built with `socket2` so the backlog is explicit,
//! then handed to tokio. Every accepted connection is moved into its own
//! detached task; the loop never waits on a handler and never exits.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::handler::{self, HandlerConfig};

/// Source of accepted connections for the accept loop.
pub trait Incoming {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Incoming for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// The server-side listening socket plus the settings handed to each handler.
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    handler: HandlerConfig,
}

impl Listener {
    /// Create, bind and listen. Must be called inside a tokio runtime.
    pub fn bind(config: &Config) -> Result<Self, SetupError> {
        let addr = config.socket_addr();
        let inner = create_listener(addr, config.backlog)?;
        let local_addr = inner.local_addr().map_err(SetupError::Register)?;

        Ok(Listener {
            inner,
            local_addr,
            handler: config.handler(),
        })
    }

    /// Bound address; differs from the configured one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop forever.
    pub async fn run(self) {
        let addr = self.local_addr();
        info!(address = %addr, port = addr.port(), "Server listening");
        serve(self.inner, self.handler).await
    }
}

/// Accept connections from `incoming` and echo on each one in its own task.
///
/// Accept errors are logged and the loop carries on.
pub async fn serve<I: Incoming>(mut incoming: I, settings: HandlerConfig) {
    loop {
        match incoming.accept().await {
            Ok((stream, peer)) => {
                info!(peer = %peer, "New connection accepted");

                tokio::spawn(async move {
                    let exchange = handler::handle_connection(stream, peer, settings).await;
                    debug!(peer = %peer, ?exchange, "Connection closed");
                });
            }
            Err(e) => {
                error!(error = %e, "Error accepting connection");
            }
        }
    }
}

fn create_listener(addr: SocketAddr, backlog: u32) -> Result<TcpListener, SetupError> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )
    .map_err(SetupError::Socket)?;

    socket.bind(&addr.into()).map_err(|e| SetupError::Bind(addr, e))?;
    socket
        .listen(backlog.min(i32::MAX as u32) as i32)
        .map_err(SetupError::Listen)?;
    socket.set_nonblocking(true).map_err(SetupError::Register)?;

    TcpListener::from_std(socket.into()).map_err(SetupError::Register)
}

/// Listener setup failures. All of them are fatal.
#[derive(Debug)]
pub enum SetupError {
    Socket(io::Error),
    Bind(SocketAddr, io::Error),
    Listen(io::Error),
    Register(io::Error),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Socket(e) => write!(f, "Error creating socket: {e}"),
            SetupError::Bind(addr, e) => write!(f, "Error binding socket to {addr}: {e}"),
            SetupError::Listen(e) => write!(f, "Error listening on socket: {e}"),
            SetupError::Register(e) => write!(f, "Error registering socket with runtime: {e}"),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Socket(e)
            | SetupError::Bind(_, e)
            | SetupError::Listen(e)
            | SetupError::Register(e) => Some(e),
        }
    }
}
