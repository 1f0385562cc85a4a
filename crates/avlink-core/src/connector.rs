//! Outbound TCP connections to the streaming device.
//!
//! A connection is established with a bounded non-blocking connect, tuned (receive buffer,
//! `TCP_NODELAY`, read timeout) and returned as a [`StreamSocket`]. The socket is owned by
//! exactly one party at a time and is shut down when dropped.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use avlink_proto::{PING_REQUEST, PONG};
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::ConnectOptions;
use crate::error::{Result, StreamError};

/// Host and port of a streaming device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ));
        }
        Ok(addrs)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Exclusively owned, connected TCP stream.
#[derive(Debug)]
pub struct StreamSocket {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

impl StreamSocket {
    /// Wrap an already connected stream (for example one accepted by a listener).
    pub fn from_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        Self { stream, peer }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Write the whole buffer.
    pub fn send_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)?;
        self.stream.flush()
    }

    /// Shut down and release the connection.
    pub fn close(self) {
        drop(self);
    }
}

impl Read for StreamSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Drop for StreamSocket {
    fn drop(&mut self) {
        // NotConnected is expected when the peer already went away.
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::debug!(peer = %self, error = %e, "socket shutdown failed");
            }
        }
        tracing::debug!(peer = %self, "socket closed");
    }
}

impl fmt::Display for StreamSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peer {
            Some(addr) => write!(f, "{addr}"),
            None => f.write_str("<unknown>"),
        }
    }
}

/// Connect to `endpoint`, trying each resolved address in order.
///
/// `opts.timeout` bounds the whole attempt, not each address.
pub fn connect(endpoint: &Endpoint, opts: &ConnectOptions) -> Result<StreamSocket> {
    let deadline = Instant::now() + opts.timeout;
    let addrs = endpoint.resolve().map_err(|source| StreamError::ConnectFailed {
        addr: endpoint.to_string(),
        source,
    })?;

    let stream =
        connect_addrs(&addrs, deadline, opts).map_err(|source| StreamError::ConnectFailed {
            addr: endpoint.to_string(),
            source,
        })?;
    tracing::info!(endpoint = %endpoint, "connected");
    Ok(StreamSocket::from_stream(stream))
}

fn connect_addrs(
    addrs: &[SocketAddr],
    deadline: Instant,
    opts: &ConnectOptions,
) -> io::Result<TcpStream> {
    let mut last_err = None;
    for &addr in addrs {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"));
        }
        match connect_addr(addr, left, opts) {
            Ok(stream) => {
                tracing::debug!(addr = %addr, "connect attempt succeeded");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address to connect")))
}

fn connect_addr(
    addr: SocketAddr,
    timeout: Duration,
    opts: &ConnectOptions,
) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.connect_timeout(&addr.into(), timeout)?;

    if let Err(e) = socket.set_recv_buffer_size(opts.recv_buffer_size) {
        tracing::warn!(
            addr = %addr,
            size = opts.recv_buffer_size,
            error = %e,
            "failed to set receive buffer size"
        );
    }
    socket.set_nodelay(true)?;

    let stream: TcpStream = socket.into();
    stream.set_read_timeout(opts.read_timeout)?;
    Ok(stream)
}

/// Liveness check: send a ping and expect exactly `pong` back.
pub fn handshake(socket: &mut StreamSocket) -> Result<()> {
    socket
        .send_all(PING_REQUEST)
        .map_err(|e| StreamError::HandshakeFailed(format!("send ping: {e}")))?;

    let mut reply = [0u8; PONG.len()];
    socket
        .read_exact(&mut reply)
        .map_err(|e| StreamError::HandshakeFailed(format!("read pong: {e}")))?;

    if reply != PONG {
        return Err(StreamError::HandshakeFailed(format!(
            "unexpected reply {:?}",
            String::from_utf8_lossy(&reply)
        )));
    }
    Ok(())
}

/// [`connect`] followed by [`handshake`]. The socket is closed if the handshake fails.
pub fn connect_and_ping(endpoint: &Endpoint, opts: &ConnectOptions) -> Result<StreamSocket> {
    let mut socket = connect(endpoint, opts)?;
    handshake(&mut socket)?;
    Ok(socket)
}
