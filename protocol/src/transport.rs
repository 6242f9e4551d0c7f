//! TCP transport with optional mutual TLS. Every outbound dial uses a
//! 1-second connect timeout, matching the cluster-wide cancellation policy.

use crate::tls::server_name;
use rustls::{ClientConnection, ServerConnection, StreamOwned};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

const DIAL_TIMEOUT: Duration = Duration::from_secs(1);

/// A data-plane or control-plane connection, cleartext or mutually
/// authenticated, exposed uniformly to the framing layer.
pub enum Connection {
    Plain(TcpStream),
    TlsClient(Box<StreamOwned<ClientConnection, TcpStream>>),
    TlsServer(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl Connection {
    pub fn try_clone(&self) -> io::Result<Connection> {
        match self {
            Connection::Plain(s) => Ok(Connection::Plain(s.try_clone()?)),
            Connection::TlsClient(_) | Connection::TlsServer(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "TLS connections cannot be cloned; wrap in a shared lock instead",
            )),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.read(buf),
            Connection::TlsClient(s) => s.read(buf),
            Connection::TlsServer(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Plain(s) => s.write(buf),
            Connection::TlsClient(s) => s.write(buf),
            Connection::TlsServer(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Plain(s) => s.flush(),
            Connection::TlsClient(s) => s.flush(),
            Connection::TlsServer(s) => s.flush(),
        }
    }
}

/// Dials `addr` with a 1-second connect timeout, optionally upgrading the
/// connection to mutual TLS using `client_config` against `tls_host`.
pub fn dial(
    addr: SocketAddr,
    client_config: Option<(Arc<rustls::ClientConfig>, &str)>,
) -> io::Result<Connection> {
    let stream = TcpStream::connect_timeout(&addr, DIAL_TIMEOUT)?;
    match client_config {
        None => Ok(Connection::Plain(stream)),
        Some((config, host)) => {
            let name = server_name(host)?;
            let conn = ClientConnection::new(config, name)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            Ok(Connection::TlsClient(Box::new(StreamOwned::new(
                conn, stream,
            ))))
        }
    }
}

/// Dials by host:port string, resolving the first address.
pub fn dial_addr(
    addr: &str,
    client_config: Option<(Arc<rustls::ClientConfig>, &str)>,
) -> io::Result<Connection> {
    let resolved = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "unresolvable address"))?;
    dial(resolved, client_config)
}

/// Wraps an accepted plain TCP stream as a mutually-authenticated server
/// connection, or passes it through unchanged when TLS is disabled.
pub fn accept(stream: TcpStream, server_config: Option<Arc<rustls::ServerConfig>>) -> io::Result<Connection> {
    match server_config {
        None => Ok(Connection::Plain(stream)),
        Some(config) => {
            let conn = ServerConnection::new(config)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            Ok(Connection::TlsServer(Box::new(StreamOwned::new(
                conn, stream,
            ))))
        }
    }
}
