//! The client-side writer library: a small façade over a single unary
//! `Log` RPC. Configured through a builder (`{address, port, filename,
//! path, tls}`), grounded in the same connect-by-builder shape as a
//! Redis client driver, generalized to one fire-and-forget call per
//! write instead of a persistent command/response session.

use protocol::error::ClusterError;
use protocol::message::{Frame, LogRequest};
use protocol::tls::TlsFiles;
use protocol::transport::{self, Connection};
use std::io::{self, Write};
use std::net::{SocketAddr, ToSocketAddrs};

const MODULE: &str = "writer";

#[derive(Debug, Clone, Default)]
pub struct WriterBuilder {
    address: String,
    port: u16,
    filename: String,
    path: String,
    tls: TlsFiles,
}

impl WriterBuilder {
    pub fn new() -> Self {
        WriterBuilder::default()
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn tls(mut self, cert: impl Into<String>, key: impl Into<String>, ca: impl Into<String>) -> Self {
        self.tls = TlsFiles {
            cert: Some(cert.into()),
            key: Some(key.into()),
            ca: Some(ca.into()),
        };
        self
    }

    /// Resolves the configured endpoint and constructs the sink. Does
    /// not dial yet — each `write` dials fresh, matching the no-batching,
    /// no-retry contract.
    pub fn build(self) -> Result<LogWriter, ClusterError> {
        if self.filename.is_empty() {
            return Err(ClusterError::configuration("filename must not be empty", MODULE));
        }
        if self.address.is_empty() || self.port == 0 {
            return Err(ClusterError::configuration("address and port are required", MODULE));
        }

        let client_config = if self.tls.is_empty() {
            None
        } else {
            let material = protocol::tls::TlsMaterial::load(&self.tls)
                .map_err(|e| ClusterError::configuration(e.to_string(), MODULE))?
                .ok_or_else(|| ClusterError::configuration("incomplete tls material", MODULE))?;
            Some(material.client_config().map_err(|e| ClusterError::configuration(e.to_string(), MODULE))?)
        };

        let addr: SocketAddr = format!("{}:{}", self.address, self.port)
            .to_socket_addrs()
            .map_err(|e| ClusterError::configuration(e.to_string(), MODULE))?
            .next()
            .ok_or_else(|| ClusterError::configuration("address did not resolve", MODULE))?;

        Ok(LogWriter {
            addr,
            host: self.address,
            filename: self.filename,
            path: self.path,
            client_config,
        })
    }
}

/// A byte sink: each call to `write` issues one `Log` RPC carrying the
/// full buffer as a single line and returns the number of bytes handed
/// to it on a successful ack. No internal batching, no retry.
pub struct LogWriter {
    addr: SocketAddr,
    host: String,
    filename: String,
    path: String,
    client_config: Option<std::sync::Arc<rustls::ClientConfig>>,
}

impl LogWriter {
    fn dial(&self) -> io::Result<Connection> {
        let client_config = self
            .client_config
            .as_ref()
            .map(|cfg| (cfg.clone(), self.host.as_str()));
        transport::dial(self.addr, client_config)
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut conn = self.dial()?;
        Frame::LogRequest(LogRequest {
            filename: self.filename.clone(),
            path: self.path.clone(),
            line: buf.to_vec(),
        })
        .write_to(&mut conn)?;

        match Frame::read_from(&mut conn)? {
            Frame::LogResponse(resp) if resp.ack == "true" || resp.ack == "handling" => Ok(buf.len()),
            Frame::LogResponse(resp) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("log rpc declined: {}", resp.ack),
            )),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected response to Log: {other:?}"),
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::message::LogResponse;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn builder_rejects_empty_filename() {
        let err = WriterBuilder::new().address("127.0.0.1").port(9001).build();
        assert!(err.is_err());
    }

    #[test]
    fn write_issues_a_log_rpc_and_reports_bytes_written() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let frame = Frame::read_from(&mut stream).unwrap();
            let Frame::LogRequest(req) = frame else { panic!("expected LogRequest") };
            assert_eq!(req.filename, "app");
            assert_eq!(req.line, b"hello");
            Frame::LogResponse(LogResponse { ack: "true".to_string() })
                .write_to(&mut stream)
                .unwrap();
        });

        let mut writer = WriterBuilder::new()
            .address("127.0.0.1")
            .port(addr.port())
            .filename("app")
            .path("p")
            .build()
            .unwrap();

        let n = writer.write(b"hello").unwrap();
        assert_eq!(n, 5);
        server.join().unwrap();
    }

    #[test]
    fn write_surfaces_a_declined_ack_as_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let _ = Frame::read_from(&mut stream).unwrap();
            Frame::LogResponse(LogResponse { ack: "false".to_string() })
                .write_to(&mut stream)
                .unwrap();
        });

        let mut writer = WriterBuilder::new()
            .address("127.0.0.1")
            .port(addr.port())
            .filename("app")
            .build()
            .unwrap();

        assert!(writer.write(b"hello").is_err());
        server.join().unwrap();
    }
}
