//! The control CLI plane (`GetVersion`/`GetStats`/`GetResponsibility`),
//! shared by Scribe and Mediator. Modeled as a tagged variant: both sides
//! satisfy the same small capability set, but a Scribe leaves
//! `report_responsibility` unimplemented — there is no partition table to
//! show on a terminal node.

use crate::message::{Frame, TableResponse};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Implemented once by the Scribe agent and once by the Mediator; the
/// control-plane listener dispatches to whichever is bound without caring
/// which kind of node it is.
pub trait ControlPlane: Send + Sync + 'static {
    fn name(&self) -> String;
    fn report_version(&self, all: bool) -> TableResponse;
    fn report_stats(&self) -> TableResponse;
    /// Only meaningful on the Mediator; a Scribe returns an empty table.
    fn report_responsibility(&self) -> TableResponse {
        TableResponse { rows: vec![] }
    }
}

/// Binds `addr` and serves control-plane requests until the process exits;
/// every connection is handled on its own thread since these calls are
/// infrequent, operator-driven probes, not the hot path.
pub fn serve<H: ControlPlane + Clone>(listener: TcpListener, handler: H) {
    for incoming in listener.incoming() {
        let Ok(stream) = incoming else { continue };
        let handler = handler.clone();
        thread::spawn(move || {
            let _ = handle_connection(stream, &handler);
        });
    }
}

fn handle_connection<H: ControlPlane, S: Read + Write>(mut stream: S, handler: &H) -> std::io::Result<()> {
    loop {
        let frame = match Frame::read_from(&mut stream) {
            Ok(f) => f,
            Err(_) => return Ok(()),
        };
        let response = match frame {
            Frame::GetVersionRequest(req) => Frame::GetVersionResponse(handler.report_version(req.all)),
            Frame::GetStatsRequest => Frame::GetStatsResponse(handler.report_stats()),
            Frame::GetResponsibilityRequest => {
                Frame::GetResponsibilityResponse(handler.report_responsibility())
            }
            _ => Frame::ErrorResponse(crate::message::ErrorResponse {
                message: "unsupported control-plane request".to_string(),
            }),
        };
        response.write_to(&mut stream)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct StubScribe;

    impl ControlPlane for StubScribe {
        fn name(&self) -> String {
            "s1".to_string()
        }
        fn report_version(&self, _all: bool) -> TableResponse {
            TableResponse {
                rows: vec![vec!["Scribe".to_string(), self.name(), VERSION.to_string()]],
            }
        }
        fn report_stats(&self) -> TableResponse {
            TableResponse {
                rows: vec![vec![self.name(), "0".to_string()]],
            }
        }
    }

    #[test]
    fn scribe_leaves_responsibility_empty() {
        let stub = StubScribe;
        assert!(stub.report_responsibility().rows.is_empty());
    }

    #[test]
    fn handles_get_version_and_stats_over_a_stream() {
        use std::io::Cursor;

        let mut request = Vec::new();
        Frame::GetVersionRequest(crate::message::GetVersionRequest { all: false })
            .write_to(&mut request)
            .unwrap();
        Frame::GetStatsRequest.write_to(&mut request).unwrap();

        struct DuplexBuf {
            input: Cursor<Vec<u8>>,
            output: Vec<u8>,
        }
        impl Read for DuplexBuf {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.input.read(buf)
            }
        }
        impl Write for DuplexBuf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.output.write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut duplex = DuplexBuf {
            input: Cursor::new(request),
            output: Vec::new(),
        };
        let stub = StubScribe;
        let _ = handle_connection(&mut duplex, &stub);

        let mut cursor = Cursor::new(duplex.output);
        let first = Frame::read_from(&mut cursor).unwrap();
        assert!(matches!(first, Frame::GetVersionResponse(_)));
        let second = Frame::read_from(&mut cursor).unwrap();
        assert!(matches!(second, Frame::GetStatsResponse(_)));
    }
}
