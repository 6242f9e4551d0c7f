//! The three data-plane services (`Log`, `Register`, `Ping`) plus the
//! control-plane introspection calls, framed as length-delimited records:
//! `[4-byte big-endian body length][1-byte message kind][body]`.

use crate::agent_id::AgentId;
use crate::wire::{
    DeserializeRIP, SerializeRIP, read_bytes, read_exact, read_string, write_bytes, write_string,
};
use std::io::{Error, ErrorKind, Read, Write};
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    LogRequest = 0,
    LogResponse = 1,
    RegisterRequest = 2,
    RegisterResponse = 3,
    PingRequest = 4,
    PingResponse = 5,
    ErrorResponse = 6,
    GetVersionRequest = 7,
    GetVersionResponse = 8,
    GetStatsRequest = 9,
    GetStatsResponse = 10,
    GetResponsibilityRequest = 11,
    GetResponsibilityResponse = 12,
}

impl MessageKind {
    fn from_byte(byte: u8) -> std::io::Result<Self> {
        Ok(match byte {
            0 => MessageKind::LogRequest,
            1 => MessageKind::LogResponse,
            2 => MessageKind::RegisterRequest,
            3 => MessageKind::RegisterResponse,
            4 => MessageKind::PingRequest,
            5 => MessageKind::PingResponse,
            6 => MessageKind::ErrorResponse,
            7 => MessageKind::GetVersionRequest,
            8 => MessageKind::GetVersionResponse,
            9 => MessageKind::GetStatsRequest,
            10 => MessageKind::GetStatsResponse,
            11 => MessageKind::GetResponsibilityRequest,
            12 => MessageKind::GetResponsibilityResponse,
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("unknown message kind byte {other}"),
                ));
            }
        })
    }
}

/// The unit of ingestion: a single log line destined for one (path, filename).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub filename: String,
    pub path: String,
    pub line: Vec<u8>,
}

impl SerializeRIP for LogRequest {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_string(&mut buf, &self.filename).expect("writing to Vec never fails");
        write_string(&mut buf, &self.path).expect("writing to Vec never fails");
        write_bytes(&mut buf, &self.line).expect("writing to Vec never fails");
        buf
    }
}

impl DeserializeRIP for LogRequest {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        Ok(LogRequest {
            filename: read_string(stream)?,
            path: read_string(stream)?,
            line: read_bytes(stream)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogResponse {
    pub ack: String,
}

impl SerializeRIP for LogResponse {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_string(&mut buf, &self.ack).expect("writing to Vec never fails");
        buf
    }
}

impl DeserializeRIP for LogResponse {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        Ok(LogResponse {
            ack: read_string(stream)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub id: AgentId,
    pub addr: SocketAddr,
    pub cli_addr: SocketAddr,
}

impl SerializeRIP for RegisterRequest {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(self.id.serialize());
        buf.extend(self.addr.serialize());
        buf.extend(self.cli_addr.serialize());
        buf
    }
}

impl DeserializeRIP for RegisterRequest {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        Ok(RegisterRequest {
            id: AgentId::deserialize(stream)?,
            addr: SocketAddr::deserialize(stream)?,
            cli_addr: SocketAddr::deserialize(stream)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    pub result: String,
}

impl SerializeRIP for RegisterResponse {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_string(&mut buf, &self.result).expect("writing to Vec never fails");
        buf
    }
}

impl DeserializeRIP for RegisterResponse {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        Ok(RegisterResponse {
            result: read_string(stream)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRequest {
    pub a: u32,
    pub b: u32,
}

impl SerializeRIP for PingRequest {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(&self.a.to_be_bytes());
        buf.extend(&self.b.to_be_bytes());
        buf
    }
}

impl DeserializeRIP for PingRequest {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let a = u32::from_be_bytes(read_exact::<4, T>(stream)?);
        let b = u32::from_be_bytes(read_exact::<4, T>(stream)?);
        Ok(PingRequest { a, b })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponse {
    pub product: u64,
}

impl SerializeRIP for PingResponse {
    fn serialize(&self) -> Vec<u8> {
        self.product.to_be_bytes().to_vec()
    }
}

impl DeserializeRIP for PingResponse {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let product = u64::from_be_bytes(read_exact::<8, T>(stream)?);
        Ok(PingResponse { product })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
}

impl SerializeRIP for ErrorResponse {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_string(&mut buf, &self.message).expect("writing to Vec never fails");
        buf
    }
}

impl DeserializeRIP for ErrorResponse {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        Ok(ErrorResponse {
            message: read_string(stream)?,
        })
    }
}

/// `GetVersion`/`GetStats`/`GetResponsibility` take no argument beyond an
/// optional fan-out flag; responses are pre-formatted tables so the CLI
/// never needs to know whether it talked to a Scribe or a Mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetVersionRequest {
    pub all: bool,
}

impl SerializeRIP for GetVersionRequest {
    fn serialize(&self) -> Vec<u8> {
        vec![self.all as u8]
    }
}

impl DeserializeRIP for GetVersionRequest {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let all = read_exact::<1, T>(stream)?[0] != 0;
        Ok(GetVersionRequest { all })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResponse {
    pub rows: Vec<Vec<String>>,
}

impl SerializeRIP for TableResponse {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(&(self.rows.len() as u32).to_be_bytes());
        for row in &self.rows {
            buf.extend(&(row.len() as u32).to_be_bytes());
            for cell in row {
                write_string(&mut buf, cell).expect("writing to Vec never fails");
            }
        }
        buf
    }
}

impl DeserializeRIP for TableResponse {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let row_count = u32::from_be_bytes(read_exact::<4, T>(stream)?) as usize;
        let mut rows = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            let col_count = u32::from_be_bytes(read_exact::<4, T>(stream)?) as usize;
            let mut row = Vec::with_capacity(col_count);
            for _ in 0..col_count {
                row.push(read_string(stream)?);
            }
            rows.push(row);
        }
        Ok(TableResponse { rows })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    LogRequest(LogRequest),
    LogResponse(LogResponse),
    RegisterRequest(RegisterRequest),
    RegisterResponse(RegisterResponse),
    PingRequest(PingRequest),
    PingResponse(PingResponse),
    ErrorResponse(ErrorResponse),
    GetVersionRequest(GetVersionRequest),
    GetVersionResponse(TableResponse),
    GetStatsRequest,
    GetStatsResponse(TableResponse),
    GetResponsibilityRequest,
    GetResponsibilityResponse(TableResponse),
}

impl Frame {
    fn kind(&self) -> MessageKind {
        match self {
            Frame::LogRequest(_) => MessageKind::LogRequest,
            Frame::LogResponse(_) => MessageKind::LogResponse,
            Frame::RegisterRequest(_) => MessageKind::RegisterRequest,
            Frame::RegisterResponse(_) => MessageKind::RegisterResponse,
            Frame::PingRequest(_) => MessageKind::PingRequest,
            Frame::PingResponse(_) => MessageKind::PingResponse,
            Frame::ErrorResponse(_) => MessageKind::ErrorResponse,
            Frame::GetVersionRequest(_) => MessageKind::GetVersionRequest,
            Frame::GetVersionResponse(_) => MessageKind::GetVersionResponse,
            Frame::GetStatsRequest => MessageKind::GetStatsRequest,
            Frame::GetStatsResponse(_) => MessageKind::GetStatsResponse,
            Frame::GetResponsibilityRequest => MessageKind::GetResponsibilityRequest,
            Frame::GetResponsibilityResponse(_) => MessageKind::GetResponsibilityResponse,
        }
    }

    fn body(&self) -> Vec<u8> {
        match self {
            Frame::LogRequest(m) => m.serialize(),
            Frame::LogResponse(m) => m.serialize(),
            Frame::RegisterRequest(m) => m.serialize(),
            Frame::RegisterResponse(m) => m.serialize(),
            Frame::PingRequest(m) => m.serialize(),
            Frame::PingResponse(m) => m.serialize(),
            Frame::ErrorResponse(m) => m.serialize(),
            Frame::GetVersionRequest(m) => m.serialize(),
            Frame::GetVersionResponse(m) => m.serialize(),
            Frame::GetStatsRequest | Frame::GetResponsibilityRequest => Vec::new(),
            Frame::GetStatsResponse(m) => m.serialize(),
            Frame::GetResponsibilityResponse(m) => m.serialize(),
        }
    }

    /// Writes `[len][kind][body]` to the stream.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let kind = self.kind();
        let body = self.body();
        let len = (body.len() + 1) as u32;
        w.write_all(&len.to_be_bytes())?;
        w.write_all(&[kind as u8])?;
        w.write_all(&body)?;
        w.flush()
    }

    /// Reads one frame from the stream, blocking until the full length-
    /// prefixed record is available.
    pub fn read_from<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let len = u32::from_be_bytes(read_exact::<4, T>(stream)?) as usize;
        if len == 0 {
            return Err(Error::new(ErrorKind::InvalidData, "empty frame"));
        }
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body)?;
        let mut cursor = std::io::Cursor::new(body);
        let kind = MessageKind::from_byte(read_exact::<1, _>(&mut cursor)?[0])?;
        Ok(match kind {
            MessageKind::LogRequest => Frame::LogRequest(LogRequest::deserialize(&mut cursor)?),
            MessageKind::LogResponse => Frame::LogResponse(LogResponse::deserialize(&mut cursor)?),
            MessageKind::RegisterRequest => {
                Frame::RegisterRequest(RegisterRequest::deserialize(&mut cursor)?)
            }
            MessageKind::RegisterResponse => {
                Frame::RegisterResponse(RegisterResponse::deserialize(&mut cursor)?)
            }
            MessageKind::PingRequest => Frame::PingRequest(PingRequest::deserialize(&mut cursor)?),
            MessageKind::PingResponse => {
                Frame::PingResponse(PingResponse::deserialize(&mut cursor)?)
            }
            MessageKind::ErrorResponse => {
                Frame::ErrorResponse(ErrorResponse::deserialize(&mut cursor)?)
            }
            MessageKind::GetVersionRequest => {
                Frame::GetVersionRequest(GetVersionRequest::deserialize(&mut cursor)?)
            }
            MessageKind::GetVersionResponse => {
                Frame::GetVersionResponse(TableResponse::deserialize(&mut cursor)?)
            }
            MessageKind::GetStatsRequest => Frame::GetStatsRequest,
            MessageKind::GetStatsResponse => {
                Frame::GetStatsResponse(TableResponse::deserialize(&mut cursor)?)
            }
            MessageKind::GetResponsibilityRequest => Frame::GetResponsibilityRequest,
            MessageKind::GetResponsibilityResponse => {
                Frame::GetResponsibilityResponse(TableResponse::deserialize(&mut cursor)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(frame: Frame) -> Frame {
        let mut buf = Vec::new();
        frame.write_to(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        Frame::read_from(&mut cursor).unwrap()
    }

    #[test]
    fn log_request_round_trips() {
        let frame = Frame::LogRequest(LogRequest {
            filename: "a".to_string(),
            path: "p".to_string(),
            line: b"hello".to_vec(),
        });
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn register_request_round_trips() {
        let frame = Frame::RegisterRequest(RegisterRequest {
            id: AgentId::new_with_id("s1".to_string()),
            addr: "127.0.0.1:9001".parse().unwrap(),
            cli_addr: "127.0.0.1:9002".parse().unwrap(),
        });
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn ping_round_trips() {
        let frame = Frame::PingRequest(PingRequest { a: 7, b: 6 });
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn table_response_round_trips_with_empty_rows() {
        let frame = Frame::GetResponsibilityResponse(TableResponse { rows: vec![] });
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn unknown_kind_byte_is_rejected() {
        let mut buf = Vec::new();
        buf.extend(&1u32.to_be_bytes());
        buf.push(200);
        let mut cursor = Cursor::new(buf);
        assert!(Frame::read_from(&mut cursor).is_err());
    }
}
