//! Byte-level (de)serialization primitives for the cluster's internal wire
//! protocol. Every message is built out of these building blocks; see
//! `message.rs` for the actual request/response shapes.

use std::io::{Error, ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Serializes a value into the wire protocol's binary form.
pub trait SerializeRIP {
    fn serialize(&self) -> Vec<u8>;
}

/// Deserializes a value from a stream following the wire protocol.
pub trait DeserializeRIP {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self>
    where
        Self: Sized;
}

pub fn read_exact<const N: usize, T: Read>(stream: &mut T) -> Result<[u8; N], Error> {
    let mut buf = [0u8; N];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Length-prefixed UTF-8 string: 4-byte big-endian length, then bytes.
pub fn write_string<W: Write>(w: &mut W, s: &str) -> std::io::Result<()> {
    let bytes = s.as_bytes();
    w.write_all(&(bytes.len() as u32).to_be_bytes())?;
    w.write_all(bytes)
}

pub fn read_string<T: Read>(stream: &mut T) -> std::io::Result<String> {
    let len = u32::from_be_bytes(read_exact::<4, T>(stream)?) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::new(ErrorKind::InvalidData, "invalid utf-8 string"))
}

/// Length-prefixed opaque payload: 4-byte big-endian length, then bytes.
pub fn write_bytes<W: Write>(w: &mut W, b: &[u8]) -> std::io::Result<()> {
    w.write_all(&(b.len() as u32).to_be_bytes())?;
    w.write_all(b)
}

pub fn read_bytes<T: Read>(stream: &mut T) -> std::io::Result<Vec<u8>> {
    let len = u32::from_be_bytes(read_exact::<4, T>(stream)?) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

impl SerializeRIP for SocketAddr {
    fn serialize(&self) -> Vec<u8> {
        match self {
            SocketAddr::V4(a) => {
                let mut bytes = vec![4u8];
                bytes.extend(&a.ip().octets());
                bytes.extend(&a.port().to_be_bytes());
                bytes
            }
            SocketAddr::V6(a) => {
                let mut bytes = vec![6u8];
                bytes.extend(&a.ip().octets());
                bytes.extend(&a.port().to_be_bytes());
                bytes
            }
        }
    }
}

impl DeserializeRIP for SocketAddr {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let kind = read_exact::<1, T>(stream)?[0];
        match kind {
            4 => {
                let ip = Ipv4Addr::from(read_exact::<4, T>(stream)?);
                let port = u16::from_be_bytes(read_exact::<2, T>(stream)?);
                Ok(SocketAddr::new(IpAddr::V4(ip), port))
            }
            6 => {
                let ip = Ipv6Addr::from(read_exact::<16, T>(stream)?);
                let port = u16::from_be_bytes(read_exact::<2, T>(stream)?);
                Ok(SocketAddr::new(IpAddr::V6(ip), port))
            }
            _ => Err(Error::new(ErrorKind::InvalidData, "invalid address family byte")),
        }
    }
}
