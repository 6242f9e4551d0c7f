//! Opaque, collision-free, lexicographically sortable identifiers chosen by
//! a Scribe at startup and carried in Register calls and the partition map.

use crate::wire::{DeserializeRIP, SerializeRIP, read_exact};
use std::fmt;
use std::io::{Error, ErrorKind, Read};
use std::time::{SystemTime, UNIX_EPOCH};

/// 12 bytes of millisecond timestamp (hex) + 8 bytes of randomness (hex),
/// so ids sort lexicographically in roughly creation order while staying
/// collision-free across concurrently starting Scribes.
const ID_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId {
    id: String,
}

impl AgentId {
    pub fn new() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let mut rand_bytes = [0u8; 4];
        rand::fill(&mut rand_bytes);
        let id = format!("{millis:024x}{}", hex::encode(rand_bytes));
        AgentId { id }
    }

    pub fn new_with_id(id: String) -> Self {
        AgentId { id }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.id.as_bytes().to_vec();
        bytes.resize(ID_LEN, b' ');
        bytes.truncate(ID_LEN);
        bytes
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializeRIP for AgentId {
    fn serialize(&self) -> Vec<u8> {
        self.to_bytes()
    }
}

impl DeserializeRIP for AgentId {
    fn deserialize<T: Read>(stream: &mut T) -> std::io::Result<Self> {
        let buf = read_exact::<ID_LEN, T>(stream)?;
        let id = String::from_utf8(buf.to_vec())
            .map_err(|_| Error::new(ErrorKind::InvalidData, "id is not valid utf-8"))?
            .trim_end()
            .to_string();
        Ok(AgentId { id })
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ids_are_unique() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_wire_bytes() {
        let id = AgentId::new_with_id("s1".to_string());
        let bytes = id.serialize();
        let mut cursor = Cursor::new(bytes);
        let back = AgentId::deserialize(&mut cursor).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let a = AgentId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = AgentId::new();
        assert!(a.as_str() < b.as_str());
    }
}
