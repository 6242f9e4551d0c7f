//! Mutex-guarded membership table: the set of live Scribe ids, their
//! dial addresses, and the partition map rebuilt from them as one atomic
//! unit. The lock is held only while mutating or snapshotting this triple
//! — never while dialing or forwarding a request downstream.

use crate::partition::{self, PartitionMap};
use protocol::agent_id::AgentId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

/// Both addresses a registered Scribe exposes: `addr` for data-plane
/// forwarding (`Log`/`Ping`), `cli_addr` for control-plane fan-out
/// (`GetVersion`/`GetStats`).
#[derive(Debug, Clone, Copy)]
pub struct MemberInfo {
    pub addr: SocketAddr,
    pub cli_addr: SocketAddr,
}

struct Inner {
    members: HashMap<AgentId, MemberInfo>,
    partition: PartitionMap,
}

pub struct Membership {
    inner: Mutex<Inner>,
}

impl Membership {
    pub fn new() -> Self {
        Membership {
            inner: Mutex::new(Inner {
                members: HashMap::new(),
                partition: PartitionMap::new(),
            }),
        }
    }

    /// Adds or replaces a member's addresses and rebuilds the partition map.
    pub fn register(&self, id: AgentId, addr: SocketAddr, cli_addr: SocketAddr) {
        let mut inner = self.inner.lock().expect("membership lock poisoned");
        inner.members.insert(id, MemberInfo { addr, cli_addr });
        let ids: Vec<AgentId> = inner.members.keys().cloned().collect();
        inner.partition = partition::rebuild(&ids);
    }

    /// Drops a member and rebuilds the partition map. No-op if unknown.
    pub fn evict(&self, id: &AgentId) {
        let mut inner = self.inner.lock().expect("membership lock poisoned");
        if inner.members.remove(id).is_some() {
            let ids: Vec<AgentId> = inner.members.keys().cloned().collect();
            inner.partition = partition::rebuild(&ids);
        }
    }

    /// Resolves the owning Scribe's data-plane address for `filename`.
    /// Returns a fresh clone of the id/addr so the caller can dial and
    /// forward without holding the membership lock.
    pub fn owner_addr(&self, filename: &str) -> Option<(AgentId, SocketAddr)> {
        let inner = self.inner.lock().expect("membership lock poisoned");
        let owner_id = partition::owner_for(&inner.partition, filename)?;
        let info = inner.members.get(owner_id)?;
        Some((owner_id.clone(), info.addr))
    }

    /// A stable snapshot of every known member, for the health loop to
    /// probe and for `GetVersion`/`GetStats` fan-out.
    pub fn members(&self) -> Vec<(AgentId, MemberInfo)> {
        let inner = self.inner.lock().expect("membership lock poisoned");
        inner.members.iter().map(|(id, info)| (id.clone(), *info)).collect()
    }

    /// The current partition table rendered as (boundary char, owner id)
    /// rows, in alphabet order, for `GetResponsibility`.
    pub fn responsibility_rows(&self) -> Vec<(char, AgentId)> {
        let inner = self.inner.lock().expect("membership lock poisoned");
        inner
            .partition
            .iter()
            .map(|(&rank, id)| (partition::boundary_char(rank), id.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("membership lock poisoned").members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Membership {
    fn default() -> Self {
        Self::new()
    }
}
