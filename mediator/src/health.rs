//! Periodic liveness probing: every `probe_interval`, Ping each known
//! Scribe with a fresh random pair and check the returned product.
//! A member is evicted once its consecutive-failure count reaches
//! `eviction_threshold` — grounded in the teacher's ping/pfail loop, but
//! collapsed to a single pass per tick since there is no gossip to
//! propagate here, just a direct Mediator-to-Scribe check.

use crate::membership::Membership;
use logger::Logger;
use protocol::agent_id::AgentId;
use protocol::message::{Frame, PingRequest};
use rand::Rng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

const MODULE: &str = "health";

/// Runs the probe loop until `stopping` reports true. Intended to be
/// spawned on its own thread for the lifetime of the Mediator process.
pub fn run(
    membership: Arc<Membership>,
    probe_interval: Duration,
    eviction_threshold: u32,
    logger: Logger,
    stopping: Arc<std::sync::atomic::AtomicBool>,
) {
    let mut failures: HashMap<AgentId, u32> = HashMap::new();

    while !stopping.load(std::sync::atomic::Ordering::SeqCst) {
        sleep(probe_interval);
        probe_once(&membership, &mut failures, eviction_threshold, &logger);
    }
}

fn probe_once(
    membership: &Membership,
    failures: &mut HashMap<AgentId, u32>,
    eviction_threshold: u32,
    logger: &Logger,
) {
    for (id, info) in membership.members() {
        let addr = info.addr;
        if ping(addr).is_ok() {
            failures.remove(&id);
            continue;
        }

        let count = failures.entry(id.clone()).or_insert(0);
        *count += 1;
        logger.warn(
            &format!("ping to {id} at {addr} failed ({count}/{eviction_threshold})"),
            MODULE,
        );

        if *count >= eviction_threshold {
            membership.evict(&id);
            failures.remove(&id);
            logger.warn(&format!("evicted {id}: exceeded failure threshold"), MODULE);
        }
    }
}

fn ping(addr: SocketAddr) -> std::io::Result<()> {
    let mut rng = rand::rng();
    let a: u32 = rng.random();
    let b: u32 = rng.random();

    let mut conn = protocol::transport::dial(addr, None)?;
    Frame::PingRequest(PingRequest { a, b }).write_to(&mut conn)?;
    match Frame::read_from(&mut conn)? {
        Frame::PingResponse(resp) if resp.product == a as u64 * b as u64 => Ok(()),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "ping response did not match expected product",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::message::PingResponse;
    use std::net::TcpListener;
    use std::thread;

    fn id(s: &str) -> AgentId {
        AgentId::new_with_id(s.to_string())
    }

    #[test]
    fn healthy_member_is_never_evicted() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            for _ in 0..2 {
                let (mut stream, _) = listener.accept().unwrap();
                if let Frame::PingRequest(req) = Frame::read_from(&mut stream).unwrap() {
                    Frame::PingResponse(PingResponse {
                        product: req.a as u64 * req.b as u64,
                    })
                    .write_to(&mut stream)
                    .unwrap();
                }
            }
        });

        let membership = Membership::new();
        membership.register(id("1"), addr, addr);
        let mut failures = HashMap::new();
        probe_once(&membership, &mut failures, 1, &Logger::null());
        probe_once(&membership, &mut failures, 1, &Logger::null());

        assert_eq!(membership.len(), 1);
        server.join().unwrap();
    }

    #[test]
    fn unreachable_member_is_evicted_after_threshold() {
        let membership = Membership::new();
        // nothing listens on this port
        let dead_addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        membership.register(id("1"), dead_addr, dead_addr);

        let mut failures = HashMap::new();
        probe_once(&membership, &mut failures, 2, &Logger::null());
        assert_eq!(membership.len(), 1);
        probe_once(&membership, &mut failures, 2, &Logger::null());
        assert_eq!(membership.len(), 0);
    }
}
