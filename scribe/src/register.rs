//! Startup registration against an optional Mediator: dial, send
//! `Register`, retry on failure with 1s then 2s backoff, and surface a
//! fatal configuration-class error after three attempts.

use logger::Logger;
use protocol::agent_id::AgentId;
use protocol::error::ClusterError;
use protocol::message::{Frame, RegisterRequest};
use std::net::SocketAddr;
use std::thread::sleep;
use std::time::Duration;

const MODULE: &str = "register";
const MAX_ATTEMPTS: u32 = 3;
const BACKOFFS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];

pub fn register_with_mediator(
    mediator_addr: SocketAddr,
    id: &AgentId,
    self_addr: SocketAddr,
    cli_addr: SocketAddr,
    logger: &Logger,
) -> Result<(), ClusterError> {
    let mut last_err = String::new();

    for attempt in 0..MAX_ATTEMPTS {
        match try_register(mediator_addr, id, self_addr, cli_addr) {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_err = e;
                logger.warn(
                    &format!("register attempt {} of {MAX_ATTEMPTS} failed: {last_err}", attempt + 1),
                    MODULE,
                );
                if let Some(backoff) = BACKOFFS.get(attempt as usize) {
                    sleep(*backoff);
                }
            }
        }
    }

    Err(ClusterError::transient(
        format!("could not register with mediator after {MAX_ATTEMPTS} attempts: {last_err}"),
        MODULE,
    ))
}

fn try_register(
    mediator_addr: SocketAddr,
    id: &AgentId,
    self_addr: SocketAddr,
    cli_addr: SocketAddr,
) -> Result<(), String> {
    let mut conn = protocol::transport::dial(mediator_addr, None).map_err(|e| e.to_string())?;

    Frame::RegisterRequest(RegisterRequest {
        id: id.clone(),
        addr: self_addr,
        cli_addr,
    })
    .write_to(&mut conn)
    .map_err(|e| e.to_string())?;

    match Frame::read_from(&mut conn).map_err(|e| e.to_string())? {
        Frame::RegisterResponse(resp) if resp.result == "Success" => Ok(()),
        Frame::RegisterResponse(resp) => Err(format!("mediator returned '{}'", resp.result)),
        other => Err(format!("unexpected response to Register: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::message::RegisterResponse;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn registers_successfully_on_first_try() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let frame = Frame::read_from(&mut stream).unwrap();
            assert!(matches!(frame, Frame::RegisterRequest(_)));
            Frame::RegisterResponse(RegisterResponse {
                result: "Success".to_string(),
            })
            .write_to(&mut stream)
            .unwrap();
        });

        let logger = Logger::null();
        let id = AgentId::new_with_id("s1".to_string());
        let self_addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let cli_addr: SocketAddr = "127.0.0.1:9002".parse().unwrap();
        register_with_mediator(addr, &id, self_addr, cli_addr, &logger).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn gives_up_after_three_failed_attempts() {
        let logger = Logger::null();
        let id = AgentId::new_with_id("s1".to_string());
        let self_addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let cli_addr: SocketAddr = "127.0.0.1:9002".parse().unwrap();
        // Nothing listens on this port, so every dial fails immediately.
        let dead_addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = register_with_mediator(dead_addr, &id, self_addr, cli_addr, &logger);
        assert!(result.is_err());
    }
}
