//! The Mediator: accepts `Register` and `Log` calls on the data-plane
//! port, forwards `Log` to the Scribe currently responsible for the
//! filename, and answers control-plane introspection on `cli_port`.
//!
//! The membership lock is released before any downstream RPC — dispatch
//! reads the target address under the lock, then dials and forwards
//! after releasing it, so a slow or dead Scribe never blocks registration
//! or other dispatches.

use crate::health;
use crate::membership::Membership;
use config::MediatorConfig;
use logger::Logger;
use protocol::agent_id::AgentId;
use protocol::control::{self, ControlPlane};
use protocol::error::ClusterError;
use protocol::message::{Frame, GetVersionRequest, LogResponse, RegisterResponse, TableResponse};
use protocol::tls::TlsMaterial;
use protocol::transport;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

const MODULE: &str = "mediator";

pub struct Mediator {
    id: AgentId,
    config: MediatorConfig,
    membership: Arc<Membership>,
    logger: Logger,
    start_time: Instant,
    stopping: Arc<AtomicBool>,
}

impl Mediator {
    pub fn start(config: MediatorConfig, logger: Logger) -> Arc<Self> {
        Arc::new(Mediator {
            id: AgentId::new(),
            config,
            membership: Arc::new(Membership::new()),
            logger,
            start_time: Instant::now(),
            stopping: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Binds the data-plane and control-plane listeners, spawns the
    /// health-probe thread, and serves until `shutdown` is called.
    pub fn serve(self: Arc<Self>) -> Result<(), ClusterError> {
        let tls_material = TlsMaterial::load(&self.config.tls)
            .map_err(|e| ClusterError::configuration(e.to_string(), MODULE))?;
        let server_tls = tls_material
            .map(|m| m.server_config())
            .transpose()
            .map_err(|e| ClusterError::configuration(e.to_string(), MODULE))?;

        let data_addr: SocketAddr = format!("0.0.0.0:{}", self.config.port)
            .parse()
            .expect("0.0.0.0 with a valid port always parses");
        let data_listener = TcpListener::bind(data_addr)
            .map_err(|e| ClusterError::configuration(format!("cannot bind data-plane port: {e}"), MODULE))?;

        let cli_addr: SocketAddr = format!("0.0.0.0:{}", self.config.cli_port)
            .parse()
            .expect("0.0.0.0 with a valid port always parses");
        let cli_listener = TcpListener::bind(cli_addr)
            .map_err(|e| ClusterError::configuration(format!("cannot bind control-plane port: {e}"), MODULE))?;

        let control_handle = Arc::clone(&self);
        thread::spawn(move || control::serve(cli_listener, MediatorControlHandle(control_handle)));

        let health_membership = Arc::clone(&self.membership);
        let health_logger = self.logger.clone();
        let health_stopping = Arc::clone(&self.stopping);
        let probe_interval = self.config.probe_interval;
        let eviction_threshold = self.config.eviction_threshold;
        thread::spawn(move || {
            health::run(health_membership, probe_interval, eviction_threshold, health_logger, health_stopping)
        });

        self.logger.info(
            &format!("mediator {} serving data plane on {data_addr}", self.id),
            MODULE,
        );

        for incoming in data_listener.incoming() {
            let Ok(stream) = incoming else { continue };
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            let mediator = Arc::clone(&self);
            let server_tls = server_tls.clone();
            thread::spawn(move || {
                if let Ok(conn) = transport::accept(stream, server_tls) {
                    mediator.handle_connection(conn);
                }
            });
        }

        Ok(())
    }

    fn handle_connection<S: std::io::Read + std::io::Write>(&self, mut conn: S) {
        loop {
            let frame = match Frame::read_from(&mut conn) {
                Ok(f) => f,
                Err(_) => return,
            };
            let response = match frame {
                Frame::RegisterRequest(req) => {
                    self.membership.register(req.id.clone(), req.addr, req.cli_addr);
                    self.logger.info(
                        &format!("registered {} at {}", req.id, req.addr),
                        MODULE,
                    );
                    Frame::RegisterResponse(RegisterResponse {
                        result: "Success".to_string(),
                    })
                }
                Frame::LogRequest(req) => Frame::LogResponse(self.dispatch(req)),
                _ => Frame::ErrorResponse(protocol::message::ErrorResponse {
                    message: "unsupported data-plane request".to_string(),
                }),
            };
            if response.write_to(&mut conn).is_err() {
                return;
            }
        }
    }

    /// Resolves the owning Scribe under the membership lock, then dials
    /// and forwards after releasing it.
    fn dispatch(&self, req: protocol::message::LogRequest) -> LogResponse {
        let Some((owner_id, addr)) = self.membership.owner_addr(&req.filename) else {
            self.logger.error(
                &format!("no scribe available for filename '{}'", req.filename),
                MODULE,
            );
            return LogResponse {
                ack: "false".to_string(),
            };
        };

        match forward(addr, req) {
            Ok(ack) => ack,
            Err(e) => {
                self.logger.error(
                    &format!("forward to {owner_id} at {addr} failed: {e}"),
                    MODULE,
                );
                LogResponse {
                    ack: "false".to_string(),
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(format!("127.0.0.1:{}", self.config.port));
        self.logger.info(
            &format!(
                "mediator {} shutting down after {:?}, {} members known",
                self.id,
                self.start_time.elapsed(),
                self.membership.len()
            ),
            MODULE,
        );
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }
}

fn forward(addr: SocketAddr, req: protocol::message::LogRequest) -> std::io::Result<LogResponse> {
    let mut conn = protocol::transport::dial(addr, None)?;
    Frame::LogRequest(req).write_to(&mut conn)?;
    match Frame::read_from(&mut conn)? {
        Frame::LogResponse(resp) => Ok(resp),
        other => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unexpected response to Log: {other:?}"),
        )),
    }
}

#[derive(Clone)]
struct MediatorControlHandle(Arc<Mediator>);

impl ControlPlane for MediatorControlHandle {
    fn name(&self) -> String {
        self.0.id.to_string()
    }

    fn report_version(&self, all: bool) -> TableResponse {
        let mut rows = vec![vec![
            "Mediator".to_string(),
            self.name(),
            control::VERSION.to_string(),
        ]];
        if all {
            for (id, info) in self.0.membership.members() {
                if let Ok(version) = fetch_version(info.cli_addr) {
                    rows.push(vec!["Scribe".to_string(), id.to_string(), version]);
                }
            }
        }
        TableResponse { rows }
    }

    fn report_stats(&self) -> TableResponse {
        TableResponse {
            rows: vec![vec![self.name(), self.0.membership.len().to_string()]],
        }
    }

    fn report_responsibility(&self) -> TableResponse {
        let rows = self
            .0
            .membership
            .responsibility_rows()
            .into_iter()
            .map(|(boundary, id)| vec![boundary.to_string(), id.to_string()])
            .collect();
        TableResponse { rows }
    }
}

fn fetch_version(addr: SocketAddr) -> std::io::Result<String> {
    let mut conn = protocol::transport::dial(addr, None)?;
    Frame::GetVersionRequest(GetVersionRequest { all: false }).write_to(&mut conn)?;
    match Frame::read_from(&mut conn)? {
        Frame::GetVersionResponse(table) => Ok(table
            .rows
            .first()
            .and_then(|row| row.get(2))
            .cloned()
            .unwrap_or_default()),
        _ => Ok(String::new()),
    }
}
