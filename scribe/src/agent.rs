//! The Scribe agent: accepts `Log` and `Ping` calls on the data-plane
//! port, answers control-plane introspection on `cli_port`, and owns the
//! single-writer pipeline that actually persists requests to disk.

use crate::pipeline::Pipeline;
use crate::register::register_with_mediator;
use config::ScribeConfig;
use logger::Logger;
use protocol::agent_id::AgentId;
use protocol::control::{self, ControlPlane};
use protocol::error::ClusterError;
use protocol::message::{Frame, LogResponse, PingResponse, TableResponse};
use protocol::tls::TlsMaterial;
use protocol::transport;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

const MODULE: &str = "scribe";

pub struct ScribeAgent {
    id: AgentId,
    config: ScribeConfig,
    pipeline: Pipeline,
    logger: Logger,
    start_time: Instant,
    stopping: AtomicBool,
}

impl ScribeAgent {
    /// Registers with the configured Mediator (if any) with retry/backoff,
    /// then constructs the agent. Registration failure after three
    /// attempts is a fatal startup error, matching the control-plane exit
    /// code contract.
    pub fn start(config: ScribeConfig, logger: Logger) -> Result<Arc<Self>, ClusterError> {
        let id = AgentId::new();
        let self_addr: SocketAddr = format!("127.0.0.1:{}", config.port)
            .parse()
            .expect("loopback address with a valid port always parses");

        if let Some(mediator_addr) = config.mediator_addr {
            let cli_addr: SocketAddr = format!("127.0.0.1:{}", config.cli_port)
                .parse()
                .expect("loopback address with a valid port always parses");
            register_with_mediator(mediator_addr, &id, self_addr, cli_addr, &logger)?;
            logger.info(&format!("registered with mediator at {mediator_addr} as {id}"), MODULE);
        }

        let pipeline = Pipeline::start(config.root_path.clone(), config.max_size, logger.clone());

        Ok(Arc::new(ScribeAgent {
            id,
            config,
            pipeline,
            logger,
            start_time: Instant::now(),
            stopping: AtomicBool::new(false),
        }))
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Binds the data-plane and control-plane listeners and serves until
    /// `shutdown` is called from another thread.
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
        thread::spawn(move || control::serve(cli_listener, ScribeControlHandle(control_handle)));

        self.logger.info(
            &format!("scribe {} serving data plane on {data_addr}", self.id),
            MODULE,
        );

        for incoming in data_listener.incoming() {
            let Ok(stream) = incoming else { continue };
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            let agent = Arc::clone(&self);
            let server_tls = server_tls.clone();
            thread::spawn(move || {
                if let Ok(conn) = transport::accept(stream, server_tls) {
                    agent.handle_connection(conn);
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
                Frame::LogRequest(req) => {
                    let ack = match self.pipeline.enqueue(req) {
                        Ok(()) => "true".to_string(),
                        Err(e) => {
                            self.logger.error(&format!("enqueue failed: {e}"), MODULE);
                            "false".to_string()
                        }
                    };
                    Frame::LogResponse(LogResponse { ack })
                }
                Frame::PingRequest(req) => Frame::PingResponse(PingResponse {
                    product: req.a as u64 * req.b as u64,
                }),
                _ => Frame::ErrorResponse(protocol::message::ErrorResponse {
                    message: "unsupported data-plane request".to_string(),
                }),
            };
            if response.write_to(&mut conn).is_err() {
                return;
            }
        }
    }

    /// Signals the accept loop to stop, waking it with a dummy self-dial,
    /// drains the pipeline and reports total requests handled.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(format!("127.0.0.1:{}", self.config.port));
        self.logger.info(
            &format!(
                "scribe {} shutting down: {} requests in {:?}",
                self.id,
                self.pipeline.counter(),
                self.start_time.elapsed()
            ),
            MODULE,
        );
    }

    pub fn counter(&self) -> u64 {
        self.pipeline.counter()
    }
}

#[derive(Clone)]
struct ScribeControlHandle(Arc<ScribeAgent>);

impl ControlPlane for ScribeControlHandle {
    fn name(&self) -> String {
        self.0.id.to_string()
    }

    fn report_version(&self, _all: bool) -> TableResponse {
        TableResponse {
            rows: vec![vec![
                "Scribe".to_string(),
                self.name(),
                control::VERSION.to_string(),
            ]],
        }
    }

    fn report_stats(&self) -> TableResponse {
        TableResponse {
            rows: vec![vec![self.name(), self.0.counter().to_string()]],
        }
    }
}
